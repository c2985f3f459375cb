//! Listing derivations over the store's threads
//!
//! Everything here is a pure function: filters keep input order, sorting is
//! stable, and nothing touches the store itself.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::models::Thread;

/// Listing sort order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Newest first by creation time
    #[default]
    Latest,
    /// Most viewed first
    Popular,
    /// Most upvoted first
    Upvotes,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest" => Ok(SortKey::Latest),
            "popular" => Ok(SortKey::Popular),
            "upvotes" => Ok(SortKey::Upvotes),
            other => Err(format!(
                "Unknown sort key '{}' (expected latest, popular or upvotes)",
                other
            )),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortKey::Latest => "latest",
            SortKey::Popular => "popular",
            SortKey::Upvotes => "upvotes",
        })
    }
}

/// Keep threads whose category is selected. An empty selection keeps everything
pub fn filter_by_categories<'a>(threads: Vec<&'a Thread>, selected: &[String]) -> Vec<&'a Thread> {
    if selected.is_empty() {
        return threads;
    }
    threads
        .into_iter()
        .filter(|t| selected.contains(&t.category_id))
        .collect()
}

/// Split a comma-separated tag search into lowercase terms, dropping blanks
pub fn parse_tag_query(query: &str) -> Vec<String> {
    query
        .split(',')
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Keep threads where any term is a case-insensitive substring of any tag.
/// No terms keeps everything
pub fn filter_by_tags<'a>(threads: Vec<&'a Thread>, terms: &[String]) -> Vec<&'a Thread> {
    if terms.is_empty() {
        return threads;
    }
    threads
        .into_iter()
        .filter(|t| matches_tags(t, terms))
        .collect()
}

fn matches_tags(thread: &Thread, terms: &[String]) -> bool {
    thread.tags.iter().any(|tag| {
        let tag = tag.to_lowercase();
        terms.iter().any(|term| tag.contains(term.as_str()))
    })
}

/// Stable descending sort by the given key
pub fn sort_threads(threads: &mut [&Thread], key: SortKey) {
    match key {
        SortKey::Latest => threads.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Popular => threads.sort_by(|a, b| b.views.cmp(&a.views)),
        SortKey::Upvotes => threads.sort_by(|a, b| b.upvotes.cmp(&a.upvotes)),
    }
}

/// Threads with no parent, order kept
pub fn top_level<'a>(threads: impl IntoIterator<Item = &'a Thread>) -> Vec<&'a Thread> {
    threads.into_iter().filter(|t| t.is_top_level()).collect()
}

/// Threads (replies included) filed under `category_id`
pub fn thread_count(threads: &[Thread], category_id: &str) -> usize {
    threads.iter().filter(|t| t.category_id == category_id).count()
}

/// A listing request: category selection, tag search and sort
#[derive(Debug, Clone, Default)]
pub struct ThreadQuery {
    pub categories: Vec<String>,
    pub tags: String,
    pub sort: SortKey,
}

impl ThreadQuery {
    /// Filter by category then tags, then sort. Replies are included
    pub fn apply<'a>(&self, threads: &'a [Thread]) -> Vec<&'a Thread> {
        let visible = filter_by_categories(threads.iter().collect(), &self.categories);
        let mut visible = filter_by_tags(visible, &parse_tag_query(&self.tags));
        sort_threads(&mut visible, self.sort);
        visible
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn thread(id: &str, category: &str, tags: &[&str]) -> Thread {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Thread {
            id: id.to_string(),
            title: format!("Thread {}", id),
            content: "body".to_string(),
            category_id: category.to_string(),
            author_id: "user-1".to_string(),
            parent_id: None,
            created_at: at,
            updated_at: at,
            upvotes: 0,
            downvotes: 0,
            views: 0,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn ids(threads: &[&Thread]) -> Vec<String> {
        threads.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_empty_selection_keeps_everything_in_order() {
        let threads = vec![thread("1", "a", &[]), thread("2", "b", &[]), thread("3", "a", &[])];
        let visible = filter_by_categories(threads.iter().collect(), &[]);
        assert_eq!(ids(&visible), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_selection_restricts_categories() {
        let threads = vec![thread("1", "a", &[]), thread("2", "b", &[]), thread("3", "c", &[])];
        let visible = filter_by_categories(threads.iter().collect(), &["c".to_string(), "a".to_string()]);
        assert_eq!(ids(&visible), vec!["1", "3"]);
    }

    #[test]
    fn test_parse_tag_query() {
        assert_eq!(parse_tag_query("a, B"), vec!["a", "b"]);
        assert_eq!(parse_tag_query(" Rust ,, ,async "), vec!["rust", "async"]);
        assert!(parse_tag_query("").is_empty());
        assert!(parse_tag_query(" , ").is_empty());
    }

    #[test]
    fn test_tag_filter_substring_case_insensitive() {
        let threads = vec![
            thread("banana", "x", &["Banana"]),
            thread("apple", "x", &["apple"]),
            thread("cherry", "x", &["cherry"]),
        ];
        let visible = filter_by_tags(threads.iter().collect(), &parse_tag_query("a, B"));
        assert_eq!(ids(&visible), vec!["banana", "apple"]);
    }

    #[test]
    fn test_blank_tag_query_does_not_match_everything_by_accident() {
        let threads = vec![thread("1", "x", &["rust"]), thread("2", "x", &[])];
        // Trailing comma leaves an empty term which must be dropped
        let visible = filter_by_tags(threads.iter().collect(), &parse_tag_query("go,"));
        assert!(visible.is_empty());
    }

    #[test]
    fn test_sort_upvotes_descending() {
        let mut threads = vec![thread("a", "x", &[]), thread("b", "x", &[]), thread("c", "x", &[])];
        threads[0].upvotes = 3;
        threads[1].upvotes = 1;
        threads[2].upvotes = 2;
        let mut visible: Vec<&Thread> = threads.iter().collect();
        sort_threads(&mut visible, SortKey::Upvotes);
        assert_eq!(ids(&visible), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_sort_is_stable() {
        let mut threads = vec![
            thread("first", "x", &[]),
            thread("top", "x", &[]),
            thread("second", "x", &[]),
        ];
        threads[0].upvotes = 2;
        threads[1].upvotes = 5;
        threads[2].upvotes = 2;
        let mut visible: Vec<&Thread> = threads.iter().collect();
        sort_threads(&mut visible, SortKey::Upvotes);
        assert_eq!(ids(&visible), vec!["top", "first", "second"]);

        // Equal timestamps keep insertion order too
        let mut visible: Vec<&Thread> = threads.iter().collect();
        sort_threads(&mut visible, SortKey::Latest);
        assert_eq!(ids(&visible), vec!["first", "top", "second"]);
    }

    #[test]
    fn test_sort_latest_and_popular() {
        let mut threads = vec![thread("old", "x", &[]), thread("new", "x", &[]), thread("mid", "x", &[])];
        threads[0].created_at = Utc.with_ymd_and_hms(2023, 5, 1, 0, 0, 0).unwrap();
        threads[1].created_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        threads[2].created_at = Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap();
        threads[0].views = 10;
        threads[1].views = 1;
        threads[2].views = 5;

        let mut visible: Vec<&Thread> = threads.iter().collect();
        sort_threads(&mut visible, SortKey::Latest);
        assert_eq!(ids(&visible), vec!["new", "mid", "old"]);

        sort_threads(&mut visible, SortKey::Popular);
        assert_eq!(ids(&visible), vec!["old", "mid", "new"]);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("popular".parse::<SortKey>(), Ok(SortKey::Popular));
        assert_eq!(SortKey::default(), SortKey::Latest);
        assert!("oldest".parse::<SortKey>().is_err());
        assert_eq!(SortKey::Upvotes.to_string(), "upvotes");
    }

    #[test]
    fn test_thread_count_includes_replies() {
        let mut reply = thread("r1", "rust", &[]);
        reply.parent_id = Some("t1".to_string());
        let threads = vec![thread("t1", "rust", &[]), reply, thread("t2", "golang", &[])];
        assert_eq!(thread_count(&threads, "rust"), 2);
        assert_eq!(thread_count(&threads, "golang"), 1);
        assert_eq!(thread_count(&threads, "missing"), 0);
        assert_eq!(ids(&top_level(&threads)), vec!["t1", "t2"]);
    }

    #[test]
    fn test_query_applies_all_stages() {
        let mut threads = vec![
            thread("1", "rust", &["async"]),
            thread("2", "go", &["async"]),
            thread("3", "rust", &["macros"]),
            thread("4", "rust", &["Async-runtime"]),
        ];
        threads[3].upvotes = 9;
        let query = ThreadQuery {
            categories: vec!["rust".to_string()],
            tags: "ASYNC".to_string(),
            sort: SortKey::Upvotes,
        };
        assert_eq!(ids(&query.apply(&threads)), vec!["4", "1"]);
    }
}
