//! Seed data: categories and an initial set of threads
//!
//! The built-in catalogue is used unless a JSON seed file is configured.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

use crate::models::{Category, Thread};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub threads: Vec<Thread>,
}

impl Seed {
    /// Read a seed file: `{"categories": [...], "threads": [...]}`
    pub async fn from_file(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read seed file {}", path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Invalid seed file {}", path.display()))
    }

    /// IDs used by more than one seeded thread
    pub fn duplicate_thread_ids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut dups = Vec::new();
        for thread in &self.threads {
            if !seen.insert(thread.id.as_str()) && !dups.contains(&thread.id.as_str()) {
                dups.push(thread.id.as_str());
            }
        }
        dups
    }
}

fn category(id: &str, name: &str, description: &str, icon: &str, color: &str, slug: &str) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        icon: icon.to_string(),
        color: color.to_string(),
        thread_count: 0,
        slug: slug.to_string(),
    }
}

/// Built-in categories
pub fn default_categories() -> Vec<Category> {
    vec![
        category("1", "General Discussion", "Talk about anything and everything", "MessageSquare", "blue", "general"),
        category("2", "Technology", "Hardware, software and the industry around them", "Cpu", "purple", "technology"),
        category("3", "Science", "Research, discoveries and how the world works", "FlaskConical", "green", "science"),
        category("4", "World News", "Discussion of current events", "Globe", "orange", "world-news"),
        category("5", "Help & Support", "Questions about using the forum", "LifeBuoy", "red", "help"),
    ]
}

struct Sample<'a> {
    id: &'a str,
    title: &'a str,
    content: &'a str,
    category_id: &'a str,
    author_id: &'a str,
    parent_id: Option<&'a str>,
    age_hours: i64,
    upvotes: u64,
    views: u64,
    tags: &'a [&'a str],
}

impl Sample<'_> {
    fn into_thread(self, now: DateTime<Utc>) -> Thread {
        let at = now - Duration::hours(self.age_hours);
        Thread {
            id: self.id.to_string(),
            title: self.title.to_string(),
            content: self.content.to_string(),
            category_id: self.category_id.to_string(),
            author_id: self.author_id.to_string(),
            parent_id: self.parent_id.map(str::to_string),
            created_at: at,
            updated_at: at,
            upvotes: self.upvotes,
            downvotes: 0,
            views: self.views,
            tags: self.tags.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Built-in sample threads, timestamped relative to `now`
pub fn default_threads(now: DateTime<Utc>) -> Vec<Thread> {
    let samples = [
        Sample {
            id: "1",
            title: "Welcome to the forum!",
            content: "Introduce yourself and tell us what brings you here.",
            category_id: "1",
            author_id: "user-1",
            parent_id: None,
            age_hours: 72,
            upvotes: 42,
            views: 1280,
            tags: &["welcome", "introductions"],
        },
        Sample {
            id: "2",
            title: "",
            content: "Hi all, long time reader, first time poster.",
            category_id: "1",
            author_id: "user-2",
            parent_id: Some("1"),
            age_hours: 70,
            upvotes: 5,
            views: 0,
            tags: &[],
        },
        Sample {
            id: "3",
            title: "",
            content: "Welcome aboard!",
            category_id: "1",
            author_id: "user-1",
            parent_id: Some("2"),
            age_hours: 69,
            upvotes: 2,
            views: 0,
            tags: &[],
        },
        Sample {
            id: "4",
            title: "Is Rust worth learning in 2024?",
            content: "Thinking about picking up a systems language. Experiences?",
            category_id: "2",
            author_id: "user-3",
            parent_id: None,
            age_hours: 30,
            upvotes: 87,
            views: 940,
            tags: &["Rust", "programming", "career"],
        },
        Sample {
            id: "5",
            title: "",
            content: "The borrow checker hurts for a month, then it clicks.",
            category_id: "2",
            author_id: "user-2",
            parent_id: Some("4"),
            age_hours: 29,
            upvotes: 31,
            views: 0,
            tags: &[],
        },
        Sample {
            id: "6",
            title: "New exoplanet found in the habitable zone",
            content: "Spectroscopy suggests a water-rich atmosphere.",
            category_id: "3",
            author_id: "user-4",
            parent_id: None,
            age_hours: 12,
            upvotes: 56,
            views: 2210,
            tags: &["space", "astronomy"],
        },
        Sample {
            id: "7",
            title: "Climate summit wrap-up",
            content: "What came out of this year's talks, and what didn't.",
            category_id: "4",
            author_id: "user-5",
            parent_id: None,
            age_hours: 5,
            upvotes: 19,
            views: 610,
            tags: &["climate", "politics"],
        },
        Sample {
            id: "8",
            title: "How do I filter threads by tag?",
            content: "Type tags separated by commas in the search box.",
            category_id: "5",
            author_id: "user-1",
            parent_id: None,
            age_hours: 1,
            upvotes: 3,
            views: 45,
            tags: &["howto", "search"],
        },
    ];

    samples.into_iter().map(|s| s.into_thread(now)).collect()
}

/// The built-in seed
pub fn builtin(now: DateTime<Utc>) -> Seed {
    Seed {
        categories: default_categories(),
        threads: default_threads(now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_seed_is_consistent() {
        let seed = builtin(Utc::now());
        assert!(seed.duplicate_thread_ids().is_empty());

        let category_ids: HashSet<&str> = seed.categories.iter().map(|c| c.id.as_str()).collect();
        let slugs: HashSet<&str> = seed.categories.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs.len(), seed.categories.len());

        let thread_ids: HashSet<&str> = seed.threads.iter().map(|t| t.id.as_str()).collect();
        for thread in &seed.threads {
            assert!(category_ids.contains(thread.category_id.as_str()));
            if let Some(parent) = &thread.parent_id {
                assert!(thread_ids.contains(parent.as_str()));
                assert!(thread.title.is_empty());
            } else {
                assert!(!thread.title.is_empty());
            }
        }
    }

    #[test]
    fn test_duplicate_thread_ids() {
        let now = Utc::now();
        let mut threads = default_threads(now);
        threads.push(threads[0].clone());
        threads.push(threads[0].clone());
        threads.push(threads[3].clone());
        let seed = Seed {
            categories: Vec::new(),
            threads,
        };
        assert_eq!(seed.duplicate_thread_ids(), vec!["1", "4"]);
    }

    #[test]
    fn test_seed_json_uses_camel_case() {
        let json = r#"{
            "categories": [{"id": "c", "name": "C", "description": "d", "slug": "c"}],
            "threads": [{
                "id": "t", "title": "T", "content": "x", "categoryId": "c",
                "authorId": "u", "createdAt": "2024-01-01T00:00:00Z",
                "updatedAt": "2024-01-01T00:00:00.000Z", "tags": ["a"]
            }]
        }"#;
        let seed: Seed = serde_json::from_str(json).unwrap();
        assert_eq!(seed.categories[0].slug, "c");
        assert_eq!(seed.threads[0].category_id, "c");
        assert_eq!(seed.threads[0].parent_id, None);
        assert_eq!(seed.threads[0].upvotes, 0);
    }
}
