use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

use super::Category;

/// A forum thread. Replies are threads with a parent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    /// Thread title (empty for replies)
    #[serde(default)]
    pub title: String,
    /// Post body
    pub content: String,
    /// Category this thread is filed under. May dangle
    pub category_id: String,
    /// Author reference, opaque to the server
    pub author_id: String,
    /// Parent thread ID (None for top-level threads)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub upvotes: u64,
    /// Never mutated by any operation, kept for wire compatibility
    #[serde(default)]
    pub downvotes: u64,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Thread {
    /// Check if this is a top-level thread
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Generate a fresh thread ID.
///
/// UUID v7 is time-ordered like the millisecond timestamps seeded threads
/// carry, but two threads created in the same millisecond still differ.
pub fn new_thread_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

/// Request to create a new top-level thread
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateThreadRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category_id: String,
    pub author_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CreateThreadRequest {
    /// Title, content and category must all be present
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::BadRequest("title is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(AppError::BadRequest("content is required".to_string()));
        }
        if self.category_id.trim().is_empty() {
            return Err(AppError::BadRequest("categoryId is required".to_string()));
        }
        Ok(())
    }

    pub fn into_thread(self, default_author: &str, now: DateTime<Utc>) -> Thread {
        Thread {
            id: new_thread_id(),
            title: self.title,
            content: self.content,
            category_id: self.category_id,
            author_id: self.author_id.unwrap_or_else(|| default_author.to_string()),
            parent_id: None,
            created_at: now,
            updated_at: now,
            upvotes: 0,
            downvotes: 0,
            views: 0,
            tags: self.tags,
        }
    }
}

/// Request to reply to a thread
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    #[serde(default)]
    pub content: String,
    pub author_id: Option<String>,
}

impl CreateReplyRequest {
    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(AppError::BadRequest("content is required".to_string()));
        }
        Ok(())
    }

    /// Build the reply. It inherits the parent's category
    pub fn into_reply(self, parent: &Thread, default_author: &str, now: DateTime<Utc>) -> Thread {
        Thread {
            id: new_thread_id(),
            title: String::new(),
            content: self.content,
            category_id: parent.category_id.clone(),
            author_id: self.author_id.unwrap_or_else(|| default_author.to_string()),
            parent_id: Some(parent.id.clone()),
            created_at: now,
            updated_at: now,
            upvotes: 0,
            downvotes: 0,
            views: 0,
            tags: Vec::new(),
        }
    }
}

/// A thread with its replies nested beneath it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadNode {
    #[serde(flatten)]
    pub thread: Thread,
    /// Number of direct replies
    pub reply_count: usize,
    pub replies: Vec<ThreadNode>,
    /// Set when this node sits at the reply depth limit and its replies were cut
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

impl ThreadNode {
    /// Depth-first walk yielding (depth, thread), root at depth 0
    pub fn walk(&self) -> Vec<(usize, &Thread)> {
        let mut out = Vec::new();
        let mut stack = vec![(0, self)];
        while let Some((depth, node)) = stack.pop() {
            out.push((depth, &node.thread));
            stack.extend(node.replies.iter().rev().map(|reply| (depth + 1, reply)));
        }
        out
    }
}

/// Thread listing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadListResponse {
    pub threads: Vec<ThreadNode>,
    /// Number of threads (replies included) that passed the filters
    pub matched: usize,
    pub is_loading: bool,
}

/// Category page: one category's threads
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryPageResponse {
    pub category: Category,
    pub threads: Vec<ThreadNode>,
    /// Threads in this category, replies included
    pub total_threads: usize,
}
