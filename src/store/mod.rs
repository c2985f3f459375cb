//! Forum state store
//!
//! Single source of truth for categories, threads and the selected category
//! filter. Operations are synchronous and never fail: validation and
//! referential checks belong to callers. Every mutation writes the selected
//! category set (and nothing else) to the configured snapshot storage.

mod index;
pub mod persist;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use tokio::sync::RwLock;

use crate::models::{Category, Thread, ThreadNode};

pub use index::would_cycle;
use index::ReplyIndex;
pub use persist::{FileStorage, MemoryStorage, PersistedState, SnapshotStorage, StorageError};

/// Default storage namespace for the persisted snapshot
pub const DEFAULT_NAMESPACE: &str = "forum-storage";

/// Reply levels rendered below a root before a tree is truncated
pub const DEFAULT_MAX_REPLY_DEPTH: usize = 50;

/// Store shared between request handlers
pub type SharedStore = Arc<RwLock<ForumStore>>;

pub struct ForumStore {
    categories: Vec<Category>,
    threads: Vec<Thread>,
    selected_categories: Vec<String>,
    is_loading: bool,
    error: Option<String>,
    index: ReplyIndex,
    storage: Box<dyn SnapshotStorage>,
    namespace: String,
    max_reply_depth: usize,
}

impl ForumStore {
    /// Create a store over `storage`, rehydrating the selected categories.
    ///
    /// Threads always start empty until a bulk load runs.
    pub fn new(
        categories: Vec<Category>,
        storage: Box<dyn SnapshotStorage>,
        namespace: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        let selected_categories = match storage.load(&namespace) {
            Ok(Some(state)) => state.selected_categories,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable snapshot '{}': {}", namespace, e);
                Vec::new()
            }
        };

        if !selected_categories.is_empty() {
            tracing::info!(
                "Restored {} selected categories from '{}'",
                selected_categories.len(),
                namespace
            );
        }

        Self {
            categories,
            threads: Vec::new(),
            selected_categories,
            is_loading: false,
            error: None,
            index: ReplyIndex::default(),
            storage,
            namespace,
            max_reply_depth: DEFAULT_MAX_REPLY_DEPTH,
        }
    }

    /// Limit how many reply levels trees render below their root
    pub fn with_max_reply_depth(mut self, max_reply_depth: usize) -> Self {
        self.max_reply_depth = max_reply_depth;
        self
    }

    /// Store backed by in-memory storage under the default namespace
    pub fn in_memory(categories: Vec<Category>) -> Self {
        Self::new(categories, Box::new(MemoryStorage::new()), DEFAULT_NAMESPACE)
    }

    pub fn into_shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    // State

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn selected_categories(&self) -> &[String] {
        &self.selected_categories
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn max_reply_depth(&self) -> usize {
        self.max_reply_depth
    }

    /// First thread with this ID
    pub fn thread(&self, id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn category_by_slug(&self, slug: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.slug == slug)
    }

    /// Direct replies of `id`, in insertion order
    pub fn replies(&self, id: &str) -> Vec<&Thread> {
        self.index
            .children(id)
            .iter()
            .filter_map(|&pos| self.threads.get(pos))
            .collect()
    }

    /// Number of resolvable ancestors above thread `id`, 0 for top-level.
    ///
    /// Stops at a dangling parent or when the chain loops back on itself.
    pub fn depth(&self, id: &str) -> Option<usize> {
        let mut by_id: HashMap<&str, &Thread> = HashMap::new();
        for t in &self.threads {
            by_id.entry(t.id.as_str()).or_insert(t);
        }

        let mut current = *by_id.get(id)?;
        let mut seen = HashSet::from([current.id.as_str()]);
        let mut depth = 0;
        while let Some(&parent) = current.parent_id.as_deref().and_then(|p| by_id.get(p)) {
            if !seen.insert(parent.id.as_str()) {
                break;
            }
            depth += 1;
            current = parent;
        }
        Some(depth)
    }

    /// Reply tree under thread `id`.
    ///
    /// Threads whose category doesn't resolve are not rendered, so such a
    /// root yields `None` and such a reply is dropped with its subtree.
    pub fn thread_tree(&self, id: &str) -> Option<ThreadNode> {
        let root = self.threads.iter().position(|t| t.id == id)?;
        self.tree_at(root)
    }

    /// Trees for the given top-level threads, skipping unrenderable ones.
    ///
    /// Roots are matched by identity, not by ID, so with duplicate IDs each
    /// entry renders itself. References not borrowed from this store are skipped.
    pub fn render<'a>(&self, roots: impl IntoIterator<Item = &'a Thread>) -> Vec<ThreadNode> {
        let positions: HashMap<*const Thread, usize> = self
            .threads
            .iter()
            .enumerate()
            .map(|(pos, t)| (t as *const Thread, pos))
            .collect();

        roots
            .into_iter()
            .filter_map(|t| positions.get(&(t as *const Thread)))
            .filter_map(|&pos| self.tree_at(pos))
            .collect()
    }

    fn tree_at(&self, root: usize) -> Option<ThreadNode> {
        let renderable = |t: &Thread| self.category(&t.category_id).is_some();
        self.index
            .tree(&self.threads, root, self.max_reply_depth, &renderable)
    }

    // Actions

    pub fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
        self.persist();
    }

    pub fn set_threads(&mut self, threads: Vec<Thread>) {
        tracing::debug!("Loading {} threads", threads.len());
        self.threads = threads;
        self.reindex();
        self.persist();
    }

    /// Append a thread. IDs are not checked for uniqueness
    pub fn add_thread(&mut self, thread: Thread) {
        tracing::debug!(thread_id = %thread.id, parent_id = ?thread.parent_id, "Adding thread");
        let pos = self.threads.len();
        self.index.push(pos, &thread);
        self.threads.push(thread);
        self.persist();
    }

    /// Replace every thread with `thread.id` in place. Unknown IDs are ignored
    pub fn update_thread(&mut self, thread: Thread) {
        let mut matched = false;
        for slot in self.threads.iter_mut().filter(|t| t.id == thread.id) {
            *slot = thread.clone();
            matched = true;
        }
        if matched {
            tracing::debug!(thread_id = %thread.id, "Updated thread");
            self.reindex();
        }
        self.persist();
    }

    /// Remove every thread with this ID. Its replies are left in place, unreachable
    pub fn delete_thread(&mut self, id: &str) -> bool {
        let before = self.threads.len();
        self.threads.retain(|t| t.id != id);
        let removed = self.threads.len() != before;
        if removed {
            tracing::debug!(thread_id = %id, "Deleted thread");
            self.reindex();
        }
        self.persist();
        removed
    }

    /// Add one upvote to the thread(s) with this ID
    pub fn upvote_thread(&mut self, id: &str) -> bool {
        let mut matched = false;
        for thread in self.threads.iter_mut().filter(|t| t.id == id) {
            thread.upvotes = thread.upvotes.saturating_add(1);
            matched = true;
        }
        self.persist();
        matched
    }

    /// Deselect the category if selected, otherwise append it
    pub fn toggle_category(&mut self, category_id: &str) {
        if let Some(pos) = self.selected_categories.iter().position(|c| c == category_id) {
            self.selected_categories.remove(pos);
        } else {
            self.selected_categories.push(category_id.to_string());
        }
        tracing::debug!(selected = ?self.selected_categories, "Toggled category {}", category_id);
        self.persist();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
        self.persist();
    }

    pub fn set_error(&mut self, error: Option<String>) {
        self.error = error;
        self.persist();
    }

    fn reindex(&mut self) {
        self.index = ReplyIndex::build(&self.threads);
    }

    fn persist(&self) {
        let state = PersistedState {
            selected_categories: self.selected_categories.clone(),
        };
        if let Err(e) = self.storage.save(&self.namespace, &state) {
            tracing::warn!("Failed to persist forum state to '{}': {}", self.namespace, e);
        }
    }
}
