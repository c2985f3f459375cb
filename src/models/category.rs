use serde::{Deserialize, Serialize};

/// A category threads are filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    /// Display name
    pub name: String,
    /// Category description
    pub description: String,
    /// Icon name, opaque to the server
    #[serde(default)]
    pub icon: String,
    /// Display colour tag, opaque to the server
    #[serde(default)]
    pub color: String,
    /// Seeded thread count. Not authoritative, responses recompute it
    #[serde(default)]
    pub thread_count: usize,
    /// URL-safe unique name (e.g., "general", "rust-help")
    pub slug: String,
}

impl Category {
    /// Copy of this category carrying a derived thread count
    pub fn with_thread_count(&self, thread_count: usize) -> Self {
        Self {
            thread_count,
            ..self.clone()
        }
    }
}
