//! Background bulk load of seeded threads
//!
//! Categories are installed when the store is built; threads arrive after a
//! configurable delay, during which the store reports itself as loading.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::seed::{self, Seed};
use crate::sse::{SseState, StoreEvent};
use crate::store::SharedStore;

/// Where seeded threads come from
#[derive(Debug, Clone)]
pub enum SeedSource {
    Builtin,
    File(PathBuf),
}

impl SeedSource {
    pub fn from_path(path: Option<&str>) -> Self {
        match path {
            Some(p) => SeedSource::File(PathBuf::from(p)),
            None => SeedSource::Builtin,
        }
    }

    pub async fn load(&self) -> anyhow::Result<Seed> {
        match self {
            SeedSource::Builtin => Ok(seed::builtin(Utc::now())),
            SeedSource::File(path) => Seed::from_file(path).await,
        }
    }
}

/// Flag the store as loading and spawn the delayed thread load
pub async fn start_seed_loader(
    store: SharedStore,
    seed: Seed,
    delay: Duration,
    sse: SseState,
) -> tokio::task::JoinHandle<()> {
    store.write().await.set_loading(true);

    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        load_threads(&store, seed, &sse).await;
    })
}

async fn load_threads(store: &SharedStore, seed: Seed, sse: &SseState) {
    let dups = seed.duplicate_thread_ids();
    if !dups.is_empty() {
        warn!("Seed contains duplicate thread IDs: {:?}", dups);
    }

    let count = seed.threads.len();
    {
        let mut store = store.write().await;
        store.set_threads(seed.threads);
        store.set_loading(false);
    }
    sse.broadcast(StoreEvent::ThreadsLoaded { count });
    info!("Loaded {} seeded threads", count);
}

/// Record a failed seed load on the store
pub async fn fail_seed_load(store: &SharedStore, err: &anyhow::Error) {
    error!("Seed load failed: {:#}", err);
    let mut store = store.write().await;
    store.set_error(Some(format!("Failed to load threads: {}", err)));
    store.set_loading(false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ForumStore;

    #[tokio::test]
    async fn test_loader_sets_threads_after_delay() {
        let store = ForumStore::in_memory(seed::default_categories()).into_shared();
        let sse = SseState::new();
        let mut rx = sse.subscribe();
        let seed = seed::builtin(Utc::now());
        let expected = seed.threads.len();

        let handle = start_seed_loader(store.clone(), seed, Duration::from_millis(10), sse).await;
        assert!(store.read().await.is_loading());
        assert!(store.read().await.threads().is_empty());

        handle.await.unwrap();
        let guard = store.read().await;
        assert!(!guard.is_loading());
        assert_eq!(guard.threads().len(), expected);
        assert!(matches!(rx.recv().await.unwrap(), StoreEvent::ThreadsLoaded { count } if count == expected));
    }

    #[tokio::test]
    async fn test_missing_seed_file_sets_error() {
        let store = ForumStore::in_memory(Vec::new()).into_shared();
        store.write().await.set_loading(true);

        let source = SeedSource::from_path(Some("/nonexistent/threadboard-seed.json"));
        let err = source.load().await.unwrap_err();
        fail_seed_load(&store, &err).await;

        let guard = store.read().await;
        assert!(!guard.is_loading());
        assert!(guard.error().unwrap().starts_with("Failed to load threads"));
    }
}
