pub mod api;
pub mod config;
pub mod error;
pub mod loader;
pub mod models;
pub mod query;
pub mod seed;
pub mod sse;
pub mod store;

use anyhow::Result;
use axum::{extract::DefaultBodyLimit, routing::get, Router};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::loader::{fail_seed_load, start_seed_loader, SeedSource};
use crate::sse::SseState;
use crate::store::{FileStorage, ForumStore, MemoryStorage, SharedStore, SnapshotStorage};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub config: Arc<Config>,
    pub sse: SseState,
}

impl AppState {
    pub fn new(store: ForumStore, config: Config) -> Self {
        let store = store.with_max_reply_depth(config.forum.max_reply_depth);
        Self {
            store: store.into_shared(),
            config: Arc::new(config),
            sse: SseState::new(),
        }
    }
}

/// Build the router over prepared state
pub fn app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.security.cors_origins);
    let max_body_size = state.config.server.max_body_size;

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::router())
        .route("/api/v1/stream", get(sse::stream_handler))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_storage(config: &Config) -> Box<dyn SnapshotStorage> {
    match &config.storage.state_path {
        Some(path) => {
            let storage = FileStorage::new(path);
            tracing::info!("Persisting forum state to {}", storage.path().display());
            Box::new(storage)
        }
        None => {
            tracing::info!("No STATE_PATH set, forum state will not survive restarts");
            Box::new(MemoryStorage::new())
        }
    }
}

/// Run the server
pub async fn run(config: Config) -> Result<()> {
    let source = SeedSource::from_path(config.seed.seed_path.as_deref());
    let loaded = source.load().await;

    // Categories are needed before threads; fall back to the built-in set
    let categories = match &loaded {
        Ok(seed) => seed.categories.clone(),
        Err(_) => seed::default_categories(),
    };
    tracing::info!("{} categories, seed source: {:?}", categories.len(), source);

    let store = ForumStore::new(categories, build_storage(&config), config.storage.namespace.clone());
    let state = AppState::new(store, config.clone());

    match loaded {
        Ok(seed) => {
            start_seed_loader(
                state.store.clone(),
                seed,
                Duration::from_millis(config.seed.load_delay_ms),
                state.sse.clone(),
            )
            .await;
        }
        Err(e) => fail_seed_load(&state.store, &e).await,
    }

    let app = app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("threadboard listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

/// Build CORS layer from configuration
fn build_cors_layer(origins: &str) -> CorsLayer {
    if origins == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;

        let origins: Vec<_> = origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}
