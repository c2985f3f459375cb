use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    error::{AppError, Result},
    models::{CreateReplyRequest, CreateThreadRequest, Thread, ThreadListResponse, ThreadNode},
    query::{self, SortKey, ThreadQuery},
    sse::StoreEvent,
    store::would_cycle,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Comma-separated tag search
    #[serde(default)]
    tags: String,
    sort: Option<String>,
}

impl ListQuery {
    pub fn sort_key(&self) -> Result<SortKey> {
        match self.sort.as_deref() {
            None | Some("") => Ok(SortKey::default()),
            Some(s) => s.parse().map_err(AppError::BadRequest),
        }
    }
}

/// List top-level threads with their replies.
///
/// Filtered by the stored category selection and the `tags` search, then
/// sorted by `sort`. Reply order under each thread is insertion order.
pub async fn list_threads(
    State(state): State<AppState>,
    Query(params): Query<ListQuery>,
) -> Result<Json<ThreadListResponse>> {
    let sort = params.sort_key()?;
    let store = state.store.read().await;

    let listing = ThreadQuery {
        categories: store.selected_categories().to_vec(),
        tags: params.tags,
        sort,
    };
    let visible = listing.apply(store.threads());
    let matched = visible.len();
    let threads = store.render(query::top_level(visible));

    Ok(Json(ThreadListResponse {
        threads,
        matched,
        is_loading: store.is_loading(),
    }))
}

/// Get a thread with its reply tree
pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ThreadNode>> {
    let store = state.store.read().await;
    store
        .thread_tree(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Thread not found".to_string()))
}

/// Create a new top-level thread
pub async fn create_thread(
    State(state): State<AppState>,
    Json(req): Json<CreateThreadRequest>,
) -> Result<Json<Thread>> {
    req.validate()?;

    let thread = {
        let mut store = state.store.write().await;
        if store.category(&req.category_id).is_none() {
            return Err(AppError::BadRequest(format!(
                "Unknown category '{}'",
                req.category_id
            )));
        }

        let thread = req.into_thread(&state.config.forum.default_author_id, Utc::now());
        store.add_thread(thread.clone());
        thread
    };

    tracing::info!(thread_id = %thread.id, category_id = %thread.category_id, "Thread created");
    state.sse.broadcast(StoreEvent::ThreadAdded {
        thread_id: thread.id.clone(),
        category_id: thread.category_id.clone(),
        parent_id: None,
    });

    Ok(Json(thread))
}

/// Reply to a thread or to another reply
pub async fn create_reply(
    State(state): State<AppState>,
    Path(parent_id): Path<String>,
    Json(req): Json<CreateReplyRequest>,
) -> Result<Json<Thread>> {
    req.validate()?;

    let reply = {
        let mut store = state.store.write().await;
        let parent = store
            .thread(&parent_id)
            .ok_or_else(|| AppError::NotFound("Thread not found".to_string()))?;

        let depth = store.depth(&parent_id).unwrap_or_default() + 1;
        if depth > store.max_reply_depth() {
            return Err(AppError::BadRequest(format!(
                "Replies cannot nest deeper than {} levels",
                store.max_reply_depth()
            )));
        }

        let reply = req.into_reply(parent, &state.config.forum.default_author_id, Utc::now());
        store.add_thread(reply.clone());
        reply
    };

    tracing::info!(thread_id = %reply.id, parent_id = %parent_id, "Reply created");
    state.sse.broadcast(StoreEvent::ThreadAdded {
        thread_id: reply.id.clone(),
        category_id: reply.category_id.clone(),
        parent_id: reply.parent_id.clone(),
    });

    Ok(Json(reply))
}

/// Replace a thread wholesale
pub async fn update_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(thread): Json<Thread>,
) -> Result<Json<Thread>> {
    if thread.id != id {
        return Err(AppError::BadRequest(
            "Thread id does not match the path".to_string(),
        ));
    }
    if thread.content.trim().is_empty() {
        return Err(AppError::BadRequest("content is required".to_string()));
    }

    {
        let mut store = state.store.write().await;
        let current = store
            .thread(&id)
            .ok_or_else(|| AppError::NotFound("Thread not found".to_string()))?;

        if thread.upvotes < current.upvotes
            || thread.downvotes < current.downvotes
            || thread.views < current.views
        {
            return Err(AppError::BadRequest("Counters cannot decrease".to_string()));
        }
        if would_cycle(store.threads(), &id, thread.parent_id.as_deref()) {
            return Err(AppError::BadRequest(
                "A thread cannot be its own ancestor".to_string(),
            ));
        }

        store.update_thread(thread.clone());
    }

    state.sse.broadcast(StoreEvent::ThreadUpdated { thread_id: id });
    Ok(Json(thread))
}

/// Delete a thread. Its replies stay in the store but are no longer reachable
pub async fn delete_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let removed = state.store.write().await.delete_thread(&id);
    if !removed {
        return Err(AppError::NotFound("Thread not found".to_string()));
    }

    tracing::info!(thread_id = %id, "Thread deleted");
    state.sse.broadcast(StoreEvent::ThreadDeleted { thread_id: id.clone() });
    Ok(Json(serde_json::json!({ "deleted": id })))
}

/// Add one upvote
pub async fn upvote_thread(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Thread>> {
    let thread = {
        let mut store = state.store.write().await;
        if !store.upvote_thread(&id) {
            return Err(AppError::NotFound("Thread not found".to_string()));
        }
        store
            .thread(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Thread not found".to_string()))?
    };

    state.sse.broadcast(StoreEvent::ThreadUpdated { thread_id: id });
    Ok(Json(thread))
}
