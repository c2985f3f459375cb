use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::{sse::StoreEvent, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResponse {
    pub selected_categories: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub is_loading: bool,
    pub error: Option<String>,
}

/// Loading and error flags
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let store = state.store.read().await;
    Json(StatusResponse {
        is_loading: store.is_loading(),
        error: store.error().map(str::to_string),
    })
}

/// Currently selected categories
pub async fn get_selection(State(state): State<AppState>) -> Json<SelectionResponse> {
    let store = state.store.read().await;
    Json(SelectionResponse {
        selected_categories: store.selected_categories().to_vec(),
    })
}

/// Select or deselect a category.
///
/// Unknown category IDs are accepted, matching the store: they simply
/// filter out every thread.
pub async fn toggle_category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Json<SelectionResponse> {
    let selected_categories = {
        let mut store = state.store.write().await;
        store.toggle_category(&category_id);
        store.selected_categories().to_vec()
    };

    state.sse.broadcast(StoreEvent::SelectionChanged {
        selected_categories: selected_categories.clone(),
    });
    Json(SelectionResponse { selected_categories })
}
