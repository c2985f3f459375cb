mod categories;
mod selection;
mod threads;

use axum::{routing::{get, post}, Router};

use crate::AppState;

/// Build the API router
pub fn router() -> Router<AppState> {
    Router::new()
        // Store status flags
        .route("/status", get(selection::get_status))
        // Category routes (categories are fixed at startup)
        .route("/categories", get(categories::list_categories))
        .route("/categories/{slug}/threads", get(categories::get_category_threads))
        // Selected category filter (persisted)
        .route("/selection", get(selection::get_selection))
        .route("/selection/{category_id}/toggle", post(selection::toggle_category))
        // Thread routes
        .route("/threads", get(threads::list_threads).post(threads::create_thread))
        .route(
            "/threads/{id}",
            get(threads::get_thread)
                .put(threads::update_thread)
                .delete(threads::delete_thread),
        )
        .route("/threads/{id}/replies", post(threads::create_reply))
        .route("/threads/{id}/upvote", post(threads::upvote_thread))
}
