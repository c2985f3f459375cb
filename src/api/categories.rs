use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::{
    error::{AppError, Result},
    models::{Category, CategoryPageResponse},
    query::{self, sort_threads},
    AppState,
};

use super::threads::ListQuery;

/// List all categories with derived thread counts
pub async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    let store = state.store.read().await;
    let categories = store
        .categories()
        .iter()
        .map(|c| c.with_thread_count(query::thread_count(store.threads(), &c.id)))
        .collect();
    Json(categories)
}

/// Get one category's threads by slug
pub async fn get_category_threads(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<ListQuery>,
) -> Result<Json<CategoryPageResponse>> {
    let sort = params.sort_key()?;
    let store = state.store.read().await;

    let category = store
        .category_by_slug(&slug)
        .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))?;

    // Match through the category lookup so orphaned threads never appear
    let mut in_category: Vec<_> = store
        .threads()
        .iter()
        .filter(|t| store.category(&t.category_id).is_some_and(|c| c.slug == slug))
        .collect();
    let total_threads = in_category.len();
    sort_threads(&mut in_category, sort);

    let threads = store.render(query::top_level(in_category));

    Ok(Json(CategoryPageResponse {
        category: category.with_thread_count(total_threads),
        threads,
        total_threads,
    }))
}
