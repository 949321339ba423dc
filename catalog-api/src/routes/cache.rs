use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    app_state::AppState,
    domain::search::{CacheStats, CatalogStore, ItemId},
};

pub fn router<S: CatalogStore + Clone + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/", delete(clear_cache::<S>))
        .route("/items/:id", delete(invalidate_item::<S>))
        .route("/stats", get(cache_stats::<S>))
}

#[derive(Debug, Deserialize)]
struct ClearQuery {
    /// Only drop entries whose filter key contains this text
    contains: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClearResponse {
    removed: usize,
}

#[instrument(name = "DELETE /cache", skip(app_state))]
async fn clear_cache<S: CatalogStore + Clone + 'static>(
    State(app_state): State<AppState<S>>,
    Query(query): Query<ClearQuery>,
) -> Response {
    match query.contains.as_deref().filter(|needle| !needle.is_empty()) {
        Some(needle) => {
            let removed = app_state.search_service.invalidate_matching(needle);
            Json(ClearResponse { removed }).into_response()
        }
        None => {
            app_state.search_service.invalidate_all();
            StatusCode::NO_CONTENT.into_response()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvalidateResponse {
    item_id: ItemId,
    removed: usize,
}

#[instrument(name = "DELETE /cache/items/:id", skip(app_state))]
async fn invalidate_item<S: CatalogStore + Clone + 'static>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Json<InvalidateResponse> {
    let item_id = ItemId::new(id);
    let removed = app_state.search_service.invalidate(item_id);
    Json(InvalidateResponse { item_id, removed })
}

#[instrument(name = "GET /cache/stats", skip(app_state))]
async fn cache_stats<S: CatalogStore + Clone + 'static>(
    State(app_state): State<AppState<S>>,
) -> Json<CacheStats> {
    Json(app_state.search_service.cache().stats())
}
