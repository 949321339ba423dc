use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    app_state::AppState,
    domain::search::{
        CatalogStore, ItemId, RefreshStats, SearchFilters, SearchResponse, SortBy, VehicleFilter,
        DEFAULT_SUGGESTION_LIMIT,
    },
    routes::ApiError,
};

pub fn router<S: CatalogStore + Clone + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(search::<S>))
        .route("/suggestions", get(suggestions::<S>))
        .route("/compatibility/refresh", post(refresh_compatibility::<S>))
        .route(
            "/items/:id/compatibility/refresh",
            post(refresh_item_compatibility::<S>),
        )
}

/// Flat query string form of [`SearchFilters`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchParams {
    #[serde(alias = "q")]
    search: Option<String>,
    vehicle_make: Option<String>,
    vehicle_model: Option<String>,
    vehicle_year: Option<String>,
    category: Option<String>,
    brand: Option<String>,
    dealer: Option<String>,
    supplier: Option<String>,
    condition: Option<String>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    in_stock: Option<bool>,
    sort_by: Option<SortBy>,
    page: Option<u32>,
    limit: Option<u32>,
}

impl From<SearchParams> for SearchFilters {
    fn from(params: SearchParams) -> Self {
        let vehicle = VehicleFilter {
            make: params.vehicle_make,
            model: params.vehicle_model,
            year: params.vehicle_year,
        };

        Self {
            search: params.search,
            vehicle: (!vehicle.is_empty()).then_some(vehicle),
            category: params.category,
            brand: params.brand,
            dealer: params.dealer,
            supplier: params.supplier,
            condition: params.condition,
            min_price: params.min_price,
            max_price: params.max_price,
            in_stock: params.in_stock,
            sort_by: params.sort_by,
            page: params.page,
            limit: params.limit,
        }
    }
}

#[instrument(name = "GET /search", skip(app_state))]
async fn search<S: CatalogStore + Clone + 'static>(
    State(app_state): State<AppState<S>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Arc<SearchResponse>>, ApiError> {
    let response = app_state.search_service.search(params.into()).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct SuggestionQuery {
    #[serde(default)]
    q: String,
    limit: Option<usize>,
}

#[instrument(name = "GET /search/suggestions", skip(app_state))]
async fn suggestions<S: CatalogStore + Clone + 'static>(
    State(app_state): State<AppState<S>>,
    Query(query): Query<SuggestionQuery>,
) -> Json<Vec<String>> {
    let limit = query.limit.unwrap_or(DEFAULT_SUGGESTION_LIMIT);
    Json(app_state.search_service.suggestions(&query.q, limit))
}

#[instrument(name = "POST /search/compatibility/refresh", skip(app_state))]
async fn refresh_compatibility<S: CatalogStore + Clone + 'static>(
    State(app_state): State<AppState<S>>,
) -> Result<Json<RefreshStats>, ApiError> {
    let stats = app_state.search_service.refresh_compatibility().await?;
    Ok(Json(stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemRefreshResponse {
    item_id: ItemId,
    changed: bool,
}

#[instrument(name = "POST /search/items/:id/compatibility/refresh", skip(app_state))]
async fn refresh_item_compatibility<S: CatalogStore + Clone + 'static>(
    State(app_state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<Json<ItemRefreshResponse>, ApiError> {
    let item_id = ItemId::new(id);
    let changed = app_state
        .search_service
        .refresh_item_compatibility(item_id)
        .await?;

    Ok(Json(ItemRefreshResponse { item_id, changed }))
}
