use axum::{
    extract::{Path, State},
    Extension, Json,
};

use rrv_core::RestaurantRecord;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

/// GET /api/v1/restaurants/{id}
///
/// Served from the cache when the restaurant was seen in a search, then
/// from a Nominatim lookup. When both miss, a placeholder pointing at an
/// OpenStreetMap search is returned rather than an error.
pub(super) async fn get_restaurant(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Json<ApiResponse<RestaurantRecord>> {
    Json(ApiResponse::new(resolve_restaurant(&state, &id).await, req_id.0))
}

async fn resolve_restaurant(state: &AppState, id: &str) -> RestaurantRecord {
    if let Some(cached) = state.cache.get(id) {
        return cached;
    }

    match state.search.lookup(id).await {
        Some(record) => {
            state.cache.put(record.clone());
            record
        }
        None => {
            tracing::info!(restaurant_id = id, "restaurant details unavailable; using placeholder");
            RestaurantRecord::placeholder(id)
        }
    }
}
