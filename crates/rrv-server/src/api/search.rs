use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::Deserialize;

use rrv_core::RestaurantRecord;
use rrv_search::DEFAULT_LIMIT;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

const MAX_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

pub(super) fn normalize_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// GET /api/v1/search: combined restaurant search.
///
/// Every result is cached so detail pages and review lists can show it
/// without another provider round trip.
pub(super) async fn search_restaurants(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> Json<ApiResponse<Vec<RestaurantRecord>>> {
    let results = state
        .search
        .search(&query.q, normalize_limit(query.limit))
        .await;

    for record in &results {
        state.cache.put(record.clone());
    }

    Json(ApiResponse::new(results, req_id.0))
}
