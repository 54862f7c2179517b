//! Review handlers: CRUD, per-restaurant and per-user listings, and their
//! server-sent event streams.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use futures::{Stream, StreamExt};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use rrv_core::{average_rating, CoreError, Rating, ReviewDraft, ReviewFilter, ReviewRecord};
use rrv_db::{RestaurantCache, ReviewStore};

use crate::middleware::{CurrentSession, RequestId};

use super::{map_store_error, ApiError, ApiResponse, AppState};

const SNAPSHOT_EVENT: &str = "snapshot";
const UNKNOWN_RESTAURANT: &str = "Unknown Restaurant";

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateReviewRequest {
    pub title: String,
    pub comment: String,
    pub rating: i64,
    #[serde(default)]
    pub restaurant_name: String,
}

impl CreateReviewRequest {
    fn into_draft(self) -> Result<ReviewDraft, CoreError> {
        Ok(ReviewDraft {
            title: self.title,
            comment: self.comment,
            rating: Rating::new(self.rating)?,
            restaurant_name: self.restaurant_name,
        })
    }
}

/// PATCH body. Absent fields keep their current value.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateReviewRequest {
    pub title: Option<String>,
    pub comment: Option<String>,
    pub rating: Option<i64>,
    pub restaurant_name: Option<String>,
}

impl UpdateReviewRequest {
    fn merge_onto(self, current: ReviewRecord) -> Result<ReviewDraft, CoreError> {
        Ok(ReviewDraft {
            title: self.title.unwrap_or(current.title),
            comment: self.comment.unwrap_or(current.comment),
            rating: match self.rating {
                Some(value) => Rating::new(value)?,
                None => current.rating,
            },
            restaurant_name: self.restaurant_name.unwrap_or(current.restaurant_name),
        })
    }
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Field names follow the camelCase of the nested review records.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RestaurantReviews {
    pub reviews: Vec<ReviewRecord>,
    pub average_rating: Option<Decimal>,
    pub review_count: usize,
}

impl From<Vec<ReviewRecord>> for RestaurantReviews {
    fn from(reviews: Vec<ReviewRecord>) -> Self {
        Self {
            average_rating: average_rating(&reviews),
            review_count: reviews.len(),
            reviews,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RestaurantSummary {
    pub name: String,
    pub display_name: String,
}

/// A review listed on the author's profile, with restaurant details from
/// the cache.
#[derive(Debug, Serialize)]
pub(super) struct MyReview {
    #[serde(flatten)]
    pub review: ReviewRecord,
    pub restaurant: RestaurantSummary,
}

fn with_restaurant(cache: &dyn RestaurantCache, reviews: Vec<ReviewRecord>) -> Vec<MyReview> {
    reviews
        .into_iter()
        .map(|review| {
            let restaurant = match cache.get(&review.place_id) {
                Some(record) => RestaurantSummary {
                    name: record.name,
                    display_name: record.display_name,
                },
                None => RestaurantSummary {
                    name: UNKNOWN_RESTAURANT.to_string(),
                    display_name: format!("Restaurant ID: {}", review.place_id),
                },
            };
            MyReview { review, restaurant }
        })
        .collect()
}

fn validation_error(request_id: String, error: &CoreError) -> ApiError {
    ApiError::new(request_id, "validation_error", error.to_string())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/restaurants/{id}/reviews
pub(super) async fn list_restaurant_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(place_id): Path<String>,
) -> Result<Json<ApiResponse<RestaurantReviews>>, ApiError> {
    let reviews = state
        .store
        .list(&ReviewFilter::ByRestaurant(place_id))
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(reviews.into(), req_id.0)))
}

/// POST /api/v1/restaurants/{id}/reviews
pub(super) async fn create_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentSession(session): CurrentSession,
    Path(place_id): Path<String>,
    Json(body): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ReviewRecord>>), ApiError> {
    let draft = body
        .into_draft()
        .map_err(|e| validation_error(req_id.0.clone(), &e))?;

    let review = state
        .store
        .create(&session, &place_id, draft)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    tracing::info!(review_id = %review.id, place_id = %review.place_id, "review created");
    Ok((StatusCode::CREATED, Json(ApiResponse::new(review, req_id.0))))
}

/// GET /api/v1/reviews/{id}
pub(super) async fn get_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ReviewRecord>>, ApiError> {
    let review = state
        .store
        .get(&id)
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "review not found"))?;

    Ok(Json(ApiResponse::new(review, req_id.0)))
}

/// PATCH /api/v1/reviews/{id} (author only)
pub(super) async fn update_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
    Json(body): Json<UpdateReviewRequest>,
) -> Result<Json<ApiResponse<ReviewRecord>>, ApiError> {
    let rid = &req_id.0;

    let current = state
        .store
        .get(&id)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", "review not found"))?;
    if !current.is_owned_by(&session) {
        return Err(ApiError::new(
            rid,
            "forbidden",
            "you can only modify your own reviews",
        ));
    }

    let draft = body
        .merge_onto(current)
        .map_err(|e| validation_error(rid.clone(), &e))?;
    let review = state
        .store
        .update(&session, &id, draft)
        .await
        .map_err(|e| map_store_error(rid.clone(), &e))?;

    tracing::info!(review_id = %review.id, "review updated");
    Ok(Json(ApiResponse::new(review, req_id.0)))
}

/// DELETE /api/v1/reviews/{id} (author only)
pub(super) async fn delete_review(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentSession(session): CurrentSession,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete(&session, &id)
        .await
        .map_err(|e| map_store_error(req_id.0, &e))?;

    tracing::info!(review_id = %id, "review deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/me/reviews
pub(super) async fn list_my_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentSession(session): CurrentSession,
) -> Result<Json<ApiResponse<Vec<MyReview>>>, ApiError> {
    let reviews = state
        .store
        .list(&ReviewFilter::ByUser(session.user_id))
        .await
        .map_err(|e| map_store_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        with_restaurant(state.cache.as_ref(), reviews),
        req_id.0,
    )))
}

/// GET /api/v1/restaurants/{id}/reviews/stream
///
/// Emits a `snapshot` event with the full review list now and after every
/// change. The subscription is released when the client disconnects.
pub(super) async fn stream_restaurant_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(place_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let subscription = state
        .store
        .subscribe(ReviewFilter::ByRestaurant(place_id))
        .await
        .map_err(|e| map_store_error(req_id.0, &e))?;

    let events = subscription.into_stream().map(|reviews| {
        Event::default()
            .event(SNAPSHOT_EVENT)
            .json_data(RestaurantReviews::from(reviews))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// GET /api/v1/me/reviews/stream
pub(super) async fn stream_my_reviews(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    CurrentSession(session): CurrentSession,
) -> Result<Sse<impl Stream<Item = Result<Event, axum::Error>>>, ApiError> {
    let subscription = state
        .store
        .subscribe(ReviewFilter::ByUser(session.user_id))
        .await
        .map_err(|e| map_store_error(req_id.0, &e))?;

    let cache = Arc::clone(&state.cache);
    let events = subscription.into_stream().map(move |reviews| {
        Event::default()
            .event(SNAPSHOT_EVENT)
            .json_data(with_restaurant(cache.as_ref(), reviews))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
