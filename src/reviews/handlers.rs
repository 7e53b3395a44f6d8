use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::HeaderMap,
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::repo_types::Review;
use crate::{
    auth::AuthContext,
    error::{AppError, AppResult},
    form::parse_id,
    freshness::{self, Evaluation},
    hubs::{handlers::load_hub, services::review_views},
    responses::{created, Deleted},
    state::AppState,
    store::Filter,
};

#[derive(Debug, Deserialize)]
pub struct CreateReview {
    pub rating: i64,
    pub comment: Option<String>,
}

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/hubs/:id/reviews", get(list_reviews))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/hubs/:id/reviews", post(create_review))
        .route("/reviews/:id", delete(delete_review))
}

/// GET /hubs/:id/reviews
#[instrument(skip(state, headers))]
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let hub_id = parse_id(&raw_id, "hub")?;
    load_hub(&state, hub_id).await?;

    let reviews = state
        .repo::<Review>()
        .find(&Filter::new().eq("hub_id", hub_id))
        .await?;
    let freshness = match freshness::evaluate(&headers, &reviews) {
        Evaluation::NotModified => return Ok(freshness::not_modified()),
        Evaluation::Modified(f) => f,
    };
    Ok(freshness::respond(freshness, review_views(&state, reviews).await))
}

/// POST /hubs/:id/reviews { rating: 1..=5, comment? }
#[instrument(skip(state, payload))]
pub async fn create_review(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(raw_id): Path<String>,
    payload: Result<Json<CreateReview>, JsonRejection>,
) -> AppResult<Response> {
    let hub_id = parse_id(&raw_id, "hub")?;
    let Json(input) = payload?;
    let rating = u8::try_from(input.rating)
        .ok()
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| AppError::invalid("rating must be between 1 and 5"))?;
    load_hub(&state, hub_id).await?;

    let now = OffsetDateTime::now_utc();
    let review = Review {
        id: Uuid::now_v7(),
        user_id: ctx.user_id,
        hub_id,
        rating,
        comment: input.comment.filter(|c| !c.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };
    state.repo::<Review>().insert(&review).await?;

    info!(review_id = %review.id, %hub_id, rating, "review created");
    let location = format!("/api/v1/hubs/{}/reviews", hub_id);
    let mut views = review_views(&state, vec![review]).await;
    let view = views
        .pop()
        .ok_or_else(|| AppError::Internal("review view missing".into()))?;
    Ok(created(location, view))
}

/// DELETE /reviews/:id (author or admin)
#[instrument(skip(state))]
pub async fn delete_review(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Deleted>> {
    let id = parse_id(&raw_id, "review")?;
    let repo = state.repo::<Review>();
    let review = repo
        .find_one(id, None)
        .await?
        .ok_or_else(|| AppError::not_found("review not found"))?;
    ctx.ensure_can_modify(review.user_id)?;

    if repo.delete(id).await? == 0 {
        return Err(AppError::not_found("review not found"));
    }
    info!(review_id = %id, "review deleted");
    Ok(Deleted::new("review", id))
}
