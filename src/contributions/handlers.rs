use std::slice;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{ContributionPatch, ContributionUpdated, CreateContribution, ListQuery},
    repo_types::{Contribution, ContributionStatus},
};
use crate::{
    auth::AuthContext,
    error::{AppError, AppResult},
    events::Event,
    form::parse_id,
    freshness::{self, Evaluation, Freshness},
    merge::{self, Patch},
    responses::{created, Deleted},
    state::AppState,
    store::Filter,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/contributions", get(list_contributions))
        .route("/contributions/:id", get(get_contribution))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/contributions", post(create_contribution))
        .route(
            "/contributions/:id",
            patch(update_contribution).delete(delete_contribution),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_contribution(
    State(state): State<AppState>,
    ctx: AuthContext,
    payload: Result<Json<CreateContribution>, JsonRejection>,
) -> AppResult<Response> {
    let Json(input) = payload?;

    let raw_event_id = input
        .event_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::invalid("event_id is required"))?;
    let event_id = parse_id(raw_event_id, "event")?;
    state
        .repo::<Event>()
        .find_one(event_id, None)
        .await?
        .ok_or_else(|| AppError::invalid("event not found"))?;

    if input.amount <= 0.0 || !input.amount.is_finite() {
        return Err(AppError::invalid("amount must be greater than 0"));
    }

    let now = OffsetDateTime::now_utc();
    let contribution = Contribution {
        id: Uuid::now_v7(),
        event_id,
        contributor_name: input.contributor_name,
        contributor_contact: input.contributor_contact,
        amount: input.amount,
        currency: input.currency,
        method: input.method,
        payment_reference: input.payment_reference,
        status: ContributionStatus::Pending,
        receipt_url: input.receipt_url,
        created_at: now,
        updated_at: now,
    };
    state.repo::<Contribution>().insert(&contribution).await?;

    info!(contribution_id = %contribution.id, %event_id, "contribution created");
    Ok(created(
        format!("/api/v1/contributions/{}", contribution.id),
        contribution,
    ))
}

/// GET /contributions?event_id=&status=
/// A malformed `event_id` is ignored rather than rejected.
#[instrument(skip(state, headers))]
pub async fn list_contributions(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let mut filter = Filter::new();
    if let Some(event_id) = query
        .event_id
        .as_deref()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
    {
        filter = filter.eq("event_id", event_id);
    }
    if let Some(status) = query.status.as_deref().filter(|s| !s.is_empty()) {
        filter = filter.eq("status", status);
    }
    let contributions = state.repo::<Contribution>().find(&filter).await?;

    Ok(match freshness::evaluate(&headers, &contributions) {
        Evaluation::NotModified => freshness::not_modified(),
        Evaluation::Modified(f) => freshness::respond(f, contributions),
    })
}

#[instrument(skip(state, headers))]
pub async fn get_contribution(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let id = parse_id(&raw_id, "contribution")?;
    let contribution = state
        .repo::<Contribution>()
        .find_one(id, None)
        .await?
        .ok_or_else(|| AppError::not_found("contribution not found"))?;

    Ok(match freshness::evaluate(&headers, slice::from_ref(&contribution)) {
        Evaluation::NotModified => freshness::not_modified(),
        Evaluation::Modified(f) => freshness::respond(f, contribution),
    })
}

/// PATCH /contributions/:id (JSON)
/// `amount` is not re-validated here; any present value is written as is.
#[instrument(skip(state, headers, payload))]
pub async fn update_contribution(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ContributionPatch>, JsonRejection>,
) -> AppResult<Response> {
    let id = parse_id(&raw_id, "contribution")?;
    let Json(patch) = payload?;
    let fields = patch.into_fields(OffsetDateTime::now_utc())?;

    let repo = state.repo::<Contribution>();
    let existing = repo
        .find_one(id, None)
        .await?
        .ok_or_else(|| AppError::not_found("contribution not found"))?;
    let guard = freshness::precondition(&headers, &existing)?;

    let updated = merge::apply(&repo, id, guard, fields).await?;

    info!(contribution_id = %id, "contribution updated");
    Ok(freshness::respond(
        Freshness::of(slice::from_ref(&updated)),
        ContributionUpdated {
            message: "contribution updated successfully",
            contribution: updated,
        },
    ))
}

#[instrument(skip(state))]
pub async fn delete_contribution(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Deleted>> {
    let id = parse_id(&raw_id, "contribution")?;
    if state.repo::<Contribution>().delete(id).await? == 0 {
        return Err(AppError::not_found("contribution not found"));
    }
    info!(contribution_id = %id, "contribution deleted");
    Ok(Deleted::new("contribution", id))
}
