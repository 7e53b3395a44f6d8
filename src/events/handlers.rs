use std::slice;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::HeaderMap,
    response::Response,
    routing::{get, patch, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    dto::{EventChanges, EventUpdated, ListQuery},
    repo_types::{Event, EventStatus},
    services::parse_deadline,
};
use crate::{
    auth::AuthContext,
    error::{AppError, AppResult},
    form::{parse_id, FormData},
    freshness::{self, Evaluation, Freshness},
    images,
    merge,
    responses::{created, Deleted},
    state::AppState,
    store::Filter,
};

const IMAGE_FOLDER: &str = "events";

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/:id", get(get_event))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event))
        .route("/events/:id", patch(update_event).delete(delete_event))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

fn owned_by(user_id: Uuid) -> Filter {
    Filter::new().eq("user_id", user_id)
}

// --- handlers ---

/// POST /events (multipart)
/// Fields: title (required), description, location, target_amount, deadline; files under `images`.
#[instrument(skip(state, form))]
pub async fn create_event(
    State(state): State<AppState>,
    ctx: AuthContext,
    mut form: FormData,
) -> AppResult<Response> {
    let title = form.required_text("title")?;
    let target_amount = form.number("target_amount")?;
    let deadline = form
        .text("deadline")
        .filter(|d| !d.is_empty())
        .as_deref()
        .map(parse_deadline)
        .transpose()?;
    let files = form.take_files("images");

    let images = images::upload_images(&state, IMAGE_FOLDER, files).await?;

    let now = OffsetDateTime::now_utc();
    let event = Event {
        id: Uuid::now_v7(),
        user_id: ctx.user_id,
        title,
        description: form.text("description").filter(|v| !v.is_empty()),
        location: form.text("location").filter(|v| !v.is_empty()),
        target_amount,
        deadline,
        status: EventStatus::Active,
        images,
        created_at: now,
        updated_at: now,
    };
    if let Err(e) = state.repo::<Event>().insert(&event).await {
        images::discard_images(&state, &event.images).await;
        return Err(e.into());
    }

    info!(event_id = %event.id, images = event.images.len(), "event created");
    Ok(created(format!("/api/v1/events/{}", event.id), event))
}

/// GET /events?q=
#[instrument(skip(state, headers))]
pub async fn list_events(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let mut filter = owned_by(ctx.user_id);
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        filter = filter.title_contains(q);
    }
    let events = state.repo::<Event>().find(&filter).await?;

    Ok(match freshness::evaluate(&headers, &events) {
        Evaluation::NotModified => freshness::not_modified(),
        Evaluation::Modified(f) => freshness::respond(f, events),
    })
}

#[instrument(skip(state, headers))]
pub async fn get_event(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let id = parse_id(&raw_id, "event")?;
    let event = state
        .repo::<Event>()
        .find_one(id, Some(owned_by(ctx.user_id)))
        .await?
        .ok_or_else(|| AppError::not_found("event not found or not owned"))?;

    Ok(match freshness::evaluate(&headers, slice::from_ref(&event)) {
        Evaluation::NotModified => freshness::not_modified(),
        Evaluation::Modified(f) => freshness::respond(f, event),
    })
}

/// PATCH /events/:id (multipart)
/// Repeated `images` fields list the URLs to keep; files under `new_images` are appended.
#[instrument(skip(state, headers, form))]
pub async fn update_event(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    form: Result<FormData, AppError>,
) -> AppResult<Response> {
    let id = parse_id(&raw_id, "event")?;
    // A malformed body is only reported once the caller may modify the event.
    let body = match form {
        Ok(mut form) => {
            let new_files = form.take_files("new_images");
            let changes = EventChanges::from_form(&form);
            if changes.is_empty() && new_files.is_empty() {
                return Err(AppError::NoFieldsToUpdate);
            }
            Ok((changes, new_files))
        }
        Err(e) => Err(e),
    };

    let repo = state.repo::<Event>();
    let existing = repo
        .find_one(id, None)
        .await?
        .ok_or_else(|| AppError::not_found("event not found"))?;
    ctx.ensure_can_modify(existing.user_id)?;
    let (changes, new_files) = body?;
    let guard = freshness::precondition(&headers, &existing)?;

    let mut patch = changes.parse()?;
    patch.uploaded_images = images::upload_images(&state, IMAGE_FOLDER, new_files).await?;
    let uploaded = patch.uploaded_images.clone();

    let updated = match merge::apply_patch(&repo, id, guard, patch).await {
        Ok(event) => event,
        Err(e) => {
            images::discard_images(&state, &uploaded).await;
            return Err(e);
        }
    };

    info!(event_id = %id, "event updated");
    Ok(freshness::respond(
        Freshness::of(slice::from_ref(&updated)),
        EventUpdated {
            message: "event updated successfully",
            event: updated,
        },
    ))
}

#[instrument(skip(state))]
pub async fn delete_event(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Deleted>> {
    let id = parse_id(&raw_id, "event")?;
    let repo = state.repo::<Event>();
    let existing = repo
        .find_one(id, None)
        .await?
        .ok_or_else(|| AppError::not_found("event not found"))?;
    ctx.ensure_can_modify(existing.user_id)?;

    if repo.delete(id).await? == 0 {
        return Err(AppError::not_found("event not found"));
    }
    images::cleanup_images(&state, existing.images);

    info!(event_id = %id, "event deleted");
    Ok(Deleted::new("event", id))
}
