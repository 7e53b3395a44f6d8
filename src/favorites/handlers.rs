use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::repo_types::Favorite;
use crate::{
    auth::AuthContext,
    error::{AppError, AppResult},
    form::parse_id,
    freshness::{self, Evaluation},
    hubs::{handlers::load_hub, services::enrich, Hub},
    responses::{created, Deleted},
    state::AppState,
    store::{Filter, StoreError},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/hubs/:id/favorite", post(add_favorite).delete(remove_favorite))
        .route("/favorites", get(list_favorites))
}

fn pair(user_id: Uuid, hub_id: Uuid) -> Filter {
    Filter::new().eq("user_id", user_id).eq("hub_id", hub_id)
}

/// POST /hubs/:id/favorite
/// Idempotent: 201 when the favorite is new, 200 with the existing record otherwise.
#[instrument(skip(state))]
pub async fn add_favorite(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(raw_id): Path<String>,
) -> AppResult<Response> {
    let hub_id = parse_id(&raw_id, "hub")?;
    load_hub(&state, hub_id).await?;

    let repo = state.repo::<Favorite>();
    if let Some(existing) = repo.find_by(&pair(ctx.user_id, hub_id)).await? {
        return Ok(Json(existing).into_response());
    }

    let favorite = Favorite {
        id: Uuid::now_v7(),
        user_id: ctx.user_id,
        hub_id,
        created_at: OffsetDateTime::now_utc(),
    };
    match repo.insert(&favorite).await {
        Ok(_) => {
            info!(%hub_id, user_id = %ctx.user_id, "hub favorited");
            Ok(created("/api/v1/favorites".into(), favorite))
        }
        // lost a race with a concurrent favorite of the same pair
        Err(StoreError::Duplicate(_)) => {
            debug!(%hub_id, "favorite already exists");
            let existing = repo
                .find_by(&pair(ctx.user_id, hub_id))
                .await?
                .ok_or_else(|| AppError::Internal("favorite vanished after conflict".into()))?;
            Ok(Json(existing).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

#[instrument(skip(state))]
pub async fn remove_favorite(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Deleted>> {
    let hub_id = parse_id(&raw_id, "hub")?;
    let removed = state
        .repo::<Favorite>()
        .delete_where(&pair(ctx.user_id, hub_id))
        .await?;
    if removed == 0 {
        return Err(AppError::not_found("favorite not found"));
    }
    info!(%hub_id, user_id = %ctx.user_id, "hub unfavorited");
    Ok(Deleted::new("favorite", hub_id))
}

/// GET /favorites: the caller's favorited hubs, enriched.
#[instrument(skip(state, headers))]
pub async fn list_favorites(
    State(state): State<AppState>,
    ctx: AuthContext,
    headers: HeaderMap,
) -> AppResult<Response> {
    let favorites = state
        .repo::<Favorite>()
        .find(&Filter::new().eq("user_id", ctx.user_id))
        .await?;
    if favorites.is_empty() {
        return Ok(freshness::respond(None, Vec::<Hub>::new()));
    }
    let hubs = state
        .repo::<Hub>()
        .find(&Filter::new().any_of("id", favorites.iter().map(|f| f.hub_id)))
        .await?;

    let freshness = match freshness::evaluate(&headers, &hubs) {
        Evaluation::NotModified => return Ok(freshness::not_modified()),
        Evaluation::Modified(f) => f,
    };
    let views = enrich(&state, hubs, Some(ctx.user_id)).await;
    Ok(freshness::respond(freshness, views))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use uuid::Uuid;

    use crate::testing::{Part, Req, TestApp};

    async fn seed_hub(app: &TestApp, title: &str) -> Uuid {
        app.send(
            Req::new(Method::POST, "/api/v1/hubs")
                .auth(Uuid::now_v7())
                .multipart(&[Part::Text("title", title)]),
        )
        .await
        .id()
    }

    fn favorite(method: Method, hub: Uuid, user: Uuid) -> axum::http::Request<axum::body::Body> {
        Req::new(method, &format!("/api/v1/hubs/{}/favorite", hub))
            .auth(user)
            .empty()
    }

    #[tokio::test]
    async fn favoriting_is_idempotent() {
        let app = TestApp::new();
        let hub = seed_hub(&app, "Hub").await;
        let user = Uuid::now_v7();

        let first = app.send(favorite(Method::POST, hub, user)).await;
        assert_eq!(first.status, StatusCode::CREATED);
        let second = app.send(favorite(Method::POST, hub, user)).await;
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(first.body["id"], second.body["id"]);
    }

    #[tokio::test]
    async fn favoriting_a_missing_hub_is_not_found() {
        let app = TestApp::new();
        let res = app
            .send(favorite(Method::POST, Uuid::now_v7(), Uuid::now_v7()))
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_returns_enriched_favorites_only() {
        let app = TestApp::new();
        let user = Uuid::now_v7();
        let liked = seed_hub(&app, "Liked").await;
        seed_hub(&app, "Ignored").await;

        let res = app.send(Req::get("/api/v1/favorites").auth(user).empty()).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body, json!([]));

        app.send(favorite(Method::POST, liked, user)).await;
        let res = app.send(Req::get("/api/v1/favorites").auth(user).empty()).await;
        let hubs = res.body.as_array().unwrap();
        assert_eq!(hubs.len(), 1);
        assert_eq!(hubs[0]["title"], "Liked");
        assert_eq!(hubs[0]["is_favorite"], true);
    }

    #[tokio::test]
    async fn unfavorite_then_missing() {
        let app = TestApp::new();
        let hub = seed_hub(&app, "Hub").await;
        let user = Uuid::now_v7();
        app.send(favorite(Method::POST, hub, user)).await;

        let res = app.send(favorite(Method::DELETE, hub, user)).await;
        assert_eq!(res.status, StatusCode::OK);
        let res = app.send(favorite(Method::DELETE, hub, user)).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body, json!({"error": "favorite not found"}));
    }
}
