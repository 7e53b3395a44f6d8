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
    dto::{HubChanges, HubUpdated, ListQuery},
    repo_types::{Coordinates, Hub, HubView},
    services::{enrich, enrich_one},
};
use crate::{
    auth::AuthContext,
    error::{AppError, AppResult},
    form::{parse_id, FormData},
    freshness::{self, Evaluation, Freshness},
    images, merge,
    responses::{created, Deleted},
    state::AppState,
    store::Filter,
};

const IMAGE_FOLDER: &str = "hubs";

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/hubs", get(list_hubs))
        .route("/hubs/:id", get(get_hub))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/hubs", post(create_hub))
        .route("/hubs/:id", patch(update_hub).delete(delete_hub))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

pub(crate) async fn load_hub(state: &AppState, id: Uuid) -> AppResult<Hub> {
    state
        .repo::<Hub>()
        .find_one(id, None)
        .await?
        .ok_or_else(|| AppError::not_found("hub not found"))
}

/// POST /hubs (multipart)
/// Fields: title (required), description, lat, lng, location_name, rating; files under `images`.
#[instrument(skip(state, form))]
pub async fn create_hub(
    State(state): State<AppState>,
    ctx: AuthContext,
    mut form: FormData,
) -> AppResult<Response> {
    let title = form.required_text("title")?;
    let coordinates = Coordinates {
        lat: form.number("lat")?.unwrap_or_default(),
        lng: form.number("lng")?.unwrap_or_default(),
    };
    let rating = form.number("rating")?;
    let files = form.take_files("images");

    let images = images::upload_images(&state, IMAGE_FOLDER, files).await?;

    let now = OffsetDateTime::now_utc();
    let hub = Hub {
        id: Uuid::now_v7(),
        user_id: ctx.user_id,
        title,
        description: form.text("description").filter(|v| !v.is_empty()),
        coordinates,
        location: form.text("location_name").filter(|v| !v.is_empty()),
        rating,
        images,
        created_at: now,
        updated_at: now,
    };
    if let Err(e) = state.repo::<Hub>().insert(&hub).await {
        images::discard_images(&state, &hub.images).await;
        return Err(e.into());
    }

    info!(hub_id = %hub.id, images = hub.images.len(), "hub created");
    let location = format!("/api/v1/hubs/{}", hub.id);
    Ok(created(location, HubView::new(hub, false, Vec::new())))
}

/// GET /hubs?q=&owner=
#[instrument(skip(state, headers))]
pub async fn list_hubs(
    State(state): State<AppState>,
    ctx: Option<AuthContext>,
    Query(query): Query<ListQuery>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let mut filter = Filter::new();
    if let Some(owner) = query.owner.as_deref().filter(|o| !o.is_empty()) {
        filter = filter.eq("user_id", parse_id(owner, "owner")?);
    }
    if let Some(q) = query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        filter = filter.title_contains(q);
    }
    let hubs = state.repo::<Hub>().find(&filter).await?;

    let freshness = match freshness::evaluate(&headers, &hubs) {
        Evaluation::NotModified => return Ok(freshness::not_modified()),
        Evaluation::Modified(f) => f,
    };
    let views = enrich(&state, hubs, ctx.map(|c| c.user_id)).await;
    Ok(freshness::respond(freshness, views))
}

#[instrument(skip(state, headers))]
pub async fn get_hub(
    State(state): State<AppState>,
    ctx: Option<AuthContext>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let id = parse_id(&raw_id, "hub")?;
    let hub = load_hub(&state, id).await?;

    let freshness = match freshness::evaluate(&headers, slice::from_ref(&hub)) {
        Evaluation::NotModified => return Ok(freshness::not_modified()),
        Evaluation::Modified(f) => f,
    };
    let view = enrich_one(&state, hub, ctx.map(|c| c.user_id)).await;
    Ok(freshness::respond(freshness, view))
}

/// PATCH /hubs/:id (multipart)
/// Repeated `images` fields list the URLs to keep; files under `new_images` are appended.
#[instrument(skip(state, headers, form))]
pub async fn update_hub(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    form: Result<FormData, AppError>,
) -> AppResult<Response> {
    let id = parse_id(&raw_id, "hub")?;
    let body = match form {
        Ok(mut form) => {
            let new_files = form.take_files("new_images");
            let changes = HubChanges::from_form(&form);
            if changes.is_empty() && new_files.is_empty() {
                return Err(AppError::NoFieldsToUpdate);
            }
            Ok((changes, new_files))
        }
        Err(e) => Err(e),
    };

    let existing = load_hub(&state, id).await?;
    ctx.ensure_can_modify(existing.user_id)?;
    let (changes, new_files) = body?;
    let guard = freshness::precondition(&headers, &existing)?;

    let mut patch = changes.parse()?;
    patch.uploaded_images = images::upload_images(&state, IMAGE_FOLDER, new_files).await?;
    let uploaded = patch.uploaded_images.clone();

    let updated = match merge::apply_patch(&state.repo::<Hub>(), id, guard, patch).await {
        Ok(hub) => hub,
        Err(e) => {
            images::discard_images(&state, &uploaded).await;
            return Err(e);
        }
    };

    info!(hub_id = %id, "hub updated");
    let freshness = Freshness::of(slice::from_ref(&updated));
    let hub = enrich_one(&state, updated, Some(ctx.user_id)).await;
    Ok(freshness::respond(
        freshness,
        HubUpdated {
            message: "hub updated successfully",
            hub,
        },
    ))
}

#[instrument(skip(state))]
pub async fn delete_hub(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(raw_id): Path<String>,
) -> AppResult<Json<Deleted>> {
    let id = parse_id(&raw_id, "hub")?;
    let existing = load_hub(&state, id).await?;
    ctx.ensure_can_modify(existing.user_id)?;

    if state.repo::<Hub>().delete(id).await? == 0 {
        return Err(AppError::not_found("hub not found"));
    }
    images::cleanup_images(&state, existing.images);

    info!(hub_id = %id, "hub deleted");
    Ok(Deleted::new("hub", id))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;
    use uuid::Uuid;

    use crate::testing::{FakeAssets, Part, Req, TestApp, TestResponse};

    async fn create(app: &TestApp, owner: Uuid, parts: &[Part<'_>]) -> TestResponse {
        let res = app
            .send(Req::new(Method::POST, "/api/v1/hubs").auth(owner).multipart(parts))
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res
    }

    fn hub_uri(id: Uuid) -> String {
        format!("/api/v1/hubs/{}", id)
    }

    #[tokio::test]
    async fn create_returns_view_with_location_name() {
        let app = TestApp::new();
        let owner = Uuid::now_v7();
        let res = create(
            &app,
            owner,
            &[
                Part::Text("title", "Kibera Makerspace"),
                Part::Text("lat", "-1.3133"),
                Part::Text("lng", "36.7876"),
                Part::Text("location_name", "Kibera"),
                Part::File("images", "front.png"),
            ],
        )
        .await;
        assert_eq!(res.body["location_name"], "Kibera");
        assert!(res.body.get("location").is_none());
        assert_eq!(res.body["coordinates"], json!({"lat": -1.3133, "lng": 36.7876}));
        assert_eq!(res.body["is_favorite"], false);
        assert_eq!(res.body["reviews"], json!([]));
        assert_eq!(res.body["images"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn favorited_hub_is_enriched_for_its_fan() {
        let app = TestApp::new();
        let owner = Uuid::now_v7();
        let fan = app.seed_user("Wanjiru").await;
        let id = create(&app, owner, &[Part::Text("title", "Community Garden")])
            .await
            .id();
        create(&app, owner, &[Part::Text("title", "Tool Library")]).await;

        let res = app
            .send(
                Req::new(Method::POST, &format!("{}/reviews", hub_uri(id)))
                    .auth(fan)
                    .json(json!({"rating": 5, "comment": "lovely"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        let res = app
            .send(
                Req::new(Method::POST, &format!("{}/favorite", hub_uri(id)))
                    .auth(fan)
                    .empty(),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED);

        let list = app.send(Req::get("/api/v1/hubs").auth(fan).empty()).await;
        assert_eq!(list.status, StatusCode::OK);
        assert_eq!(list.body.as_array().unwrap().len(), 2);

        let res = app.send(Req::get(&hub_uri(id)).auth(fan).empty()).await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["is_favorite"], true);
        let reviews = res.body["reviews"].as_array().unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0]["user_name"], "Wanjiru");
        assert_eq!(reviews[0]["rating"], 5);

        let anonymous = app.send(Req::get(&hub_uri(id)).empty()).await;
        assert_eq!(anonymous.status, StatusCode::OK);
        assert_eq!(anonymous.body["is_favorite"], false);
        assert_eq!(anonymous.body["reviews"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_filters_and_short_circuits_before_enrichment() {
        let app = TestApp::new();
        let owner = Uuid::now_v7();
        create(&app, owner, &[Part::Text("title", "Harvest Hall")]).await;
        create(&app, Uuid::now_v7(), &[Part::Text("title", "harvest yard")]).await;

        let res = app.send(Req::get("/api/v1/hubs?q=HARVEST").empty()).await;
        assert_eq!(res.body.as_array().unwrap().len(), 2);

        let res = app
            .send(Req::get(&format!("/api/v1/hubs?owner={}", owner)).empty())
            .await;
        assert_eq!(res.body.as_array().unwrap().len(), 1);
        let etag = res.header("etag").unwrap().to_owned();

        let res = app
            .send(
                Req::get(&format!("/api/v1/hubs?owner={}", owner))
                    .header("if-none-match", &etag)
                    .empty(),
            )
            .await;
        assert_eq!(res.status, StatusCode::NOT_MODIFIED);

        let res = app.send(Req::get("/api/v1/hubs?owner=nobody").empty()).await;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_merges_single_axis_and_appends_images() {
        let app = TestApp::new();
        let owner = Uuid::now_v7();
        let created = create(
            &app,
            owner,
            &[
                Part::Text("title", "Hub"),
                Part::Text("lat", "1.5"),
                Part::Text("lng", "2.5"),
                Part::File("images", "a.png"),
                Part::File("images", "b.png"),
            ],
        )
        .await;
        let id = created.id();
        let b = created.body["images"][1].as_str().unwrap().to_owned();

        let res = app
            .send(
                Req::new(Method::PATCH, &hub_uri(id)).auth(owner).multipart(&[
                    Part::Text("lat", "9.25"),
                    Part::Text("location_name", "Riverside"),
                    Part::Text("images", &b),
                    Part::File("new_images", "c.png"),
                ]),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);
        assert_eq!(res.body["message"], "hub updated successfully");
        let hub = &res.body["hub"];
        assert_eq!(hub["coordinates"], json!({"lat": 9.25, "lng": 2.5}));
        assert_eq!(hub["location_name"], "Riverside");
        assert_eq!(hub["images"], json!([b, app.assets.uploaded()[2]]));
    }

    #[tokio::test]
    async fn only_owner_or_admin_may_modify() {
        let app = TestApp::new();
        let owner = Uuid::now_v7();
        let id = create(&app, owner, &[Part::Text("title", "Hub")]).await.id();

        let res = app
            .send(
                Req::new(Method::PATCH, &hub_uri(id))
                    .auth(Uuid::now_v7())
                    .multipart(&[Part::Text("rating", "not-a-number")]),
            )
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);

        let res = app
            .send(
                Req::new(Method::PATCH, &hub_uri(id))
                    .auth(Uuid::now_v7())
                    .json(json!({"title": "mine"})),
            )
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);
        assert_eq!(res.body, json!({"error": "access denied"}));

        let res = app
            .send(
                Req::new(Method::DELETE, &hub_uri(id))
                    .auth(Uuid::now_v7())
                    .empty(),
            )
            .await;
        assert_eq!(res.status, StatusCode::FORBIDDEN);

        let res = app
            .send(Req::new(Method::DELETE, &hub_uri(id)).admin(Uuid::now_v7()).empty())
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }

    #[tokio::test]
    async fn update_of_missing_hub_is_not_found() {
        let app = TestApp::new();
        let res = app
            .send(
                Req::new(Method::PATCH, &hub_uri(Uuid::now_v7()))
                    .auth(Uuid::now_v7())
                    .multipart(&[Part::Text("title", "x")]),
            )
            .await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(res.body, json!({"error": "hub not found"}));
    }

    #[tokio::test]
    async fn delete_with_two_images_succeeds_despite_failing_cleanup() {
        let app = TestApp::with_assets(FakeAssets::failing_deletes());
        let owner = Uuid::now_v7();
        let id = create(
            &app,
            owner,
            &[
                Part::Text("title", "Hub"),
                Part::File("images", "a.png"),
                Part::File("images", "b.png"),
            ],
        )
        .await
        .id();

        let res = app
            .send(Req::new(Method::DELETE, &hub_uri(id)).auth(owner).empty())
            .await;
        assert_eq!(res.status, StatusCode::OK);
        assert_eq!(res.body["message"], "hub deleted successfully");

        let deleted = app.assets.wait_for_deletes(2).await;
        assert_eq!(deleted.len(), 2);
        assert!(deleted.iter().all(|id| id.starts_with("hubs/")));

        let res = app.send(Req::get(&hub_uri(id)).empty()).await;
        assert_eq!(res.status, StatusCode::NOT_FOUND);
    }
}
