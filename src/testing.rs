//! Fixtures shared by the in-module tests: a recording asset host, an
//! in-memory state and request helpers that drive the full router.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    async_trait,
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use bytes::Bytes;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    app::build_app,
    auth::{jwt, TokenKind},
    config::{AppConfig, JwtConfig, S3Config, StoreBackend},
    repository::StoreTimeouts,
    state::AppState,
    storage::{delivery_url, ext_from_mime, AssetError, AssetStore},
    store::MemoryDocumentStore,
    users::User,
};

#[derive(Default)]
struct FakeInner {
    uploaded: Vec<String>,
    deleted: Vec<String>,
    fail_after: Option<usize>,
    fail_deletes: bool,
}

/// Asset host double that records every call.
#[derive(Clone, Default)]
pub struct FakeAssets {
    inner: Arc<Mutex<FakeInner>>,
}

impl FakeAssets {
    /// Succeeds `n` times, then every upload fails.
    pub fn failing_after(n: usize) -> Self {
        let fake = Self::default();
        fake.inner.lock().unwrap().fail_after = Some(n);
        fake
    }

    pub fn failing_deletes() -> Self {
        let fake = Self::default();
        fake.inner.lock().unwrap().fail_deletes = true;
        fake
    }

    pub fn uploaded(&self) -> Vec<String> {
        self.inner.lock().unwrap().uploaded.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.inner.lock().unwrap().deleted.clone()
    }

    /// Polls until `n` deletes were attempted; cleanup runs on a spawned task.
    pub async fn wait_for_deletes(&self, n: usize) -> Vec<String> {
        for _ in 0..100 {
            let deleted = self.deleted();
            if deleted.len() >= n {
                return deleted;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.deleted()
    }
}

#[async_trait]
impl AssetStore for FakeAssets {
    async fn upload(&self, folder: &str, _body: Bytes, content_type: &str) -> Result<String, AssetError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_after.is_some_and(|n| inner.uploaded.len() >= n) {
            return Err(AssetError::Upload("fake upload failure".into()));
        }
        let public_id = format!("{}/{}", folder, Uuid::now_v7());
        let url = delivery_url(
            "https://assets.test/fundhub",
            1_700_000_000,
            &public_id,
            ext_from_mime(content_type).unwrap_or("bin"),
        );
        inner.uploaded.push(url.clone());
        Ok(url)
    }

    async fn delete(&self, public_id: &str) -> Result<(), AssetError> {
        let mut inner = self.inner.lock().unwrap();
        inner.deleted.push(public_id.to_owned());
        if inner.fail_deletes {
            return Err(AssetError::Delete("fake delete failure".into()));
        }
        Ok(())
    }
}

pub fn test_jwt() -> JwtConfig {
    JwtConfig {
        secret: "test-secret".into(),
        issuer: "fundhub".into(),
        audience: "fundhub-users".into(),
    }
}

pub fn test_config() -> AppConfig {
    AppConfig {
        store_backend: StoreBackend::Memory,
        database_url: None,
        jwt: test_jwt(),
        s3: S3Config {
            endpoint: "http://localhost:9000".into(),
            bucket: "fake".into(),
            access_key: "fake".into(),
            secret_key: "fake".into(),
            region: "us-east-1".into(),
            public_url: "https://assets.test/fundhub".into(),
        },
        store_timeouts: StoreTimeouts::default(),
        asset_upload_timeout: Duration::from_secs(5),
        asset_delete_timeout: Duration::from_secs(5),
    }
}

pub fn test_state(assets: FakeAssets) -> AppState {
    AppState::from_parts(
        Arc::new(test_config()),
        Arc::new(MemoryDocumentStore::new()),
        Arc::new(assets),
    )
}

/// Router plus the state behind it, for seeding and inspection.
pub struct TestApp {
    pub state: AppState,
    pub assets: FakeAssets,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_assets(FakeAssets::default())
    }

    pub fn with_assets(assets: FakeAssets) -> Self {
        let state = test_state(assets.clone());
        Self {
            router: build_app(state.clone()),
            state,
            assets,
        }
    }

    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let headers = res.headers().clone();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn seed_user(&self, name: &str) -> Uuid {
        let user = User {
            id: Uuid::now_v7(),
            name: name.into(),
            email: None,
        };
        self.state.repo::<User>().insert(&user).await.unwrap()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn id(&self) -> Uuid {
        self.body["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("response carries an id")
    }
}

pub fn bearer(user_id: Uuid, role: &str) -> String {
    format!(
        "Bearer {}",
        jwt::sign(&test_jwt(), user_id, role, TokenKind::Access)
    )
}

/// Builder for requests against the router.
pub struct Req {
    builder: axum::http::request::Builder,
}

impl Req {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            builder: Request::builder().method(method).uri(uri),
        }
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn auth(mut self, user_id: Uuid) -> Self {
        self.builder = self.builder.header(header::AUTHORIZATION, bearer(user_id, "member"));
        self
    }

    pub fn admin(mut self, user_id: Uuid) -> Self {
        self.builder = self.builder.header(header::AUTHORIZATION, bearer(user_id, "admin"));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn empty(self) -> Request<Body> {
        self.builder.body(Body::empty()).unwrap()
    }

    pub fn json(self, body: Value) -> Request<Body> {
        self.builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    pub fn multipart(self, parts: &[Part<'_>]) -> Request<Body> {
        const BOUNDARY: &str = "fundhub-test-boundary";
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, file_name) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                            name, file_name
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(b"\x89PNG fake image bytes");
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.builder
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str),
}
