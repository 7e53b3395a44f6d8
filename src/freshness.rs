//! Conditional-GET support: ETag fingerprints and Last-Modified dates derived
//! from the freshest item of a result set.

use axum::{
    http::{
        header::{ETAG, IF_MATCH, IF_NONE_MATCH, LAST_MODIFIED},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sha2::{Digest, Sha256};
use time::{format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    store::Filter,
};

/// Anything carrying an identity and a modification time.
pub trait Versioned {
    fn id(&self) -> Uuid;
    fn updated_at(&self) -> OffsetDateTime;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Freshness {
    pub etag: String,
    pub last_modified: Option<String>,
}

pub enum Evaluation {
    NotModified,
    Modified(Option<Freshness>),
}

/// Quoted hex SHA-256 of `id || updated_at`.
pub fn fingerprint(id: Uuid, updated_at: OffsetDateTime) -> String {
    let digest = Sha256::digest(format!("{}{}", id, updated_at.unix_timestamp_nanos()).as_bytes());
    format!("\"{:x}\"", digest)
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(ts: OffsetDateTime) -> Option<String> {
    ts.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        ))
        .ok()
}

pub fn freshest<T: Versioned>(items: &[T]) -> Option<&T> {
    items.iter().max_by_key(|item| item.updated_at())
}

impl Freshness {
    pub fn of<T: Versioned>(items: &[T]) -> Option<Self> {
        let latest = freshest(items)?;
        Some(Self {
            etag: fingerprint(latest.id(), latest.updated_at()),
            last_modified: http_date(latest.updated_at()),
        })
    }

    pub fn matches(&self, request: &HeaderMap) -> bool {
        request
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == self.etag)
    }

    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Ok(v) = HeaderValue::from_str(&self.etag) {
            headers.insert(ETAG, v);
        }
        if let Some(v) = self
            .last_modified
            .as_deref()
            .and_then(|d| HeaderValue::from_str(d).ok())
        {
            headers.insert(LAST_MODIFIED, v);
        }
    }
}

/// Decides between 304 and a full response. Empty sets never short-circuit.
pub fn evaluate<T: Versioned>(request: &HeaderMap, items: &[T]) -> Evaluation {
    match Freshness::of(items) {
        Some(f) if f.matches(request) => Evaluation::NotModified,
        other => Evaluation::Modified(other),
    }
}

pub fn not_modified() -> Response {
    StatusCode::NOT_MODIFIED.into_response()
}

pub fn respond<B: Serialize>(freshness: Option<Freshness>, body: B) -> Response {
    let mut response = Json(body).into_response();
    if let Some(f) = freshness {
        f.apply(response.headers_mut());
    }
    response
}

/// Optimistic-concurrency guard for writes. Without `If-Match` the write is
/// unguarded; with a stale fingerprint it is refused up front, otherwise the
/// returned filter pins the stored `updated_at`.
pub fn precondition<T: Versioned>(request: &HeaderMap, current: &T) -> AppResult<Option<Filter>> {
    let Some(expected) = request.get(IF_MATCH) else {
        return Ok(None);
    };
    if expected.to_str().ok() != Some(fingerprint(current.id(), current.updated_at()).as_str()) {
        return Err(AppError::PreconditionFailed);
    }
    let stamp = current
        .updated_at()
        .format(&Rfc3339)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Some(Filter::new().eq("updated_at", stamp)))
}
