use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::{storage::AssetError, store::StoreError};

/// Body of every error response: `{"error": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed identifier, missing required field, unparseable value.
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but neither the owner nor an admin.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("no fields to update")]
    NoFieldsToUpdate,

    /// `If-Match` fingerprint is stale, or the guarded write lost a race.
    #[error("resource has been modified since it was fetched")]
    PreconditionFailed,

    #[error("storage unavailable")]
    StoreUnavailable(#[from] StoreError),

    #[error("image upload failed")]
    UploadFailed(#[source] AssetError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) | Self::NoFieldsToUpdate => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::PreconditionFailed => StatusCode::PRECONDITION_FAILED,
            Self::StoreUnavailable(_) | Self::UploadFailed(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::StoreUnavailable(e) => error!(error = %e, "store failure"),
            Self::UploadFailed(e) => error!(error = %e, "asset upload failure"),
            Self::Internal(msg) => error!(error = %msg, "internal failure"),
            _ => {}
        }
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::InvalidInput(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(_: MultipartError) -> Self {
        Self::InvalidInput("invalid form data".into())
    }
}
