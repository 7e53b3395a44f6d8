use axum::{
    http::{header::LOCATION, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub message: String,
    pub id: Uuid,
}

impl Deleted {
    pub fn new(noun: &str, id: Uuid) -> Json<Self> {
        Json(Self {
            message: format!("{} deleted successfully", noun),
            id,
        })
    }
}

/// `201 Created` with a `Location` header pointing at the new resource.
pub fn created<B: Serialize>(location: String, body: B) -> Response {
    (StatusCode::CREATED, [(LOCATION, location)], Json(body)).into_response()
}
