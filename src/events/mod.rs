mod dto;
pub mod handlers;
pub mod repo_types;
mod services;

use crate::state::AppState;
use axum::Router;

pub use repo_types::Event;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
