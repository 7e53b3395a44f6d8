pub mod handlers;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub use repo_types::{Review, ReviewView};

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::read_routes())
        .merge(handlers::write_routes())
}
