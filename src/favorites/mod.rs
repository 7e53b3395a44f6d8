pub mod handlers;
pub mod repo_types;

use crate::state::AppState;
use axum::Router;

pub use repo_types::Favorite;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
