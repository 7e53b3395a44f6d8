mod app;
mod auth;
mod config;
mod contributions;
mod error;
mod events;
mod favorites;
mod form;
mod freshness;
mod hubs;
mod images;
mod merge;
mod repository;
mod responses;
mod reviews;
mod state;
mod storage;
mod store;
#[cfg(test)]
mod testing;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "fundhub=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = state::AppState::init().await?;

    app::serve(app::build_app(state)).await
}
