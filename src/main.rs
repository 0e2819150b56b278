mod app;
mod auth;
mod categories;
mod config;
mod db;
mod error;
mod extract;
mod favorites;
mod images;
#[cfg(test)]
mod memory;
mod posts;
mod state;
mod storage;
mod validate;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "marketplace=debug,axum=info,tower_http=info".to_string());
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

    // Missing JWT_SECRET or DATABASE_URL stops the process here.
    let config = config::AppConfig::from_env()?;
    let db = db::Db::open(&config).await?;

    if let Err(e) = db.migrate().await {
        tracing::warn!(error = %e, "migration failed; continuing");
    }

    let state = state::AppState::init(&config, db.clone()).await?;
    let result = app::serve(app::build_app(state)).await;

    db.close().await;
    result
}

