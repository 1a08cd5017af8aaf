use anyhow::Context;
use tracing::{Level, info, warn};

use homeserver::config::AppConfig;
use homeserver::state::AppState;
use homeserver::{build_router, database, seed};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load config")?;

    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();
    if config.auth.jwt_secret.len() < 32 {
        warn!("auth.jwt_secret is shorter than 32 bytes");
    }

    let db = database::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    seed::ensure_indexes(&db)
        .await
        .context("Failed to ensure indexes")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, db)
        .await
        .context("Failed to initialize application state")?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Homeserver listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
