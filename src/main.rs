//! Biblion - Library Circulation Engine
//!
//! Binary entry point: connects to Postgres, applies migrations, and runs
//! the reservation expiry sweep on a fixed interval. Request-serving lives
//! in the surrounding application, which embeds the library crate.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use biblion::{config::AppConfig, repository::PgCirculationStore, services::CirculationService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("biblion={}", config.logging.level).into());

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Biblion v{}", env!("CARGO_PKG_VERSION"));

    // Create database connection pool
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect(&config.database.url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    tracing::info!("Database migrations completed");

    let service = CirculationService::new(Arc::new(PgCirculationStore::new(pool)));

    let mut ticker = tokio::time::interval(Duration::from_secs(
        config.circulation.sweep_interval_secs,
    ));

    loop {
        ticker.tick().await;
        if let Err(e) = service.expire_reservations().await {
            tracing::error!("Expiry sweep failed: {}", e);
        }
    }
}
