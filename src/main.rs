use std::sync::Arc;

use cardtrooper_api::{config, is_production, server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cardtrooper_api=info,tower_http=info")),
        )
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    config.validate()?;
    tracing::info!(
        "Starting Cardtrooper API in {:?} mode ({:?} storage)",
        config.environment,
        config.storage.backend
    );
    if is_production!() && !config.database.run_migrations {
        tracing::info!("Migrations disabled; apply them before deploying");
    }

    server::serve(Arc::new(config.clone())).await
}
