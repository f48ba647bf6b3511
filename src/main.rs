//! Service entry point: configuration, database setup, roster seeding, and the
//! HTTP listener.

use dotenvy::dotenv;
use drivedesk::{api, config, errors::Result};
use std::env;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Connect and prepare the database
    let db = config::database::create_connection()
        .await
        .inspect(|_| info!("Database connection established."))
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db).await?;
    config::database::create_indexes(&db).await?;
    info!("Database schema ready.");

    // 4. Seed the roster if a config file is present
    let config_path = env::var("SCHOOL_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    if std::path::Path::new(&config_path).exists() {
        let roster = config::school::load_config(&config_path)
            .inspect_err(|e| error!("Failed to load {}: {}", config_path, e))?;
        config::school::seed_roster(&db, &roster).await?;
    } else {
        warn!(path = %config_path, "No roster config found, starting with an empty roster.");
    }

    // 5. Serve the API
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    api::serve(&bind_addr, db).await
}
