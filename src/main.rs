use dotenvy::dotenv;
use smm_panel::{
    config::{app::AppConfig, database, services},
    errors::Result,
    provider::HttpProvider,
    scheduler::Scheduler,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; non-fatal, env vars can be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = AppConfig::load_default()
        .inspect_err(|e| error!("Failed to load configuration: {e}"))?;
    let api_key = AppConfig::provider_api_key()?;
    info!("Configuration loaded");

    // 4. Initialize the database
    let database_url = database::get_database_url();
    let db = database::create_connection(&database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {e}"))?;
    database::create_tables(&db).await?;
    info!("Database initialized");

    // 5. Seed the service catalog from config.toml
    let catalog = services::load_catalog("config.toml")?;
    let created = services::sync_catalog(&db, &catalog.services).await?;
    if created > 0 {
        info!(created, "Service catalog seeded");
    }

    // 6. Run the reconciliation scheduler until Ctrl-C
    let provider = HttpProvider::new(app_config.provider.api_url.clone(), api_key)?;
    let scheduler = Scheduler::new(
        db,
        Arc::new(provider),
        app_config.status_map()?,
        app_config.scheduler_config(),
    );
    let shutdown = scheduler.shutdown_token();
    let handle = tokio::spawn(scheduler.run());

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping scheduler");
    shutdown.cancel();

    if let Err(e) = handle.await {
        error!("Scheduler task failed: {e}");
    }

    Ok(())
}
