//! FixItNow ticket engine — process entry point.
//!
//! Connects to SurrealDB, brings the schema up to date and builds the
//! ticket service. Route handlers are mounted on top of the service by
//! the web layer.

use fixit_core::error::FixItResult;
use fixit_core::repository::ImageStore;
use fixit_db::repository::{SurrealTicketRepository, SurrealUserDirectory};
use fixit_db::{DbConfig, DbManager};
use fixit_tickets::{TicketConfig, TicketService};
use tracing_subscriber::EnvFilter;

/// Image store used when no storage backend is configured: deletion is
/// logged and otherwise skipped.
struct UnconfiguredImageStore;

impl ImageStore for UnconfiguredImageStore {
    async fn delete_images(&self, public_ids: &[String]) -> FixItResult<()> {
        tracing::warn!(
            images = public_ids.len(),
            "No image storage configured, leaving stored images in place"
        );
        Ok(())
    }
}

fn ticket_config_from_env() -> TicketConfig {
    let mut config = TicketConfig::default();
    if let Some(retries) = std::env::var("FIXIT_MAX_CONFLICT_RETRIES")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.max_conflict_retries = retries;
    }
    if let Some(scoped) = std::env::var("FIXIT_SCOPE_ADMINS")
        .ok()
        .and_then(|v| v.parse().ok())
    {
        config.scope_admins_to_building = scoped;
    }
    config
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("fixit=info".parse()?))
        .json()
        .init();

    tracing::info!("Starting FixItNow ticket engine...");

    let db_config = DbConfig::from_env();
    let db = DbManager::connect(&db_config).await?;
    fixit_db::run_migrations(db.client()).await?;

    let ticket_config = ticket_config_from_env();
    tracing::info!(
        max_conflict_retries = ticket_config.max_conflict_retries,
        scope_admins_to_building = ticket_config.scope_admins_to_building,
        schema_version = fixit_db::latest_version(),
        "Ticket service ready"
    );
    let _service = TicketService::new(
        SurrealTicketRepository::new(db.client().clone()),
        SurrealUserDirectory::new(db.client().clone()),
        UnconfiguredImageStore,
        ticket_config,
    );

    tokio::signal::ctrl_c().await?;

    tracing::info!("FixItNow ticket engine stopped.");
    Ok(())
}
