//! Service catalog seeding from config.toml.
//!
//! The `[[services]]` entries in config.toml seed the catalog on startup.
//! Seeding is additive: entries are matched by `provider_service_id`, and
//! services already in the database are left untouched so admin edits (rate
//! changes, pausing) survive restarts.

use crate::core::service::{self, NewService};
use crate::entities::{Service, service as service_entity};
use crate::errors::{Error, Result};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Deserialize;
use std::path::Path;

/// Configuration structure for the `[[services]]` tables in config.toml.
#[derive(Debug, Deserialize)]
pub struct CatalogConfig {
    /// List of service seed entries
    #[serde(default)]
    pub services: Vec<ServiceSeed>,
}

/// One seed entry for the service catalog.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceSeed {
    /// Display title
    pub title: String,
    /// Category for grouping (e.g., "Instagram")
    pub category: String,
    /// Longer description shown to users
    #[serde(default)]
    pub description: String,
    /// Price per 1000 units
    pub rate: f64,
    /// Minimum order quantity
    pub min: i64,
    /// Maximum order quantity
    pub max: i64,
    /// The service id at the upstream provider
    pub provider_service_id: String,
}

/// Loads the catalog seed from a TOML file.
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_catalog<P: AsRef<Path>>(path: P) -> Result<CatalogConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Inserts seed entries that are not yet in the database. Returns how many
/// services were created.
pub async fn sync_catalog(db: &DatabaseConnection, seeds: &[ServiceSeed]) -> Result<usize> {
    let mut created = 0;

    for seed in seeds {
        let existing = Service::find()
            .filter(service_entity::Column::ProviderServiceId.eq(&seed.provider_service_id))
            .one(db)
            .await?;

        if existing.is_some() {
            continue;
        }

        service::create_service(
            db,
            NewService {
                title: seed.title.clone(),
                category: seed.category.clone(),
                description: seed.description.clone(),
                rate: seed.rate,
                min: seed.min,
                max: seed.max,
                provider_service_id: seed.provider_service_id.clone(),
            },
        )
        .await?;

        tracing::info!(title = %seed.title, "Seeded catalog service");
        created += 1;
    }

    Ok(created)
}
