//! Service catalog management.
//!
//! Services are the sellable units: each maps to one service id at the
//! upstream provider and carries the local rate (price per 1000 units) and
//! quantity bounds used by order validation.

use crate::{
    entities::{Service, service},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Fields for a new catalog entry.
#[derive(Debug, Clone)]
pub struct NewService {
    pub title: String,
    pub category: String,
    pub description: String,
    /// Price per 1000 units
    pub rate: f64,
    pub min: i64,
    pub max: i64,
    /// The service id at the upstream provider
    pub provider_service_id: String,
}

/// Partial update for an existing catalog entry. `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct ServiceUpdate {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub rate: Option<f64>,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub provider_service_id: Option<String>,
    pub is_active: Option<bool>,
}

fn validate_pricing(rate: f64, min: i64, max: i64) -> Result<()> {
    if rate < 0.0 || !rate.is_finite() {
        return Err(Error::Validation {
            message: format!("Service rate must be a non-negative number, got {rate}"),
        });
    }
    if min < 1 || max < min {
        return Err(Error::Validation {
            message: format!("Service quantity bounds must satisfy 1 <= min <= max, got {min}..{max}"),
        });
    }
    Ok(())
}

/// Creates a catalog entry, active by default.
pub async fn create_service(
    db: &DatabaseConnection,
    new: NewService,
) -> Result<service::Model> {
    validate_pricing(new.rate, new.min, new.max)?;

    let entry = service::ActiveModel {
        title: Set(new.title),
        category: Set(new.category),
        description: Set(new.description),
        rate: Set(new.rate),
        min: Set(new.min),
        max: Set(new.max),
        provider_service_id: Set(new.provider_service_id),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(entry.insert(db).await?)
}

/// Applies a partial update. Pricing invariants are re-validated against the
/// merged result, so an update cannot sneak in `min > max` one field at a
/// time.
pub async fn update_service(
    db: &DatabaseConnection,
    service_id: i64,
    update: ServiceUpdate,
) -> Result<service::Model> {
    let current = get_service(db, service_id).await?;

    let rate = update.rate.unwrap_or(current.rate);
    let min = update.min.unwrap_or(current.min);
    let max = update.max.unwrap_or(current.max);
    validate_pricing(rate, min, max)?;

    let mut active: service::ActiveModel = current.into();
    if let Some(title) = update.title {
        active.title = Set(title);
    }
    if let Some(category) = update.category {
        active.category = Set(category);
    }
    if let Some(description) = update.description {
        active.description = Set(description);
    }
    if let Some(provider_service_id) = update.provider_service_id {
        active.provider_service_id = Set(provider_service_id);
    }
    if let Some(is_active) = update.is_active {
        active.is_active = Set(is_active);
    }
    active.rate = Set(rate);
    active.min = Set(min);
    active.max = Set(max);

    Ok(active.update(db).await?)
}

/// Finds a service by id.
pub async fn get_service(db: &DatabaseConnection, service_id: i64) -> Result<service::Model> {
    Service::find_by_id(service_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ServiceNotFound {
            id: service_id.to_string(),
        })
}

/// All services orderable right now, grouped by category then title.
pub async fn list_active_services(db: &DatabaseConnection) -> Result<Vec<service::Model>> {
    Service::find()
        .filter(service::Column::IsActive.eq(true))
        .order_by_asc(service::Column::Category)
        .order_by_asc(service::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// The full catalog, inactive entries included. Admin view.
pub async fn list_all_services(db: &DatabaseConnection) -> Result<Vec<service::Model>> {
    Service::find()
        .order_by_asc(service::Column::Category)
        .order_by_asc(service::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Pauses or resumes a service. Existing orders are unaffected; only new
/// order creation checks this flag.
pub async fn set_service_active(
    db: &DatabaseConnection,
    service_id: i64,
    is_active: bool,
) -> Result<service::Model> {
    let mut active: service::ActiveModel = get_service(db, service_id).await?.into();
    active.is_active = Set(is_active);
    Ok(active.update(db).await?)
}
