//! Service entity - Catalog items offered to users.
//!
//! Each service maps to one service on the upstream provider via
//! `provider_service_id`. The `rate` is the price per 1000 units; order
//! quantity must fall within `min..=max` at creation time.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Service database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "services")]
pub struct Model {
    /// Unique identifier for the service
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable title (e.g., "Instagram Followers")
    pub title: String,
    /// Category for grouping (e.g., "instagram", "youtube")
    pub category: String,
    /// Optional longer description
    pub description: String,
    /// Price per 1000 units, never negative
    pub rate: f64,
    /// Minimum order quantity, at least 1
    pub min: i64,
    /// Maximum order quantity, `min <= max`
    pub max: i64,
    /// Service identifier on the upstream provider
    pub provider_service_id: String,
    /// Whether this service can currently be ordered
    pub is_active: bool,
    /// When the service was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Service and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One service has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
