//! Order entity - A purchase of some quantity of a service.
//!
//! Orders are created `"pending"` with funds already debited, move to
//! `"processing"` once the provider accepts them, and are then driven only by
//! polled provider status. `amount` is fixed at creation and is not
//! recomputed if the service rate later changes.
//!
//! `refunded_remains` is the idempotency watermark for partial refunds:
//! reconciliation only credits the delta `remains - refunded_remains`, so a
//! repeated poll reporting the same `remains` credits nothing.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the user who placed the order
    pub user_id: i64,
    /// ID of the ordered service
    pub service_id: i64,
    /// Target link the units are delivered to
    pub link: String,
    /// Ordered quantity, within the service's min/max at creation time
    pub quantity: i64,
    /// Amount charged: `service.rate / 1000 * quantity`, fixed at creation
    pub amount: f64,
    /// Lifecycle status, one of [`crate::core::status::OrderStatus`]
    pub status: String,
    /// Order identifier on the upstream provider, None until accepted
    pub provider_order_id: Option<String>,
    /// Follower/view count at the time the provider started delivery
    pub start_count: i64,
    /// Units the provider reports as undelivered
    pub remains: i64,
    /// Portion of `remains` already refunded to the wallet
    pub refunded_remains: i64,
    /// When the order was created
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each order belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each order is for one service
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceId",
        to = "super::service::Column::Id"
    )]
    Service,
    /// One order has many wallet transactions (one debit, zero or more refunds)
    #[sea_orm(has_many = "super::wallet_transaction::Entity")]
    WalletTransactions,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl Related<super::wallet_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalletTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
