//! Wallet transaction entity - The append-only ledger of balance changes.
//!
//! Entries are immutable once `"completed"`. For any user, replaying all
//! completed entries in creation order and summing signed amounts reproduces
//! `wallet_balance` exactly, and each entry's `balance_after` equals the
//! running sum through that entry.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Wallet transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ID of the user whose wallet changed
    pub user_id: i64,
    /// `"credit"` or `"debit"`
    pub tx_type: String,
    /// Transaction amount, always positive; `tx_type` carries the sign
    pub amount: f64,
    /// Human-readable description of the transaction
    pub description: String,
    /// Wallet balance snapshot after this entry was applied
    pub balance_after: f64,
    /// External payment reference for `"external"` entries
    pub payment_id: Option<String>,
    /// `"external"`, `"manual"`, `"order"`, or `"refund"`
    pub payment_method: String,
    /// `"pending"`, `"completed"`, or `"failed"`
    pub status: String,
    /// Related order for `"order"` debits and `"refund"` credits
    pub order_id: Option<i64>,
    /// When the entry was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between WalletTransaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Order-related transactions reference their order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
