//! User entity - Represents panel accounts and their wallet balance.
//!
//! The `wallet_balance` field is a derived cache of the account's ledger: it
//! must always equal the sum of signed amounts over that account's completed
//! wallet transactions. It is mutated only by the ledger operations in
//! [`crate::core::wallet`], never written directly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address (unique login identity)
    pub email: String,
    /// Role: `"user"` or `"admin"`
    pub role: String,
    /// Current wallet balance - derived cache of the ledger, never negative
    pub wallet_balance: f64,
    /// Whether the account is active
    pub is_active: bool,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many orders
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
    /// One user has many wallet transactions
    #[sea_orm(has_many = "super::wallet_transaction::Entity")]
    WalletTransactions,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl Related<super::wallet_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalletTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
