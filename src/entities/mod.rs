//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod order;
pub mod service;
pub mod user;
pub mod wallet_transaction;

// Re-export specific types to avoid conflicts
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use service::{Column as ServiceColumn, Entity as Service, Model as ServiceModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use wallet_transaction::{
    Column as WalletTransactionColumn, Entity as WalletTransaction, Model as WalletTransactionModel,
};
