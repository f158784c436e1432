//! Database connection and table creation.
//!
//! The schema is generated from the entity definitions with
//! `Schema::create_table_from_entity`, so the `SQLite` tables always match
//! the Rust struct definitions without hand-written SQL.

use crate::entities::{Order, Service, User, WalletTransaction};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Default `SQLite` path used when no `DATABASE_URL` is configured.
const DEFAULT_DATABASE_URL: &str = "sqlite://data/smm_panel.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, with
/// a local `SQLite` file as the fallback.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes the database connection.
pub async fn create_connection(database_url: &str) -> Result<DatabaseConnection> {
    Database::connect(database_url).await.map_err(Into::into)
}

/// Creates all tables from the entity definitions. Idempotent: existing
/// tables are left alone.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut user_table = schema.create_table_from_entity(User);
    let mut service_table = schema.create_table_from_entity(Service);
    let mut order_table = schema.create_table_from_entity(Order);
    let mut transaction_table = schema.create_table_from_entity(WalletTransaction);

    db.execute(builder.build(user_table.if_not_exists())).await?;
    db.execute(builder.build(service_table.if_not_exists())).await?;
    db.execute(builder.build(order_table.if_not_exists())).await?;
    db.execute(builder.build(transaction_table.if_not_exists()))
        .await?;

    Ok(())
}
