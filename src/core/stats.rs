//! Aggregate reporting over orders and wallets.
//!
//! Read-only snapshots for admin dashboards. All aggregation happens in SQL;
//! nothing here pages full tables through memory.

use crate::{
    core::status::OrderStatus,
    entities::{Order, User, order, user},
    errors::Result,
};
use sea_orm::{FromQueryResult, QuerySelect, prelude::*};
use std::collections::HashMap;

/// Count and spend total for one order status.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatusBucket {
    pub count: i64,
    pub amount: f64,
}

/// Snapshot of the order book, grouped by status.
#[derive(Debug, Clone, Default)]
pub struct OrderStats {
    pub total_orders: i64,
    pub total_amount: f64,
    pub by_status: HashMap<OrderStatus, StatusBucket>,
}

/// Snapshot of the user base and outstanding wallet liability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    /// Sum of all wallet balances - the money owed to users
    pub total_balance: f64,
}

#[derive(FromQueryResult)]
struct StatusRow {
    status: String,
    count: i64,
    amount: Option<f64>,
}

/// Order counts and amounts, per status and overall.
pub async fn order_stats(db: &DatabaseConnection) -> Result<OrderStats> {
    let rows: Vec<StatusRow> = Order::find()
        .select_only()
        .column(order::Column::Status)
        .column_as(order::Column::Id.count(), "count")
        .column_as(order::Column::Amount.sum(), "amount")
        .group_by(order::Column::Status)
        .into_model()
        .all(db)
        .await?;

    let mut stats = OrderStats::default();
    for row in rows {
        let bucket = StatusBucket {
            count: row.count,
            amount: row.amount.unwrap_or(0.0),
        };
        stats.total_orders += bucket.count;
        stats.total_amount += bucket.amount;
        // Rows with a status outside our vocabulary still count in the
        // totals, they just get no bucket of their own.
        if let Some(status) = OrderStatus::parse(&row.status) {
            stats.by_status.insert(status, bucket);
        }
    }

    Ok(stats)
}

/// User counts and the summed wallet liability.
pub async fn user_stats(db: &DatabaseConnection) -> Result<UserStats> {
    let total_users = User::find().count(db).await? as i64;
    let active_users = User::find()
        .filter(user::Column::IsActive.eq(true))
        .count(db)
        .await? as i64;

    // SUM over an empty table is NULL, hence the nested Option
    let total_balance = User::find()
        .select_only()
        .column_as(user::Column::WalletBalance.sum(), "balance")
        .into_tuple::<Option<f64>>()
        .one(db)
        .await?
        .flatten();

    Ok(UserStats {
        total_users,
        active_users,
        total_balance: total_balance.unwrap_or(0.0),
    })
}
