//! Ledger store - single source of truth for money movement.
//!
//! Every wallet balance mutation appends a transaction entry in the same
//! atomic unit; no code path changes `wallet_balance` without a matching
//! ledger entry. Balance updates are single conditional SQL UPDATEs, never
//! read-then-write, so two concurrent debits cannot both pass the balance
//! check against a stale value and jointly overdraw the account.
//!
//! External payments follow a two-phase flow: a `pending` entry is recorded
//! when the payment is initiated (balance untouched), then settled into a
//! `completed` credit or voided to `failed`. Settlement is only legal from
//! the `pending` state; settling twice is a benign no-op.

use crate::{
    core::status::{PaymentMethod, TxStatus, TxType},
    entities::{User, WalletTransaction, user, wallet_transaction},
    errors::{Error, Result},
};
use sea_orm::{
    QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr,
};

/// Outcome of settling or voiding a pending credit.
#[derive(Debug, Clone, PartialEq)]
pub enum SettleOutcome {
    /// The entry was pending and has been applied
    Settled(wallet_transaction::Model),
    /// The entry had already been settled or voided; nothing was changed
    AlreadyProcessed,
}

/// Filter for ledger history queries.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    /// Restrict to one user's entries
    pub user_id: Option<i64>,
    /// Restrict to credits or debits
    pub tx_type: Option<TxType>,
    /// Restrict to a settlement status
    pub status: Option<TxStatus>,
}

/// Credits a user's wallet: appends a completed entry and atomically
/// increments the balance, as one database transaction.
///
/// # Arguments
/// * `db` - Database connection
/// * `user_id` - Account to credit
/// * `amount` - Amount to add, must be positive
/// * `description` - Human-readable description for the ledger
/// * `method` - How the money arrived (manual, refund, ...)
/// * `order_id` - Related order for refund credits
pub async fn credit(
    db: &DatabaseConnection,
    user_id: i64,
    amount: f64,
    description: String,
    method: PaymentMethod,
    order_id: Option<i64>,
) -> Result<wallet_transaction::Model> {
    validate_amount(amount)?;

    let txn = db.begin().await?;
    let entry = apply_credit(&txn, user_id, amount, description, method, order_id).await?;
    txn.commit().await?;

    Ok(entry)
}

/// Debits a user's wallet: conditionally decrements the balance (only if
/// funds suffice) and appends a completed entry, as one database transaction.
///
/// Fails with `InsufficientFunds` when the balance is lower than `amount`.
pub async fn debit(
    db: &DatabaseConnection,
    user_id: i64,
    amount: f64,
    description: String,
    method: PaymentMethod,
    order_id: Option<i64>,
) -> Result<wallet_transaction::Model> {
    validate_amount(amount)?;

    let txn = db.begin().await?;
    let entry = apply_debit(&txn, user_id, amount, description, method, order_id).await?;
    txn.commit().await?;

    Ok(entry)
}

/// Reserves funds for an order: a debit tagged `payment_method = "order"`.
///
/// Generic over the connection so order creation can run the reservation and
/// the order insert inside one transaction - both succeed or both roll back.
pub async fn reserve_for_order<C>(
    db: &C,
    user_id: i64,
    amount: f64,
    description: String,
    order_id: Option<i64>,
) -> Result<wallet_transaction::Model>
where
    C: ConnectionTrait,
{
    validate_amount(amount)?;
    apply_debit(db, user_id, amount, description, PaymentMethod::Order, order_id).await
}

/// Credits money back for an order: a credit tagged `payment_method =
/// "refund"`.
///
/// Generic over the connection so the refund commits atomically with the
/// order status or watermark write that justifies it.
pub async fn apply_refund<C>(
    db: &C,
    user_id: i64,
    amount: f64,
    description: String,
    order_id: Option<i64>,
) -> Result<wallet_transaction::Model>
where
    C: ConnectionTrait,
{
    validate_amount(amount)?;
    apply_credit(db, user_id, amount, description, PaymentMethod::Refund, order_id).await
}

/// Admin manual top-up: a completed credit tagged `"manual"`.
pub async fn admin_add_funds(
    db: &DatabaseConnection,
    user_id: i64,
    amount: f64,
    description: Option<String>,
) -> Result<wallet_transaction::Model> {
    credit(
        db,
        user_id,
        amount,
        description.unwrap_or_else(|| "Manual addition by admin".to_string()),
        PaymentMethod::Manual,
        None,
    )
    .await
}

/// Records a pending external-payment credit without touching the balance.
///
/// The entry is settled by [`settle_pending_credit`] once the payment is
/// confirmed, or voided by [`void_pending_credit`] on failure or timeout.
///
/// # Arguments
/// * `payment_id` - The external payment reference used to settle later
pub async fn pending_credit(
    db: &DatabaseConnection,
    user_id: i64,
    amount: f64,
    payment_id: String,
    description: String,
) -> Result<wallet_transaction::Model> {
    validate_amount(amount)?;

    let current = get_balance(db, user_id).await?;

    let entry = wallet_transaction::ActiveModel {
        user_id: Set(user_id),
        tx_type: Set(TxType::Credit.as_str().to_string()),
        amount: Set(amount),
        description: Set(description),
        // Snapshot of the untouched balance; rewritten on settlement
        balance_after: Set(current),
        payment_id: Set(Some(payment_id)),
        payment_method: Set(PaymentMethod::External.as_str().to_string()),
        status: Set(TxStatus::Pending.as_str().to_string()),
        order_id: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(entry.insert(db).await?)
}

/// Settles a pending credit by its external payment reference: flips the
/// entry to `completed` and credits the balance, exactly once.
///
/// The flip is a conditional UPDATE guarded on `status = 'pending'`, which is
/// the serialization point: a second settle attempt (double webhook, retried
/// verify call) finds zero rows to claim and returns
/// [`SettleOutcome::AlreadyProcessed`] without crediting again.
pub async fn settle_pending_credit(
    db: &DatabaseConnection,
    payment_id: &str,
) -> Result<SettleOutcome> {
    let txn = db.begin().await?;

    let entry = find_by_payment_id(&txn, payment_id).await?;

    // Claim the entry. Zero rows means someone else already settled/voided it.
    let claimed = WalletTransaction::update_many()
        .col_expr(
            wallet_transaction::Column::Status,
            Expr::value(TxStatus::Completed.as_str()),
        )
        .filter(wallet_transaction::Column::Id.eq(entry.id))
        .filter(wallet_transaction::Column::Status.eq(TxStatus::Pending.as_str()))
        .exec(&txn)
        .await?;

    if claimed.rows_affected == 0 {
        txn.commit().await?;
        return Ok(SettleOutcome::AlreadyProcessed);
    }

    let new_balance = adjust_balance(&txn, entry.user_id, entry.amount).await?;

    // Rewrite the snapshot now that the credit has actually landed
    let mut active: wallet_transaction::ActiveModel = entry.into();
    active.status = Set(TxStatus::Completed.as_str().to_string());
    active.balance_after = Set(new_balance);
    let settled = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        payment_id = %payment_id,
        user_id = settled.user_id,
        amount = settled.amount,
        "Pending credit settled"
    );

    Ok(SettleOutcome::Settled(settled))
}

/// Voids a pending credit: flips it to `failed`, balance untouched.
/// Voiding a non-pending entry is the same benign no-op as double-settling.
pub async fn void_pending_credit(
    db: &DatabaseConnection,
    payment_id: &str,
) -> Result<SettleOutcome> {
    let txn = db.begin().await?;

    let entry = find_by_payment_id(&txn, payment_id).await?;

    let claimed = WalletTransaction::update_many()
        .col_expr(
            wallet_transaction::Column::Status,
            Expr::value(TxStatus::Failed.as_str()),
        )
        .filter(wallet_transaction::Column::Id.eq(entry.id))
        .filter(wallet_transaction::Column::Status.eq(TxStatus::Pending.as_str()))
        .exec(&txn)
        .await?;

    if claimed.rows_affected == 0 {
        txn.commit().await?;
        return Ok(SettleOutcome::AlreadyProcessed);
    }

    let voided = WalletTransaction::find_by_id(entry.id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::TransactionNotFound {
            reference: payment_id.to_string(),
        })?;

    txn.commit().await?;
    Ok(SettleOutcome::Settled(voided))
}

/// Returns the current wallet balance for a user.
pub async fn get_balance(db: &DatabaseConnection, user_id: i64) -> Result<f64> {
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;
    Ok(user.wallet_balance)
}

/// Retrieves a page of ledger entries matching the filter, newest first.
///
/// `page` starts at 1.
pub async fn get_transaction_history(
    db: &DatabaseConnection,
    filter: &TransactionFilter,
    page: u64,
    limit: u64,
) -> Result<Vec<wallet_transaction::Model>> {
    let mut query = WalletTransaction::find();

    if let Some(user_id) = filter.user_id {
        query = query.filter(wallet_transaction::Column::UserId.eq(user_id));
    }
    if let Some(tx_type) = filter.tx_type {
        query = query.filter(wallet_transaction::Column::TxType.eq(tx_type.as_str()));
    }
    if let Some(status) = filter.status {
        query = query.filter(wallet_transaction::Column::Status.eq(status.as_str()));
    }

    let offset = page.saturating_sub(1) * limit;

    query
        .order_by_desc(wallet_transaction::Column::CreatedAt)
        .order_by_desc(wallet_transaction::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Replays a user's completed ledger entries in creation order and returns
/// the signed sum. By the ledger invariant this always equals
/// `wallet_balance`; exposed for tests and consistency audits.
pub async fn ledger_sum(db: &DatabaseConnection, user_id: i64) -> Result<f64> {
    let entries = WalletTransaction::find()
        .filter(wallet_transaction::Column::UserId.eq(user_id))
        .filter(wallet_transaction::Column::Status.eq(TxStatus::Completed.as_str()))
        .order_by_asc(wallet_transaction::Column::Id)
        .all(db)
        .await?;

    Ok(entries
        .iter()
        .map(|e| {
            let sign = if e.tx_type == TxType::Debit.as_str() {
                -1.0
            } else {
                1.0
            };
            sign * e.amount
        })
        .sum())
}

// ---------------------------------------------------------------------------
// Internal helpers, generic over the connection so callers can compose them
// into larger transactions.
// ---------------------------------------------------------------------------

fn validate_amount(amount: f64) -> Result<()> {
    if amount <= 0.0 || !amount.is_finite() {
        return Err(Error::InvalidAmount { amount });
    }
    Ok(())
}

async fn find_by_payment_id<C>(db: &C, payment_id: &str) -> Result<wallet_transaction::Model>
where
    C: ConnectionTrait,
{
    WalletTransaction::find()
        .filter(wallet_transaction::Column::PaymentId.eq(payment_id))
        .one(db)
        .await?
        .ok_or_else(|| Error::TransactionNotFound {
            reference: payment_id.to_string(),
        })
}

/// Atomically adds `delta` to the user's balance in a single UPDATE and
/// returns the new balance.
async fn adjust_balance<C>(db: &C, user_id: i64, delta: f64) -> Result<f64>
where
    C: ConnectionTrait,
{
    User::update_many()
        .col_expr(
            user::Column::WalletBalance,
            Expr::col(user::Column::WalletBalance).add(delta),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;
    Ok(user.wallet_balance)
}

async fn apply_credit<C>(
    db: &C,
    user_id: i64,
    amount: f64,
    description: String,
    method: PaymentMethod,
    order_id: Option<i64>,
) -> Result<wallet_transaction::Model>
where
    C: ConnectionTrait,
{
    // Existence check before mutating anything
    User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;

    let new_balance = adjust_balance(db, user_id, amount).await?;

    insert_completed_entry(
        db,
        user_id,
        TxType::Credit,
        amount,
        description,
        new_balance,
        method,
        order_id,
    )
    .await
}

async fn apply_debit<C>(
    db: &C,
    user_id: i64,
    amount: f64,
    description: String,
    method: PaymentMethod,
    order_id: Option<i64>,
) -> Result<wallet_transaction::Model>
where
    C: ConnectionTrait,
{
    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;

    // Conditional decrement: only succeeds when funds suffice, in one
    // statement. Zero rows affected means the balance check failed.
    let updated = User::update_many()
        .col_expr(
            user::Column::WalletBalance,
            Expr::col(user::Column::WalletBalance).sub(amount),
        )
        .filter(user::Column::Id.eq(user_id))
        .filter(user::Column::WalletBalance.gte(amount))
        .exec(db)
        .await?;

    if updated.rows_affected == 0 {
        return Err(Error::InsufficientFunds {
            current: user.wallet_balance,
            required: amount,
        });
    }

    let user = User::find_by_id(user_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::UserNotFound {
            id: user_id.to_string(),
        })?;

    insert_completed_entry(
        db,
        user_id,
        TxType::Debit,
        amount,
        description,
        user.wallet_balance,
        method,
        order_id,
    )
    .await
}

#[allow(clippy::too_many_arguments)]
async fn insert_completed_entry<C>(
    db: &C,
    user_id: i64,
    tx_type: TxType,
    amount: f64,
    description: String,
    balance_after: f64,
    method: PaymentMethod,
    order_id: Option<i64>,
) -> Result<wallet_transaction::Model>
where
    C: ConnectionTrait,
{
    let entry = wallet_transaction::ActiveModel {
        user_id: Set(user_id),
        tx_type: Set(tx_type.as_str().to_string()),
        amount: Set(amount),
        description: Set(description),
        balance_after: Set(balance_after),
        payment_id: Set(None),
        payment_method: Set(method.as_str().to_string()),
        status: Set(TxStatus::Completed.as_str().to_string()),
        order_id: Set(order_id),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    Ok(entry.insert(db).await?)
}
