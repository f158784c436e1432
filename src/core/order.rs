//! Order lifecycle business logic.
//!
//! Owns the order state machine: creation (funds reserved and order
//! persisted as one transaction), best-effort synchronous submission to the
//! provider, admin status overrides with their refund rule, and status
//! reconciliation driven by the scheduler.
//!
//! Money movement always goes through [`crate::core::wallet`]; this module
//! never touches `wallet_balance` directly. Refund paths serialize on
//! conditional UPDATEs (the status guard for full refunds, the
//! `refunded_remains` watermark for partial refunds) so overlapping scheduler
//! ticks or concurrent admin calls cannot double-credit.

use crate::{
    core::{
        status::{OrderStatus, StatusMap},
        wallet,
    },
    entities::{Order, Service, order},
    errors::{Error, Result},
    provider::SmmProvider,
};
use sea_orm::{
    QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr,
};

/// Filter for order list queries.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Restrict to one user's orders
    pub user_id: Option<i64>,
    /// Restrict to a lifecycle state
    pub status: Option<OrderStatus>,
}

/// Creates an order: validates the service and quantity, then reserves funds
/// and persists the order as ONE database transaction (both succeed or both
/// roll back), then attempts one synchronous provider submission.
///
/// The submission is best-effort: a provider failure is logged and swallowed,
/// the order stays `pending` with no provider reference and is picked up by
/// the submission-retry task. The caller gets the order back either way -
/// provider trouble is never an order-creation error.
pub async fn create_order(
    db: &DatabaseConnection,
    provider: &dyn SmmProvider,
    user_id: i64,
    service_id: i64,
    link: String,
    quantity: i64,
) -> Result<order::Model> {
    let service = Service::find_by_id(service_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ServiceNotFound {
            id: service_id.to_string(),
        })?;

    if !service.is_active {
        return Err(Error::Validation {
            message: format!("Service '{}' is not available", service.title),
        });
    }

    if link.trim().is_empty() {
        return Err(Error::Validation {
            message: "Order link cannot be empty".to_string(),
        });
    }

    if quantity < service.min || quantity > service.max {
        return Err(Error::InvalidQuantity {
            quantity,
            min: service.min,
            max: service.max,
        });
    }

    let amount = service.rate / 1000.0 * quantity as f64;

    // One atomic unit: order insert + wallet reservation. An insufficient
    // balance rolls back the order row as well.
    let txn = db.begin().await?;

    let now = chrono::Utc::now();
    let inserted = order::ActiveModel {
        user_id: Set(user_id),
        service_id: Set(service_id),
        link: Set(link.trim().to_string()),
        quantity: Set(quantity),
        amount: Set(amount),
        status: Set(OrderStatus::Pending.as_str().to_string()),
        provider_order_id: Set(None),
        start_count: Set(0),
        remains: Set(0),
        refunded_remains: Set(0),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    // Zero-rate services produce no ledger entry; there is nothing to reserve
    if amount > 0.0 {
        wallet::reserve_for_order(
            &txn,
            user_id,
            amount,
            format!("Order for {}", service.title),
            Some(inserted.id),
        )
        .await?;
    }

    txn.commit().await?;

    tracing::info!(
        order_id = inserted.id,
        user_id,
        service_id,
        quantity,
        amount,
        "Order created"
    );

    // Best-effort synchronous submit; the debit above is already committed,
    // so no ledger lock is held across this remote call.
    match submit_order(db, provider, inserted.id).await {
        Ok(submitted) => Ok(submitted),
        Err(Error::Provider(e)) => {
            tracing::warn!(
                order_id = inserted.id,
                error = %e,
                "Provider rejected initial submission, order left pending for retry"
            );
            Ok(inserted)
        }
        Err(e) => Err(e),
    }
}

/// Submits an order to the provider and, on success, records the provider
/// reference and moves the order to `processing`.
///
/// Used both by [`create_order`] and by the submission-retry task. The
/// status write is conditional on the order still having no provider
/// reference, so a retry tick racing the synchronous submit cannot record a
/// second submission over the first.
pub async fn submit_order(
    db: &DatabaseConnection,
    provider: &dyn SmmProvider,
    order_id: i64,
) -> Result<order::Model> {
    let order = get_order(db, order_id).await?;
    if order.provider_order_id.is_some() {
        return Ok(order);
    }

    let service = Service::find_by_id(order.service_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ServiceNotFound {
            id: order.service_id.to_string(),
        })?;

    let provider_order_id = provider
        .create_order(&service.provider_service_id, &order.link, order.quantity)
        .await?;

    Order::update_many()
        .col_expr(
            order::Column::ProviderOrderId,
            Expr::value(Some(provider_order_id.clone())),
        )
        .col_expr(
            order::Column::Status,
            Expr::value(OrderStatus::Processing.as_str()),
        )
        .col_expr(order::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(order::Column::Id.eq(order.id))
        .filter(order::Column::ProviderOrderId.is_null())
        .exec(db)
        .await?;

    tracing::info!(
        order_id = order.id,
        provider_order_id = %provider_order_id,
        "Order submitted to provider"
    );

    get_order(db, order.id).await
}

/// Admin status override.
///
/// Transitioning *into* `cancelled` or `refunded` from any state that is not
/// already one of those credits the full order amount back to the wallet,
/// tagged `"refund"`, in the same transaction as the status write. The write
/// is conditional on the order not already being cancelled/refunded - that
/// condition is the serialization point that makes a second cancel a no-op
/// instead of a second refund.
///
/// Transitions out of `cancelled`/`refunded` are rejected; transitions
/// between non-terminal states carry no financial side effect.
pub async fn set_order_status(
    db: &DatabaseConnection,
    order_id: i64,
    new_status: OrderStatus,
) -> Result<order::Model> {
    let txn = db.begin().await?;

    let order = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::OrderNotFound {
            id: order_id.to_string(),
        })?;

    let current = OrderStatus::parse(&order.status);

    if let Some(current) = current {
        if current.is_terminal() && new_status != current {
            return Err(Error::Validation {
                message: format!(
                    "Order #{order_id} is already {} and cannot change status",
                    current.as_str()
                ),
            });
        }
    }

    if matches!(new_status, OrderStatus::Cancelled | OrderStatus::Refunded) {
        // Claim the transition; zero rows means a concurrent call won the
        // race and already issued the refund.
        let claimed = Order::update_many()
            .col_expr(
                order::Column::Status,
                Expr::value(new_status.as_str()),
            )
            .col_expr(order::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.is_not_in([
                OrderStatus::Cancelled.as_str(),
                OrderStatus::Refunded.as_str(),
            ]))
            .exec(&txn)
            .await?;

        if claimed.rows_affected == 1 && order.amount > 0.0 {
            wallet::apply_refund(
                &txn,
                order.user_id,
                order.amount,
                format!("Refund for order #{order_id}"),
                Some(order_id),
            )
            .await?;

            tracing::info!(
                order_id,
                amount = order.amount,
                status = new_status.as_str(),
                "Order refunded by admin override"
            );
        }
    } else {
        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status.as_str().to_string());
        active.updated_at = Set(chrono::Utc::now());
        active.update(&txn).await?;
    }

    txn.commit().await?;
    get_order(db, order_id).await
}

/// Reconciles one in-flight order against the provider's reported status.
///
/// Maps the provider vocabulary through `status_map` (unrecognized values
/// leave the status unchanged), updates `start_count`/`remains`, and credits
/// the undelivered portion when the mapped status is partial/cancelled/
/// refunded. The credit covers only the delta above the `refunded_remains`
/// watermark and is claimed by a conditional UPDATE on that watermark, so a
/// repeated poll with unchanged `remains` - or two overlapping ticks - credit
/// nothing extra.
pub async fn reconcile_order(
    db: &DatabaseConnection,
    provider: &dyn SmmProvider,
    status_map: &StatusMap,
    order_id: i64,
) -> Result<order::Model> {
    let order = get_order(db, order_id).await?;

    let Some(provider_order_id) = order.provider_order_id.clone() else {
        return Ok(order);
    };

    let info = provider.order_status(&provider_order_id).await?;
    let mapped = status_map.map(&info.status);

    let service = Service::find_by_id(order.service_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::ServiceNotFound {
            id: order.service_id.to_string(),
        })?;

    let txn = db.begin().await?;

    // Re-read inside the transaction: the refund rule is evaluated against
    // the state actually persisted, not a cached copy.
    let fresh = Order::find_by_id(order_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::OrderNotFound {
            id: order_id.to_string(),
        })?;

    // Admin may have cancelled/refunded since this order was selected for
    // polling; that path already settled the money.
    if OrderStatus::parse(&fresh.status).is_some_and(OrderStatus::is_terminal) {
        txn.commit().await?;
        return Ok(fresh);
    }

    let new_status = mapped.or_else(|| OrderStatus::parse(&fresh.status));
    let remains = info.remains.unwrap_or(fresh.remains);
    let refunded_remains = fresh.refunded_remains;
    let user_id = fresh.user_id;

    let mut active: order::ActiveModel = fresh.into();
    if let Some(status) = new_status {
        active.status = Set(status.as_str().to_string());
    }
    if let Some(start_count) = info.start_count {
        active.start_count = Set(start_count);
    }
    active.remains = Set(remains);
    active.updated_at = Set(chrono::Utc::now());
    active.update(&txn).await?;

    if new_status.is_some_and(OrderStatus::is_refund_like) && remains > refunded_remains {
        let delta = remains - refunded_remains;

        // Watermark claim: exactly one tick gets to credit this delta.
        let claimed = Order::update_many()
            .col_expr(order::Column::RefundedRemains, Expr::value(remains))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::RefundedRemains.eq(refunded_remains))
            .exec(&txn)
            .await?;

        let refund_amount = service.rate / 1000.0 * delta as f64;
        if claimed.rows_affected == 1 && refund_amount > 0.0 {
            wallet::apply_refund(
                &txn,
                user_id,
                refund_amount,
                format!("Partial refund for order #{order_id}"),
                Some(order_id),
            )
            .await?;

            tracing::info!(
                order_id,
                remains,
                refund_amount,
                "Undelivered portion refunded"
            );
        }
    }

    txn.commit().await?;
    get_order(db, order_id).await
}

/// Finds an order by id.
pub async fn get_order(db: &DatabaseConnection, order_id: i64) -> Result<order::Model> {
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::OrderNotFound {
            id: order_id.to_string(),
        })
}

/// Retrieves a page of orders matching the filter, newest first.
/// `page` starts at 1.
pub async fn list_orders(
    db: &DatabaseConnection,
    filter: &OrderFilter,
    page: u64,
    limit: u64,
) -> Result<Vec<order::Model>> {
    let mut query = Order::find();

    if let Some(user_id) = filter.user_id {
        query = query.filter(order::Column::UserId.eq(user_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(order::Column::Status.eq(status.as_str()));
    }

    let offset = page.saturating_sub(1) * limit;

    query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .offset(offset)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Orders eligible for the status-poll task: in flight and already known to
/// the provider. Oldest-updated first so no order starves.
pub async fn find_pollable_orders(
    db: &DatabaseConnection,
    limit: u64,
) -> Result<Vec<order::Model>> {
    Order::find()
        .filter(order::Column::Status.is_in([
            OrderStatus::Pending.as_str(),
            OrderStatus::Processing.as_str(),
            OrderStatus::InProgress.as_str(),
        ]))
        .filter(order::Column::ProviderOrderId.is_not_null())
        .order_by_asc(order::Column::UpdatedAt)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Orders eligible for the submission-retry task: pending, never accepted by
/// the provider, and created within the recency window. Orders older than
/// the window are left for admin intervention instead of being retried
/// forever.
pub async fn find_unsubmitted_orders(
    db: &DatabaseConnection,
    limit: u64,
    window: chrono::Duration,
) -> Result<Vec<order::Model>> {
    let cutoff = chrono::Utc::now() - window;

    Order::find()
        .filter(order::Column::Status.eq(OrderStatus::Pending.as_str()))
        .filter(order::Column::ProviderOrderId.is_null())
        .filter(order::Column::CreatedAt.gte(cutoff))
        .order_by_asc(order::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::core::wallet::{TransactionFilter, get_balance, get_transaction_history, ledger_sum};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_order_charges_wallet() -> Result<()> {
        // Balance 100.00, rate 10 per 1000, quantity 1000 => charge 10.00
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;

        assert_eq!(order.amount, 10.0);
        assert_eq!(get_balance(&db, user.id).await?, 90.0);

        // Exactly one debit entry tagged "order" with the right snapshot
        let history = get_transaction_history(
            &db,
            &TransactionFilter {
                user_id: Some(user.id),
                ..Default::default()
            },
            1,
            10,
        )
        .await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].tx_type, "debit");
        assert_eq!(history[0].amount, 10.0);
        assert_eq!(history[0].balance_after, 90.0);
        assert_eq!(history[0].payment_method, "order");
        assert_eq!(history[0].order_id, Some(order.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_submits_to_provider() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;

        assert_eq!(order.status, "processing");
        assert!(order.provider_order_id.is_some());
        assert_eq!(provider.submit_calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_provider_failure_leaves_pending() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::failing();

        // Provider down: the order is still accepted and the debit stands
        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;

        assert_eq!(order.status, "pending");
        assert!(order.provider_order_id.is_none());
        assert_eq!(get_balance(&db, user.id).await?, 90.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_quantity_bounds() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        for quantity in [50, 20_000] {
            let result = create_order(
                &db,
                provider.as_ref(),
                user.id,
                service.id,
                "https://example.com/p/1".to_string(),
                quantity,
            )
            .await;
            assert!(matches!(result, Err(Error::InvalidQuantity { .. })));
        }

        // No order, no ledger entry, no provider call
        assert_eq!(list_orders(&db, &OrderFilter::default(), 1, 10).await?.len(), 0);
        assert_eq!(get_balance(&db, user.id).await?, 100.0);
        assert_eq!(provider.submit_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_insufficient_funds_rolls_back_order() -> Result<()> {
        // Balance 5.00, amount would be 10.00
        let (db, user, service) = setup_with_user_and_service(5.0).await?;
        let provider = MockProvider::new();

        let result = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await;

        assert!(matches!(result, Err(Error::InsufficientFunds { .. })));
        assert_eq!(get_balance(&db, user.id).await?, 5.0);
        // The order insert was rolled back with the failed debit
        assert_eq!(list_orders(&db, &OrderFilter::default(), 1, 10).await?.len(), 0);
        assert_eq!(provider.submit_calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_order_inactive_service_rejected() -> Result<()> {
        let (db, user) = setup_with_user(100.0).await?;
        let service = create_custom_service(&db, "Paused", 10.0, 100, 10_000, false).await?;
        let provider = MockProvider::new();

        let result = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await;

        assert!(matches!(result, Err(Error::Validation { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_admin_cancel_refunds_full_amount() -> Result<()> {
        // Scenario: order amount 10.00, pending -> cancelled => +10.00 back
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::failing(); // stays pending

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;
        assert_eq!(get_balance(&db, user.id).await?, 90.0);

        let cancelled = set_order_status(&db, order.id, OrderStatus::Cancelled).await?;
        assert_eq!(cancelled.status, "cancelled");
        assert_eq!(get_balance(&db, user.id).await?, 100.0);

        let refunds = refund_entries(&db, user.id).await?;
        assert_eq!(refunds.len(), 1);
        assert_eq!(refunds[0].amount, 10.0);
        assert_eq!(refunds[0].order_id, Some(order.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_double_refund_on_repeated_cancel() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::failing();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;

        set_order_status(&db, order.id, OrderStatus::Cancelled).await?;
        assert_eq!(get_balance(&db, user.id).await?, 100.0);

        // A second cancel (or refund) must not credit again
        let again = set_order_status(&db, order.id, OrderStatus::Refunded).await;
        assert!(matches!(again, Err(Error::Validation { .. })));

        assert_eq!(get_balance(&db, user.id).await?, 100.0);
        assert_eq!(refund_entries(&db, user.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_terminal_transition_moves_no_money() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;

        let updated = set_order_status(&db, order.id, OrderStatus::InProgress).await?;
        assert_eq!(updated.status, "in_progress");
        assert_eq!(get_balance(&db, user.id).await?, 90.0);
        assert!(refund_entries(&db, user.id).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_completed_order_still_refunds() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;

        set_order_status(&db, order.id, OrderStatus::Completed).await?;
        // Completed is terminal for the provider, but an admin cancel from
        // completed still triggers the full-amount refund rule
        let cancelled = set_order_status(&db, order.id, OrderStatus::Cancelled).await?;
        assert_eq!(cancelled.status, "cancelled");
        assert_eq!(get_balance(&db, user.id).await?, 100.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_partial_refunds_undelivered_once() -> Result<()> {
        // Scenario: quantity 1000, rate 10/1000, provider reports partial
        // with remains 300 => refund 3.00, second identical poll => nothing
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;
        let pid = order.provider_order_id.clone().unwrap();
        assert_eq!(get_balance(&db, user.id).await?, 90.0);

        provider.set_status(&pid, "Partial", Some(120), Some(300));

        let map = StatusMap::default();
        let reconciled = reconcile_order(&db, provider.as_ref(), &map, order.id).await?;
        assert_eq!(reconciled.status, "partial");
        assert_eq!(reconciled.start_count, 120);
        assert_eq!(reconciled.remains, 300);
        assert_eq!(reconciled.refunded_remains, 300);
        assert_eq!(get_balance(&db, user.id).await?, 93.0);

        // Second poll, same report: no further credit
        let again = reconcile_order(&db, provider.as_ref(), &map, order.id).await?;
        assert_eq!(again.refunded_remains, 300);
        assert_eq!(get_balance(&db, user.id).await?, 93.0);
        assert_eq!(refund_entries(&db, user.id).await?.len(), 1);
        assert_eq!(ledger_sum(&db, user.id).await?, -7.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_growing_remains_refunds_delta() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;
        let pid = order.provider_order_id.clone().unwrap();
        let map = StatusMap::default();

        provider.set_status(&pid, "partial", None, Some(200));
        reconcile_order(&db, provider.as_ref(), &map, order.id).await?;
        assert_eq!(get_balance(&db, user.id).await?, 92.0);

        // Provider later reports more undelivered units: only the delta of
        // 100 units (1.00) is credited on top
        provider.set_status(&pid, "partial", None, Some(300));
        reconcile_order(&db, provider.as_ref(), &map, order.id).await?;
        assert_eq!(get_balance(&db, user.id).await?, 93.0);
        assert_eq!(refund_entries(&db, user.id).await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_unrecognized_status_leaves_order_unchanged() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;
        let pid = order.provider_order_id.clone().unwrap();

        provider.set_status(&pid, "Awaiting moderation", Some(50), None);

        let map = StatusMap::default();
        let reconciled = reconcile_order(&db, provider.as_ref(), &map, order.id).await?;
        // Status untouched, counters still applied
        assert_eq!(reconciled.status, "processing");
        assert_eq!(reconciled.start_count, 50);
        assert_eq!(get_balance(&db, user.id).await?, 90.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_completed_order() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;
        let pid = order.provider_order_id.clone().unwrap();

        provider.set_status(&pid, "Completed", Some(500), Some(0));

        let map = StatusMap::default();
        let reconciled = reconcile_order(&db, provider.as_ref(), &map, order.id).await?;
        assert_eq!(reconciled.status, "completed");
        assert_eq!(reconciled.remains, 0);
        // Full delivery: nothing refunded
        assert_eq!(get_balance(&db, user.id).await?, 90.0);
        Ok(())
    }

    #[tokio::test]
    async fn test_reconcile_skips_admin_cancelled_order() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;
        let pid = order.provider_order_id.clone().unwrap();

        // Admin cancels (full refund) while a poll is in flight
        set_order_status(&db, order.id, OrderStatus::Cancelled).await?;
        assert_eq!(get_balance(&db, user.id).await?, 100.0);

        provider.set_status(&pid, "partial", None, Some(300));
        let map = StatusMap::default();
        let after = reconcile_order(&db, provider.as_ref(), &map, order.id).await?;

        // The poll must not pile a partial refund on top of the full one
        assert_eq!(after.status, "cancelled");
        assert_eq!(get_balance(&db, user.id).await?, 100.0);
        assert_eq!(refund_entries(&db, user.id).await?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_submit_order_is_noop_when_already_submitted() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::new();

        let order = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;
        assert_eq!(provider.submit_calls(), 1);

        let resubmitted = submit_order(&db, provider.as_ref(), order.id).await?;
        assert_eq!(resubmitted.provider_order_id, order.provider_order_id);
        assert_eq!(provider.submit_calls(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_find_unsubmitted_orders_respects_window() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let provider = MockProvider::failing();

        let recent = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;
        let stale = create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/2".to_string(),
            1000,
        )
        .await?;
        backdate_order(&db, stale.id, chrono::Duration::hours(48)).await?;

        let eligible =
            find_unsubmitted_orders(&db, 50, chrono::Duration::hours(24)).await?;
        let ids: Vec<i64> = eligible.iter().map(|o| o.id).collect();
        assert!(ids.contains(&recent.id));
        assert!(!ids.contains(&stale.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_find_pollable_orders_requires_provider_reference() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;

        let failing = MockProvider::failing();
        let unsubmitted = create_order(
            &db,
            failing.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;

        let working = MockProvider::new();
        let submitted = create_order(
            &db,
            working.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/2".to_string(),
            1000,
        )
        .await?;

        let pollable = find_pollable_orders(&db, 100).await?;
        let ids: Vec<i64> = pollable.iter().map(|o| o.id).collect();
        assert!(ids.contains(&submitted.id));
        assert!(!ids.contains(&unsubmitted.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_orders_filters() -> Result<()> {
        let (db, user, service) = setup_with_user_and_service(100.0).await?;
        let other = create_test_user(&db, "Other", 100.0).await?;
        let provider = MockProvider::new();

        create_order(
            &db,
            provider.as_ref(),
            user.id,
            service.id,
            "https://example.com/p/1".to_string(),
            1000,
        )
        .await?;
        create_order(
            &db,
            provider.as_ref(),
            other.id,
            service.id,
            "https://example.com/p/2".to_string(),
            1000,
        )
        .await?;

        let mine = list_orders(
            &db,
            &OrderFilter {
                user_id: Some(user.id),
                status: None,
            },
            1,
            50,
        )
        .await?;
        assert_eq!(mine.len(), 1);

        let processing = list_orders(
            &db,
            &OrderFilter {
                user_id: None,
                status: Some(OrderStatus::Processing),
            },
            1,
            50,
        )
        .await?;
        assert_eq!(processing.len(), 2);
        Ok(())
    }
}
