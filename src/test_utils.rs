//! Shared test utilities.
//!
//! Common helpers for setting up in-memory test databases, creating entities
//! with sensible defaults, and a scriptable in-process provider fake.

use crate::{
    entities::{WalletTransaction, order, service, user, wallet_transaction},
    errors::Result,
    provider::{OrderStatusInfo, ProviderError, ProviderService, SmmProvider},
};
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering},
};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Creates a test user with the given starting balance.
/// The email is derived from the name, so names must be unique per test.
pub async fn create_test_user(
    db: &DatabaseConnection,
    name: &str,
    balance: f64,
) -> Result<user::Model> {
    use sea_orm::ActiveModelTrait;

    let entry = user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(format!(
            "{}@example.com",
            name.to_lowercase().replace(' ', ".")
        )),
        role: Set("user".to_string()),
        wallet_balance: Set(balance),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

/// Creates a test service with sensible defaults.
///
/// # Defaults
/// * `rate`: 10.0 per 1000 units (so quantity 1000 costs 10.00)
/// * `min`: 100, `max`: 10000
/// * active
pub async fn create_test_service(db: &DatabaseConnection) -> Result<service::Model> {
    create_custom_service(db, "Test Followers", 10.0, 100, 10_000, true).await
}

/// Creates a test service with custom parameters.
pub async fn create_custom_service(
    db: &DatabaseConnection,
    title: &str,
    rate: f64,
    min: i64,
    max: i64,
    is_active: bool,
) -> Result<service::Model> {
    use sea_orm::ActiveModelTrait;

    let entry = service::ActiveModel {
        title: Set(title.to_string()),
        category: Set("Test".to_string()),
        description: Set(String::new()),
        rate: Set(rate),
        min: Set(min),
        max: Set(max),
        provider_service_id: Set(format!("svc-{}", title.to_lowercase().replace(' ', "-"))),
        is_active: Set(is_active),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    Ok(entry.insert(db).await?)
}

/// Sets up a complete test environment with one user.
/// Returns (db, user) for wallet tests.
pub async fn setup_with_user(balance: f64) -> Result<(DatabaseConnection, user::Model)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "Test User", balance).await?;
    Ok((db, user))
}

/// Sets up a complete test environment with a user and an orderable service.
/// Returns (db, user, service) for order tests.
pub async fn setup_with_user_and_service(
    balance: f64,
) -> Result<(DatabaseConnection, user::Model, service::Model)> {
    let db = setup_test_db().await?;
    let user = create_test_user(&db, "Test User", balance).await?;
    let service = create_test_service(&db).await?;
    Ok((db, user, service))
}

/// Rewrites an order's `created_at` to `age` ago, for recency-window tests.
pub async fn backdate_order(
    db: &DatabaseConnection,
    order_id: i64,
    age: chrono::Duration,
) -> Result<()> {
    use sea_orm::ActiveModelTrait;

    let order = crate::core::order::get_order(db, order_id).await?;
    let mut active: order::ActiveModel = order.into();
    active.created_at = Set(chrono::Utc::now() - age);
    active.update(db).await?;
    Ok(())
}

/// A user's completed refund credits, oldest first.
pub async fn refund_entries(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<wallet_transaction::Model>> {
    WalletTransaction::find()
        .filter(wallet_transaction::Column::UserId.eq(user_id))
        .filter(wallet_transaction::Column::PaymentMethod.eq("refund"))
        .order_by_asc(wallet_transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Scriptable in-process provider.
///
/// Submissions succeed (with generated ids) or fail wholesale via
/// [`MockProvider::set_submit_ok`]; status lookups answer from a scripted
/// table and error for unknown ids, which doubles as the per-order failure
/// case in scheduler tests.
pub struct MockProvider {
    submit_ok: AtomicBool,
    next_order_id: AtomicI64,
    submit_calls: AtomicUsize,
    statuses: Mutex<HashMap<String, OrderStatusInfo>>,
}

impl MockProvider {
    /// A provider that accepts every submission.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            submit_ok: AtomicBool::new(true),
            next_order_id: AtomicI64::new(9001),
            submit_calls: AtomicUsize::new(0),
            statuses: Mutex::new(HashMap::new()),
        })
    }

    /// A provider that rejects every submission.
    #[must_use]
    pub fn failing() -> Arc<Self> {
        let provider = Self::new();
        provider.set_submit_ok(false);
        provider
    }

    pub fn set_submit_ok(&self, ok: bool) {
        self.submit_ok.store(ok, Ordering::SeqCst);
    }

    /// Scripts the status report for one provider order id.
    pub fn set_status(
        &self,
        provider_order_id: &str,
        status: &str,
        start_count: Option<i64>,
        remains: Option<i64>,
    ) {
        self.statuses.lock().unwrap().insert(
            provider_order_id.to_string(),
            OrderStatusInfo {
                status: status.to_string(),
                start_count,
                remains,
            },
        );
    }

    /// How many submissions were attempted, successful or not.
    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SmmProvider for MockProvider {
    async fn create_order(
        &self,
        _provider_service_id: &str,
        _link: &str,
        _quantity: i64,
    ) -> std::result::Result<String, ProviderError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if !self.submit_ok.load(Ordering::SeqCst) {
            return Err(ProviderError::Api("provider rejected order".to_string()));
        }
        Ok(self.next_order_id.fetch_add(1, Ordering::SeqCst).to_string())
    }

    async fn order_status(
        &self,
        provider_order_id: &str,
    ) -> std::result::Result<OrderStatusInfo, ProviderError> {
        self.statuses
            .lock()
            .unwrap()
            .get(provider_order_id)
            .cloned()
            .ok_or_else(|| ProviderError::Api("Incorrect order ID".to_string()))
    }

    async fn cancel_order(&self, _provider_order_id: &str) -> std::result::Result<(), ProviderError> {
        Ok(())
    }

    async fn refill_order(&self, _provider_order_id: &str) -> std::result::Result<(), ProviderError> {
        Ok(())
    }

    async fn list_services(&self) -> std::result::Result<Vec<ProviderService>, ProviderError> {
        Ok(Vec::new())
    }

    async fn balance(&self) -> std::result::Result<f64, ProviderError> {
        Ok(1000.0)
    }
}
