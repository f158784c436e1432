//! Provider gateway - abstract client capability for the upstream SMM API.
//!
//! The upstream provider is an unreliable remote service. Every call may fail
//! with a timeout or a provider-side error; none of these failures are fatal
//! to the order lifecycle, they all degrade to "try again later".
//!
//! The gateway is an injected capability ([`SmmProvider`] trait object passed
//! into the lifecycle manager and the scheduler at construction time), so
//! tests substitute a scripted fake without touching the network.
//!
//! Note that `create_order` is NOT retry-safe on the remote side: a retried
//! submit after a lost response may create a duplicate remote order. The
//! standard SMM API dialect has no idempotency key to offer here.

pub mod http;

pub use http::HttpProvider;

use async_trait::async_trait;
use thiserror::Error;

/// Failures of the remote provider. All variants are retryable.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request did not complete within the configured timeout
    #[error("provider request timed out")]
    Timeout,

    /// The provider could not be reached at the transport level
    #[error("provider unreachable: {0}")]
    Unreachable(String),

    /// The provider answered with an error payload
    #[error("{0}")]
    Api(String),
}

/// Status of one remote order as reported by the provider.
///
/// `status` is raw provider vocabulary; it goes through
/// [`crate::core::status::StatusMap`] before touching an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatusInfo {
    /// Provider status string, e.g. `"In progress"`
    pub status: String,
    /// Count at the target when delivery started, if reported
    pub start_count: Option<i64>,
    /// Undelivered units, if reported
    pub remains: Option<i64>,
}

/// One entry of the provider's service list.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderService {
    /// Service identifier on the provider, used as `provider_service_id`
    pub service: String,
    /// Display name
    pub name: String,
    /// Provider-side category
    pub category: String,
    /// Provider's price per 1000 units
    pub rate: f64,
    /// Minimum order quantity
    pub min: i64,
    /// Maximum order quantity
    pub max: i64,
}

/// The capabilities the panel needs from an upstream SMM provider.
#[async_trait]
pub trait SmmProvider: Send + Sync {
    /// Submits a new order. Returns the provider's order identifier.
    ///
    /// Side-effect-bearing and not idempotent: callers must not assume
    /// retry-safety.
    async fn create_order(
        &self,
        provider_service_id: &str,
        link: &str,
        quantity: i64,
    ) -> Result<String, ProviderError>;

    /// Queries the status of a previously submitted order.
    /// Read-only, safe to retry and poll.
    async fn order_status(&self, provider_order_id: &str)
    -> Result<OrderStatusInfo, ProviderError>;

    /// Requests cancellation of an order. Admin tooling, not on the
    /// reconciliation path.
    async fn cancel_order(&self, provider_order_id: &str) -> Result<(), ProviderError>;

    /// Requests a refill for a dropped order. Admin tooling, not on the
    /// reconciliation path.
    async fn refill_order(&self, provider_order_id: &str) -> Result<(), ProviderError>;

    /// Fetches the provider's service list, for catalog import tooling.
    async fn list_services(&self) -> Result<Vec<ProviderService>, ProviderError>;

    /// Fetches the remaining balance on the provider account.
    async fn balance(&self) -> Result<f64, ProviderError>;
}
