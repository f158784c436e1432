//! Status vocabulary - typed enums for the string-valued entity columns and
//! the mapping table from provider status strings to internal order states.
//!
//! Providers report status in their own vocabulary ("In progress",
//! "Canceled", ...). [`StatusMap`] is an explicit, case-insensitive table
//! from that vocabulary to [`OrderStatus`], with a defined default for
//! unrecognized input: leave the order unchanged. The table can be extended
//! from configuration because provider vocabularies vary.

use std::collections::HashMap;

/// Order lifecycle states.
///
/// `Cancelled` and `Refunded` are terminal. `Partial` is not: `remains` may
/// still decrease toward zero and complete the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderStatus {
    /// Accepted and paid, not yet confirmed by the provider
    Pending,
    /// Submitted to the provider, delivery not started
    Processing,
    /// Provider is delivering
    InProgress,
    /// Fully delivered
    Completed,
    /// Provider delivered less than the requested quantity
    Partial,
    /// Cancelled; undelivered units are refunded
    Cancelled,
    /// Fully refunded
    Refunded,
}

impl OrderStatus {
    /// All states, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Processing,
        Self::InProgress,
        Self::Completed,
        Self::Partial,
        Self::Cancelled,
        Self::Refunded,
    ];

    /// The string stored in the `orders.status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Cancelled => "cancelled",
            Self::Refunded => "refunded",
        }
    }

    /// Parses a stored column value. Unlike [`StatusMap::map`], this is an
    /// exact match on our own vocabulary, not the provider's.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Whether no further status transitions are accepted from this state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    /// Whether a transition into this state entitles the user to money back.
    #[must_use]
    pub const fn is_refund_like(self) -> bool {
        matches!(self, Self::Partial | Self::Cancelled | Self::Refunded)
    }
}

/// Ledger entry direction: `"credit"` or `"debit"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    /// Balance increases
    Credit,
    /// Balance decreases
    Debit,
}

impl TxType {
    /// The string stored in the `wallet_transactions.tx_type` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// The sign this entry contributes when replaying the ledger.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Credit => 1.0,
            Self::Debit => -1.0,
        }
    }
}

/// Ledger entry settlement status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    /// Recorded but not yet applied to the balance (external payments)
    Pending,
    /// Applied to the balance; immutable from here on
    Completed,
    /// Voided without touching the balance
    Failed,
}

impl TxStatus {
    /// The string stored in the `wallet_transactions.status` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// How money entered or left the wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    /// External payment gateway top-up
    External,
    /// Manual adjustment by an admin
    Manual,
    /// Debit reserved for an order
    Order,
    /// Credit from a cancelled/partial/refunded order
    Refund,
}

impl PaymentMethod {
    /// The string stored in the `wallet_transactions.payment_method` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::External => "external",
            Self::Manual => "manual",
            Self::Order => "order",
            Self::Refund => "refund",
        }
    }
}

/// Case-insensitive mapping from provider status vocabulary to [`OrderStatus`].
#[derive(Debug, Clone)]
pub struct StatusMap {
    map: HashMap<String, OrderStatus>,
}

impl Default for StatusMap {
    /// The vocabulary the standard SMM panel API dialect uses.
    fn default() -> Self {
        let mut map = HashMap::new();
        for (key, status) in [
            ("pending", OrderStatus::Pending),
            ("processing", OrderStatus::InProgress),
            ("in progress", OrderStatus::InProgress),
            ("completed", OrderStatus::Completed),
            ("partial", OrderStatus::Partial),
            ("cancelled", OrderStatus::Cancelled),
            ("canceled", OrderStatus::Cancelled),
            ("refunded", OrderStatus::Refunded),
        ] {
            map.insert(key.to_string(), status);
        }
        Self { map }
    }
}

impl StatusMap {
    /// Builds the default table extended with configured overrides.
    /// Override keys are provider strings, values are our status column
    /// strings; unknown values are rejected.
    pub fn with_overrides(
        overrides: &HashMap<String, String>,
    ) -> crate::errors::Result<Self> {
        let mut table = Self::default();
        for (external, internal) in overrides {
            let status =
                OrderStatus::parse(internal).ok_or_else(|| crate::errors::Error::Config {
                    message: format!("Unknown order status in status_map override: {internal}"),
                })?;
            table.map.insert(external.to_lowercase(), status);
        }
        Ok(table)
    }

    /// Maps a provider status string, case-insensitively.
    /// Returns None for unrecognized input (callers leave the order unchanged).
    #[must_use]
    pub fn map(&self, provider_status: &str) -> Option<OrderStatus> {
        self.map.get(&provider_status.to_lowercase()).copied()
    }
}
