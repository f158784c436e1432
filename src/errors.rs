use thiserror::Error;

/// Unified error type for the panel core.
///
/// Validation and funds errors are terminal and reported to the caller
/// immediately. Provider failures are retryable and are never surfaced as an
/// order-creation failure once the order has been accepted.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("Quantity {quantity} out of bounds (must be between {min} and {max})")]
    InvalidQuantity { quantity: i64, min: i64, max: i64 },

    #[error("Insufficient wallet balance: have {current}, need {required}")]
    InsufficientFunds { current: f64, required: f64 },

    #[error("User not found: {id}")]
    UserNotFound { id: String },

    #[error("Service not found: {id}")]
    ServiceNotFound { id: String },

    #[error("Order not found: {id}")]
    OrderNotFound { id: String },

    #[error("Wallet transaction not found: {reference}")]
    TransactionNotFound { reference: String },

    #[error("Provider error: {0}")]
    Provider(#[from] crate::provider::ProviderError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
