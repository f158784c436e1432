//! Business logic, organized per concern. Everything here is plain async
//! functions over a [`sea_orm::DatabaseConnection`]; the scheduler and any
//! outer API surface call into these.

pub mod order;
pub mod service;
pub mod stats;
pub mod status;
pub mod user;
pub mod wallet;
