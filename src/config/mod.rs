/// Application configuration from config.toml and the environment
pub mod app;

/// Database connection and table creation
pub mod database;

/// Service catalog seeding from config.toml
pub mod services;
