/// Ingredient catalog data file loading
pub mod catalog;

/// Database configuration and connection management
pub mod database;

/// Application settings from config.toml and the environment
pub mod settings;

