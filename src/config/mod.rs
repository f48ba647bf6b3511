/// Database configuration and connection management
pub mod database;

/// School roster seeding from config.toml
pub mod school;
