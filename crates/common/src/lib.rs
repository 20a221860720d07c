//! Yamdb Common Library
//!
//! Shared code for the Yamdb gateway and import tooling including:
//! - Database models, schema and repository
//! - Catalog validation and rating aggregation
//! - Error types and handling
//! - Configuration management
//! - Authentication, registration and permissions
//! - Mail delivery
//! - Metrics and observability

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod errors;
pub mod mail;
pub mod metrics;
pub mod pagination;
pub mod permissions;
pub mod reviews;
pub mod users;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
