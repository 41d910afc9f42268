//! Spoor Store - SQLite audit trail persistence
//!
//! SQLite-based storage for per-entity audit tables:
//! - Append-only entry rows (one table per audited entity)
//! - Predicate queries and counts for the audit reader
//! - Audit table provisioning from an `AuditConfiguration`
//!
//! ## Architecture
//!
//! This crate implements the `IAuditStore` port from `spoor-core` using
//! SQLite as the storage backend. It is a driven (secondary) adapter in the
//! hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool (file-backed or in-memory)
//! - [`SqliteAuditStore`] - Full `IAuditStore` implementation + provisioning
//! - [`StoreError`] - Error types for store operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use spoor_store::{DatabasePool, SqliteAuditStore};
//! # use spoor_core::config::AuditConfiguration;
//!
//! # async fn example(configuration: AuditConfiguration) -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/myapp/audit.db")).await?;
//! let store = SqliteAuditStore::new(pool.pool().clone());
//! store.provision(&configuration).await?;
//! // Use store as IAuditStore...
//! # Ok(())
//! # }
//! ```

pub mod pool;
pub mod store;

pub use pool::DatabasePool;
pub use store::SqliteAuditStore;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Serialization or deserialization of entry fields failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A table name is not a safe SQL identifier
    #[error("Invalid table identifier: {0}")]
    InvalidIdentifier(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::QueryFailed(e.to_string())
    }
}
