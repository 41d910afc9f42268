//! Audit store port (driven/secondary port)
//!
//! This module defines the interface for reading and appending audit
//! entries in per-entity audit tables.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   (SQLite, etc.) and don't need domain-level classification; the reader
//!   wraps them unchanged into `AuditError::Storage`.
//! - The `EntryQuery` struct provides a composable predicate mechanism
//!   without exposing storage implementation details. Predicates always
//!   combine as a conjunction (AND).
//! - Reads and appends share one port rather than proliferating small
//!   repository traits; the reader only ever calls the query methods.

use chrono::{DateTime, Utc};

use crate::domain::{Entry, EntryId, OperationKind, TransactionHash};

// ============================================================================
// EntryQuery struct
// ============================================================================

/// Predicates and bounds for querying audit entries
///
/// All fields are optional; when `None` (or empty, for `operations`), no
/// restriction is applied for that field. Results are always ordered by row
/// sequence descending (newest first). Without `offset`/`limit` the query
/// is an unbounded scan, which the count and transaction-hash paths rely on.
///
/// # Example
///
/// ```
/// use spoor_core::ports::EntryQuery;
///
/// // Second page (25 per page) of one object's history
/// let query = EntryQuery::new()
///     .with_object_id("42")
///     .with_page(25, 25);
/// assert_eq!(query.limit, Some(25));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    /// Restrict to one audited instance
    pub object_id: Option<String>,
    /// Restrict to one unit of work
    pub transaction_hash: Option<TransactionHash>,
    /// Restrict to these operation kinds (empty = all kinds)
    pub operations: Vec<OperationKind>,
    /// Restrict to entries created at or after this instant
    pub created_from: Option<DateTime<Utc>>,
    /// Restrict to entries created at or before this instant
    pub created_until: Option<DateTime<Utc>>,
    /// Number of leading rows to skip
    pub offset: Option<u64>,
    /// Maximum number of rows to return
    pub limit: Option<u64>,
}

impl EntryQuery {
    /// Creates a new unrestricted query (matches all entries)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the object id predicate
    #[must_use]
    pub fn with_object_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    /// Sets the transaction hash predicate
    #[must_use]
    pub fn with_transaction_hash(mut self, hash: TransactionHash) -> Self {
        self.transaction_hash = Some(hash);
        self
    }

    /// Sets the operation kind membership predicate
    #[must_use]
    pub fn with_operations(mut self, operations: impl Into<Vec<OperationKind>>) -> Self {
        self.operations = operations.into();
        self
    }

    /// Sets the lower creation-time bound (inclusive)
    #[must_use]
    pub fn with_created_from(mut self, from: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self
    }

    /// Sets the upper creation-time bound (inclusive)
    #[must_use]
    pub fn with_created_until(mut self, until: DateTime<Utc>) -> Self {
        self.created_until = Some(until);
        self
    }

    /// Sets the pagination window
    #[must_use]
    pub fn with_page(mut self, offset: u64, limit: u64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    /// Returns true if no predicates or bounds are set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.object_id.is_none()
            && self.transaction_hash.is_none()
            && self.operations.is_empty()
            && self.created_from.is_none()
            && self.created_until.is_none()
            && self.offset.is_none()
            && self.limit.is_none()
    }
}

// ============================================================================
// IAuditStore trait
// ============================================================================

/// Port trait for audit trail storage
///
/// Implementations address one audit table per call; the caller resolves
/// the table name from its [`AuditConfiguration`](crate::config::AuditConfiguration)
/// beforehand. A query against a table that does not exist is a storage
/// error, not an empty result; table provisioning belongs to the adapter's
/// concrete API, never to this port.
#[async_trait::async_trait]
pub trait IAuditStore: Send + Sync {
    /// Queries entries matching the given predicates
    ///
    /// Returns entries ordered by row sequence descending (newest first),
    /// honoring the query's offset/limit when set.
    async fn query_entries(&self, audit_table: &str, query: &EntryQuery)
        -> anyhow::Result<Vec<Entry>>;

    /// Counts entries matching the given predicates
    ///
    /// Ignores the query's offset/limit.
    async fn count_entries(&self, audit_table: &str, query: &EntryQuery) -> anyhow::Result<u64>;

    /// Appends an entry, returning the assigned row id
    ///
    /// The entry's own `id` is ignored; rows are append-only and never
    /// updated or deleted.
    async fn append_entry(&self, audit_table: &str, entry: &Entry) -> anyhow::Result<EntryId>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query() {
        let query = EntryQuery::new();
        assert!(query.is_empty());
        assert!(query.operations.is_empty());
    }

    #[test]
    fn test_builder_sets_fields() {
        let hash = TransactionHash::generate();
        let query = EntryQuery::new()
            .with_object_id("7")
            .with_transaction_hash(hash.clone())
            .with_operations(vec![OperationKind::Insert])
            .with_page(50, 25);

        assert!(!query.is_empty());
        assert_eq!(query.object_id.as_deref(), Some("7"));
        assert_eq!(query.transaction_hash, Some(hash));
        assert_eq!(query.operations, vec![OperationKind::Insert]);
        assert_eq!(query.offset, Some(50));
        assert_eq!(query.limit, Some(25));
    }

    #[test]
    fn test_date_bounds() {
        let from = Utc::now();
        let query = EntryQuery::new().with_created_from(from);
        assert_eq!(query.created_from, Some(from));
        assert!(query.created_until.is_none());
    }
}
