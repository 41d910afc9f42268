//! SQLite implementation of IAuditStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! audit store port defined in spoor-core. It handles entry
//! serialization/deserialization and SQL query construction.
//!
//! ## Type Mapping
//!
//! | Domain Type       | SQL Type | Strategy                                  |
//! |-------------------|----------|-------------------------------------------|
//! | EntryId           | INTEGER  | `AUTOINCREMENT` row id                    |
//! | OperationKind     | TEXT     | snake_case form via `Display` / `FromStr` |
//! | EntityId          | TEXT     | String via `.as_str()` / `EntityId::new()`|
//! | TransactionHash   | TEXT     | String via `.as_str()` / `::new()`        |
//! | diffs (Value)     | TEXT     | serde_json serialization, NULL when unset |
//! | DateTime<Utc>     | TEXT     | RFC 3339 UTC with fixed microsecond width |
//!
//! Timestamps are written with a fixed-width format so that SQL range
//! predicates can compare them lexicographically.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use spoor_core::config::AuditConfiguration;
use spoor_core::domain::{Entry, EntityId, EntryId, OperationKind, TransactionHash};
use spoor_core::ports::{EntryQuery, IAuditStore};

use crate::StoreError;

/// SQLite-based implementation of the audit store port
///
/// Provides append and query access to per-entity audit tables through a
/// connection pool, plus provisioning of those tables from an
/// `AuditConfiguration`.
pub struct SqliteAuditStore {
    pool: SqlitePool,
}

// ============================================================================
// Helper functions
// ============================================================================

/// Validate that a table name is a safe SQL identifier
///
/// Table names are interpolated into statements (identifiers cannot be
/// bound as parameters), so anything outside `[A-Za-z_][A-Za-z0-9_]*` is
/// rejected before SQL construction.
fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if !valid_start || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Format a DateTime<Utc> for storage and comparison
///
/// Fixed microsecond width keeps the TEXT column lexicographically sortable.
fn datetime_to_sql(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a DateTime<Utc> from an RFC 3339 string
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            StoreError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

/// Build the WHERE clause and bind values for a query
///
/// Predicates combine as a conjunction; the returned binds line up with the
/// `?` placeholders in order.
fn build_predicates(query: &EntryQuery) -> (Vec<String>, Vec<String>) {
    let mut clauses = Vec::new();
    let mut binds = Vec::new();

    if let Some(ref object_id) = query.object_id {
        clauses.push("object_id = ?".to_string());
        binds.push(object_id.clone());
    }
    if let Some(ref hash) = query.transaction_hash {
        clauses.push("transaction_hash = ?".to_string());
        binds.push(hash.as_str().to_string());
    }
    if !query.operations.is_empty() {
        let placeholders = vec!["?"; query.operations.len()].join(", ");
        clauses.push(format!("type IN ({})", placeholders));
        binds.extend(query.operations.iter().map(|op| op.as_str().to_string()));
    }
    if let Some(from) = query.created_from {
        clauses.push("created_at >= ?".to_string());
        binds.push(datetime_to_sql(from));
    }
    if let Some(until) = query.created_until {
        clauses.push("created_at <= ?".to_string());
        binds.push(datetime_to_sql(until));
    }

    (clauses, binds)
}

// ============================================================================
// Row mapping
// ============================================================================

/// Reconstruct an Entry from a database row
///
/// Rebuilds the entry through its builder with the stored timestamp (rather
/// than the current time that `Entry::new()` would use).
fn entry_from_row(row: &SqliteRow) -> Result<Entry, StoreError> {
    let id: i64 = row.get("id");
    let kind_str: String = row.get("type");
    let object_class: String = row.get("object_class");
    let object_id: String = row.get("object_id");
    let diffs_str: Option<String> = row.get("diffs");
    let blame_id: Option<String> = row.get("blame_id");
    let blame_user: Option<String> = row.get("blame_user");
    let ip: Option<String> = row.get("ip");
    let hash_str: Option<String> = row.get("transaction_hash");
    let created_at_str: String = row.get("created_at");

    let kind = kind_str.parse::<OperationKind>().map_err(|e| {
        StoreError::SerializationError(format!("Invalid operation kind '{}': {}", kind_str, e))
    })?;

    let created_at = parse_datetime(&created_at_str)?;

    let diffs = match diffs_str {
        Some(ref s) if !s.is_empty() => serde_json::from_str(s).map_err(|e| {
            StoreError::SerializationError(format!("Invalid diffs JSON: {}", e))
        })?,
        _ => serde_json::Value::Null,
    };

    let mut entry = Entry::new(kind, EntityId::new(object_class), object_id)
        .with_id(EntryId::new(id))
        .with_diffs(diffs)
        .with_created_at(created_at);

    if let Some(hash) = hash_str.filter(|s| !s.is_empty()) {
        let hash = TransactionHash::new(hash).map_err(|e| {
            StoreError::SerializationError(format!("Invalid transaction hash: {}", e))
        })?;
        entry = entry.with_transaction_hash(hash);
    }
    if let Some(blame_id) = blame_id {
        entry = entry.with_blame_id(blame_id);
    }
    if let Some(blame_user) = blame_user {
        entry = entry.with_blame_user(blame_user);
    }
    if let Some(ip) = ip {
        entry = entry.with_ip(ip);
    }

    Ok(entry)
}

// ============================================================================
// SqliteAuditStore
// ============================================================================

impl SqliteAuditStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the audit table (and its indexes) if it does not exist
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidIdentifier` for unsafe table names and
    /// `StoreError::QueryFailed` when the DDL cannot be executed.
    pub async fn ensure_audit_table(&self, audit_table: &str) -> Result<(), StoreError> {
        validate_identifier(audit_table)?;

        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {t} (\
                 id INTEGER PRIMARY KEY AUTOINCREMENT,\
                 type TEXT NOT NULL,\
                 object_class TEXT NOT NULL,\
                 object_id TEXT NOT NULL,\
                 diffs TEXT,\
                 blame_id TEXT,\
                 blame_user TEXT,\
                 ip TEXT,\
                 transaction_hash TEXT,\
                 created_at TEXT NOT NULL\
             );\
             CREATE INDEX IF NOT EXISTS idx_{t}_type ON {t}(type);\
             CREATE INDEX IF NOT EXISTS idx_{t}_object_id ON {t}(object_id);\
             CREATE INDEX IF NOT EXISTS idx_{t}_transaction_hash ON {t}(transaction_hash);\
             CREATE INDEX IF NOT EXISTS idx_{t}_created_at ON {t}(created_at);",
            t = audit_table
        );

        sqlx::raw_sql(&ddl).execute(&self.pool).await?;

        tracing::debug!(table = %audit_table, "Audit table ensured");
        Ok(())
    }

    /// Provisions audit tables for every audited entity in the configuration
    ///
    /// Intended for deployment/startup and test setup; the reader and
    /// recorder never create tables themselves.
    pub async fn provision(&self, configuration: &AuditConfiguration) -> Result<(), StoreError> {
        for (entity, audited) in configuration.audited_entities() {
            let table = configuration.audit_table_name_for(audited.table_name());
            self.ensure_audit_table(&table).await?;
            tracing::trace!(entity = %entity, table = %table, "Provisioned audit table");
        }
        Ok(())
    }

    /// Queries entries matching the given predicates, newest first
    pub async fn query(
        &self,
        audit_table: &str,
        query: &EntryQuery,
    ) -> Result<Vec<Entry>, StoreError> {
        validate_identifier(audit_table)?;

        let (clauses, binds) = build_predicates(query);
        let mut sql = format!("SELECT * FROM {}", audit_table);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id DESC");
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = query.offset {
            // LIMIT is required for OFFSET in SQLite; -1 means unlimited
            if query.limit.is_none() {
                sql.push_str(" LIMIT -1");
            }
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        let mut stmt = sqlx::query(&sql);
        for bind in &binds {
            stmt = stmt.bind(bind.as_str());
        }
        let rows = stmt.fetch_all(&self.pool).await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(entry_from_row(row)?);
        }

        Ok(entries)
    }

    /// Counts entries matching the given predicates, ignoring offset/limit
    pub async fn count(&self, audit_table: &str, query: &EntryQuery) -> Result<u64, StoreError> {
        validate_identifier(audit_table)?;

        let (clauses, binds) = build_predicates(query);
        let mut sql = format!("SELECT COUNT(*) FROM {}", audit_table);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut stmt = sqlx::query(&sql);
        for bind in &binds {
            stmt = stmt.bind(bind.as_str());
        }
        let row = stmt.fetch_one(&self.pool).await?;
        let count: i64 = row.get(0);

        Ok(count as u64)
    }

    /// Appends an entry, returning the assigned row id
    pub async fn append(&self, audit_table: &str, entry: &Entry) -> Result<EntryId, StoreError> {
        validate_identifier(audit_table)?;

        let diffs = match entry.diffs() {
            serde_json::Value::Null => None,
            value => Some(serde_json::to_string(value).map_err(|e| {
                StoreError::SerializationError(format!("Failed to serialize diffs: {}", e))
            })?),
        };
        let hash = entry.transaction_hash().map(|h| h.as_str().to_string());
        let created_at = datetime_to_sql(entry.created_at());

        let sql = format!(
            "INSERT INTO {} \
             (type, object_class, object_id, diffs, blame_id, blame_user, ip, \
              transaction_hash, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            audit_table
        );

        let result = sqlx::query(&sql)
            .bind(entry.kind().as_str())
            .bind(entry.entity().as_str())
            .bind(entry.object_id())
            .bind(&diffs)
            .bind(entry.blame_id())
            .bind(entry.blame_user())
            .bind(entry.ip())
            .bind(&hash)
            .bind(&created_at)
            .execute(&self.pool)
            .await?;

        let id = EntryId::new(result.last_insert_rowid());

        tracing::trace!(
            table = %audit_table,
            kind = %entry.kind(),
            object_id = %entry.object_id(),
            "Appended audit entry"
        );
        Ok(id)
    }
}

#[async_trait::async_trait]
impl IAuditStore for SqliteAuditStore {
    async fn query_entries(
        &self,
        audit_table: &str,
        query: &EntryQuery,
    ) -> anyhow::Result<Vec<Entry>> {
        Ok(self.query(audit_table, query).await?)
    }

    async fn count_entries(&self, audit_table: &str, query: &EntryQuery) -> anyhow::Result<u64> {
        Ok(self.count(audit_table, query).await?)
    }

    async fn append_entry(&self, audit_table: &str, entry: &Entry) -> anyhow::Result<EntryId> {
        Ok(self.append(audit_table, entry).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_identifier_accepts_safe_names() {
        assert!(validate_identifier("post_audit").is_ok());
        assert!(validate_identifier("_internal").is_ok());
        assert!(validate_identifier("Table2").is_ok());
    }

    #[test]
    fn test_validate_identifier_rejects_unsafe_names() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("post-audit").is_err());
        assert!(validate_identifier("post audit").is_err());
        assert!(validate_identifier("post;DROP TABLE post").is_err());
    }

    #[test]
    fn test_datetime_roundtrip() {
        let now = Utc::now();
        let stored = datetime_to_sql(now);
        let parsed = parse_datetime(&stored).unwrap();
        // Storage keeps microsecond precision
        assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
    }

    #[test]
    fn test_datetime_format_is_sortable() {
        let earlier = parse_datetime("2026-03-01T10:00:00Z").unwrap();
        let later = parse_datetime("2026-03-01T10:00:01Z").unwrap();
        assert!(datetime_to_sql(earlier) < datetime_to_sql(later));
    }

    #[test]
    fn test_build_predicates_conjunction() {
        let query = EntryQuery::new()
            .with_object_id("42")
            .with_operations(vec![OperationKind::Insert, OperationKind::Update]);
        let (clauses, binds) = build_predicates(&query);

        assert_eq!(
            clauses,
            vec!["object_id = ?".to_string(), "type IN (?, ?)".to_string()]
        );
        assert_eq!(binds, vec!["42", "insert", "update"]);
    }

    #[test]
    fn test_build_predicates_empty_query() {
        let (clauses, binds) = build_predicates(&EntryQuery::new());
        assert!(clauses.is_empty());
        assert!(binds.is_empty());
    }
}
