//! Audit entry domain entities
//!
//! This module defines the immutable audit record written for every tracked
//! change, together with the enumeration of operation kinds the trail
//! distinguishes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::newtypes::{EntityId, EntryId, TransactionHash};

/// Operation kinds that can be recorded in the audit trail
///
/// `Associate` and `Dissociate` represent the creation/removal of a
/// relationship link between two entities, distinct from field-value
/// updates on either side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// A new entity instance was persisted
    Insert,
    /// Field values of an existing entity changed
    Update,
    /// An entity instance was removed
    Remove,
    /// A relationship link between two entities was created
    Associate,
    /// A relationship link between two entities was removed
    Dissociate,
}

impl OperationKind {
    /// All operation kinds, in declaration order
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Insert,
        OperationKind::Update,
        OperationKind::Remove,
        OperationKind::Associate,
        OperationKind::Dissociate,
    ];

    /// The stored (snake_case) form of this kind
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Remove => "remove",
            OperationKind::Associate => "associate",
            OperationKind::Dissociate => "dissociate",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<OperationKind> for String {
    fn from(kind: OperationKind) -> Self {
        kind.as_str().to_string()
    }
}

/// Error returned when a token does not name an operation kind
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown operation kind: {0}")]
pub struct UnknownOperation(pub String);

impl std::str::FromStr for OperationKind {
    type Err = UnknownOperation;

    /// Parses the stored form, accepting any ASCII case (`"INSERT"` and
    /// `"insert"` both resolve)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| s.eq_ignore_ascii_case(kind.as_str()))
            .ok_or_else(|| UnknownOperation(s.to_string()))
    }
}

/// One immutable audit record describing a single change event
///
/// Entries are created by the change-capture side at commit time and are
/// never mutated afterwards; a given `(entity, object_id)` pair accumulates
/// many entries ordered by creation. The `id` field is assigned by the
/// database when the entry is persisted.
///
/// # Example
///
/// ```
/// use spoor_core::domain::{Entry, EntityId, OperationKind};
///
/// let entry = Entry::new(
///     OperationKind::Insert,
///     EntityId::new("acme::model::Post"),
///     "1",
/// );
/// assert!(entry.id().is_none()); // ID assigned on persist
/// assert_eq!(entry.object_id(), "1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique identifier for this entry (assigned by the database)
    id: Option<EntryId>,
    /// The kind of operation that was recorded
    kind: OperationKind,
    /// The audited entity type this record belongs to
    entity: EntityId,
    /// Identity of the audited instance, in string form (UUIDs or integers)
    object_id: String,
    /// Field-level change payload (old/new values per attribute)
    diffs: Value,
    /// Correlates all entries written during one unit of work
    transaction_hash: Option<TransactionHash>,
    /// Identifier of the acting user, if known
    blame_id: Option<String>,
    /// Display name of the acting user, if known
    blame_user: Option<String>,
    /// Client address the change originated from, if known
    ip: Option<String>,
    /// When the record was created
    created_at: DateTime<Utc>,
}

impl Entry {
    /// Creates a new entry with the required fields
    ///
    /// The `id` field is set to `None` and will be assigned by the database
    /// when the entry is persisted. `created_at` defaults to now and can be
    /// overridden with [`Entry::with_created_at`] (the row mapper does this
    /// to preserve stored timestamps).
    pub fn new(kind: OperationKind, entity: EntityId, object_id: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            entity,
            object_id: object_id.into(),
            diffs: Value::Null,
            transaction_hash: None,
            blame_id: None,
            blame_user: None,
            ip: None,
            created_at: Utc::now(),
        }
    }

    /// Returns the entry ID (None if not yet persisted)
    pub fn id(&self) -> Option<EntryId> {
        self.id
    }

    /// Returns the operation kind
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Returns the audited entity type
    pub fn entity(&self) -> &EntityId {
        &self.entity
    }

    /// Returns the audited instance identity
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Returns the field-level change payload
    pub fn diffs(&self) -> &Value {
        &self.diffs
    }

    /// Returns the transaction hash if present
    pub fn transaction_hash(&self) -> Option<&TransactionHash> {
        self.transaction_hash.as_ref()
    }

    /// Returns the acting user's identifier if present
    pub fn blame_id(&self) -> Option<&str> {
        self.blame_id.as_deref()
    }

    /// Returns the acting user's display name if present
    pub fn blame_user(&self) -> Option<&str> {
        self.blame_user.as_deref()
    }

    /// Returns the originating client address if present
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    /// Returns when the record was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Sets the ID for this entry (typically called after database insert)
    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the field-level change payload
    pub fn with_diffs(mut self, diffs: Value) -> Self {
        self.diffs = diffs;
        self
    }

    /// Sets the transaction hash
    pub fn with_transaction_hash(mut self, hash: TransactionHash) -> Self {
        self.transaction_hash = Some(hash);
        self
    }

    /// Sets the acting user's identifier
    pub fn with_blame_id(mut self, blame_id: impl Into<String>) -> Self {
        self.blame_id = Some(blame_id.into());
        self
    }

    /// Sets the acting user's display name
    pub fn with_blame_user(mut self, blame_user: impl Into<String>) -> Self {
        self.blame_user = Some(blame_user.into());
        self
    }

    /// Sets the originating client address
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Sets the creation timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
