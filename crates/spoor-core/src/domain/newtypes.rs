//! Domain newtypes with validation
//!
//! This module provides strongly-typed wrappers for the identifiers used
//! throughout the audit trail. Each newtype ensures data validity at
//! construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::AuditError;

// ============================================================================
// Entity identity
// ============================================================================

/// Fully-qualified name of an auditable entity type
///
/// Used as the key of the audited-entity registry and carried on every
/// [`Entry`](super::Entry) to identify which type the record belongs to.
/// The ordering is lexicographic, which gives registries and result
/// mappings a deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an EntityId from a fully-qualified type name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for EntityId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// ============================================================================
// Audit entry identity
// ============================================================================

/// Identifier for audit entries (database row ID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(i64);

impl EntryId {
    /// Create an EntryId from an i64 value
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ============================================================================
// Transaction hash
// ============================================================================

/// Opaque identifier correlating all entries of one logical unit of work
///
/// Every entry written during the same flush/commit carries the same hash,
/// which is what lets the reader reassemble a transaction across entity
/// types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionHash(String);

impl TransactionHash {
    /// Create a TransactionHash from an existing token
    ///
    /// # Errors
    /// Returns `AuditError::InvalidArgument` if the token is empty
    pub fn new(hash: impl Into<String>) -> Result<Self, AuditError> {
        let hash = hash.into();
        if hash.is_empty() {
            return Err(AuditError::invalid_argument(
                "transaction hash cannot be empty",
            ));
        }
        Ok(Self(hash))
    }

    /// Generate a fresh random hash for a new unit of work
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Get the inner string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TransactionHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionHash {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TransactionHash {
    type Error = AuditError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<TransactionHash> for String {
    fn from(hash: TransactionHash) -> Self {
        hash.0
    }
}

// ============================================================================
// Tests
// ============================================================================
