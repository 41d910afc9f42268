//! Domain error types
//!
//! This module defines the error taxonomy surfaced by the audit reader and
//! recorder. Storage failures are adapter-specific and pass through
//! unchanged inside the `Storage` variant; they are never retried or masked.

use thiserror::Error;

use super::newtypes::EntityId;

/// Errors that can occur in audit operations
#[derive(Debug, Error)]
pub enum AuditError {
    /// A query parameter failed validation before any storage access
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested entity is not registered for auditing (or disabled)
    #[error("Entity is not audited: {0}")]
    UnauditedEntity(EntityId),

    /// A storage-layer failure, propagated unchanged from the adapter
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AuditError {
    /// Creates an `InvalidArgument` error from any message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        AuditError::InvalidArgument(message.into())
    }

    /// Returns true for validation failures raised before storage access
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, AuditError::InvalidArgument(_))
    }

    /// Returns true when the entity was missing from the audit registry
    pub fn is_unaudited_entity(&self) -> bool {
        matches!(self, AuditError::UnauditedEntity(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AuditError::invalid_argument("page must be >= 1");
        assert_eq!(err.to_string(), "Invalid argument: page must be >= 1");

        let err = AuditError::UnauditedEntity(EntityId::new("acme::model::Draft"));
        assert_eq!(err.to_string(), "Entity is not audited: acme::model::Draft");
    }

    #[test]
    fn test_error_predicates() {
        let err = AuditError::invalid_argument("page size must be >= 1");
        assert!(err.is_invalid_argument());
        assert!(!err.is_unaudited_entity());

        let err = AuditError::UnauditedEntity(EntityId::new("acme::model::Draft"));
        assert!(err.is_unaudited_entity());
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn test_storage_error_passes_through() {
        let source = anyhow::anyhow!("database is locked");
        let err = AuditError::from(source);
        assert_eq!(err.to_string(), "database is locked");
    }
}
