//! Configuration module for Spoor.
//!
//! Provides the audited-entity registry and storage naming conventions. The
//! configuration is an explicitly constructed, immutable value injected into
//! the reader and recorder; there is no process-wide singleton. Construction
//! goes through [`AuditConfigurationBuilder`]; after `build()` the registry
//! is read-only.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::domain::EntityId;

/// Suffix appended to an entity's table name to form its audit table name.
pub const DEFAULT_TABLE_SUFFIX: &str = "_audit";

/// Per-entity audit policy.
///
/// A registered entity without a policy is audited with defaults; a policy
/// exists to disable auditing for the entity or to exclude individual
/// fields from recorded diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityPolicy {
    /// Whether auditing is enabled for the entity.
    pub enabled: bool,
    /// Fields excluded from diff computation (timestamps, derived columns).
    pub ignored_fields: BTreeSet<String>,
}

impl Default for EntityPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            ignored_fields: BTreeSet::new(),
        }
    }
}

impl EntityPolicy {
    /// A policy that disables auditing for the entity.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Adds a field to exclude from diff computation.
    #[must_use]
    pub fn with_ignored_field(mut self, field: impl Into<String>) -> Self {
        self.ignored_fields.insert(field.into());
        self
    }
}

/// Registry record for one audited entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditedEntity {
    /// Base storage table name of the entity itself.
    table_name: String,
    /// Optional policy; `None` means audited with defaults.
    policy: Option<EntityPolicy>,
}

impl AuditedEntity {
    /// Returns the entity's base table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Returns the policy, if one was registered.
    pub fn policy(&self) -> Option<&EntityPolicy> {
        self.policy.as_ref()
    }

    /// Returns true unless a policy explicitly disables auditing.
    pub fn is_enabled(&self) -> bool {
        self.policy.as_ref().map_or(true, |p| p.enabled)
    }

    /// Returns true if the field is excluded from diff computation.
    pub fn ignores_field(&self, field: &str) -> bool {
        self.policy
            .as_ref()
            .is_some_and(|p| p.ignored_fields.contains(field))
    }
}

/// Immutable audit configuration: which entities are audited and how their
/// audit tables are named.
///
/// # Example
///
/// ```
/// use spoor_core::config::AuditConfiguration;
/// use spoor_core::domain::EntityId;
///
/// let config = AuditConfiguration::builder()
///     .register(EntityId::new("acme::model::Post"), "post")
///     .build();
///
/// let post = EntityId::new("acme::model::Post");
/// assert!(config.is_audited(&post));
/// assert_eq!(config.audit_table_name(&post).as_deref(), Some("post_audit"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditConfiguration {
    table_prefix: String,
    table_suffix: String,
    entities: BTreeMap<EntityId, AuditedEntity>,
}

impl AuditConfiguration {
    /// Creates a builder with default naming (no prefix, `_audit` suffix).
    #[must_use]
    pub fn builder() -> AuditConfigurationBuilder {
        AuditConfigurationBuilder::new()
    }

    /// Returns the configured audit table prefix.
    pub fn table_prefix(&self) -> &str {
        &self.table_prefix
    }

    /// Returns the configured audit table suffix.
    pub fn table_suffix(&self) -> &str {
        &self.table_suffix
    }

    /// Returns true if the entity is registered and not disabled by policy.
    pub fn is_audited(&self, entity: &EntityId) -> bool {
        self.entities.get(entity).is_some_and(|e| e.is_enabled())
    }

    /// Returns the registry record for an audited entity.
    ///
    /// `None` when the entity is unregistered or disabled by policy.
    pub fn entity(&self, entity: &EntityId) -> Option<&AuditedEntity> {
        self.entities.get(entity).filter(|e| e.is_enabled())
    }

    /// Returns the entity's base table name, if it is audited.
    pub fn table_name(&self, entity: &EntityId) -> Option<&str> {
        self.entity(entity).map(AuditedEntity::table_name)
    }

    /// Returns the entity's audit table name, if it is audited.
    pub fn audit_table_name(&self, entity: &EntityId) -> Option<String> {
        self.table_name(entity)
            .map(|table| self.audit_table_name_for(table))
    }

    /// Applies the naming convention to a base table name.
    pub fn audit_table_name_for(&self, table_name: &str) -> String {
        format!("{}{}{}", self.table_prefix, table_name, self.table_suffix)
    }

    /// Iterates all audited entities in sorted key order.
    ///
    /// Entities disabled by policy are skipped.
    pub fn audited_entities(&self) -> impl Iterator<Item = (&EntityId, &AuditedEntity)> {
        self.entities.iter().filter(|(_, e)| e.is_enabled())
    }
}

/// Builder for constructing an [`AuditConfiguration`] programmatically.
#[derive(Debug, Clone)]
pub struct AuditConfigurationBuilder {
    table_prefix: String,
    table_suffix: String,
    entities: BTreeMap<EntityId, AuditedEntity>,
}

impl AuditConfigurationBuilder {
    /// Creates a new builder with default naming conventions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table_prefix: String::new(),
            table_suffix: DEFAULT_TABLE_SUFFIX.to_string(),
            entities: BTreeMap::new(),
        }
    }

    /// Sets the audit table prefix.
    #[must_use]
    pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }

    /// Sets the audit table suffix.
    #[must_use]
    pub fn table_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.table_suffix = suffix.into();
        self
    }

    /// Registers an entity for auditing with default policy.
    ///
    /// `table_name` is the entity's own storage table; the audit table name
    /// is derived from it via the configured prefix/suffix. Registering the
    /// same entity again replaces the previous record.
    #[must_use]
    pub fn register(self, entity: EntityId, table_name: impl Into<String>) -> Self {
        self.register_entry(entity, table_name, None)
    }

    /// Registers an entity for auditing with an explicit policy.
    #[must_use]
    pub fn register_with_policy(
        self,
        entity: EntityId,
        table_name: impl Into<String>,
        policy: EntityPolicy,
    ) -> Self {
        self.register_entry(entity, table_name, Some(policy))
    }

    fn register_entry(
        mut self,
        entity: EntityId,
        table_name: impl Into<String>,
        policy: Option<EntityPolicy>,
    ) -> Self {
        self.entities.insert(
            entity,
            AuditedEntity {
                table_name: table_name.into(),
                policy,
            },
        );
        self
    }

    /// Consume the builder and return the finished [`AuditConfiguration`].
    #[must_use]
    pub fn build(self) -> AuditConfiguration {
        AuditConfiguration {
            table_prefix: self.table_prefix,
            table_suffix: self.table_suffix,
            entities: self.entities,
        }
    }
}

impl Default for AuditConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
