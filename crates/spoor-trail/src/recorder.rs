//! AuditRecorder - change capture service
//!
//! Records audit entries from entity snapshots supplied by the persistence
//! layer (or application code). The recorder computes field-level diffs,
//! stamps every entry with the unit of work's transaction hash and actor
//! context, and appends through the audit store port. Entities that are not
//! registered for auditing are skipped silently; storage failures propagate
//! to the caller, because an audit trail that silently loses records is not
//! a trail.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use spoor_core::config::{AuditConfiguration, AuditedEntity};
use spoor_core::domain::{AuditError, Entry, EntityId, EntryId, OperationKind, TransactionHash};
use spoor_core::ports::IAuditStore;

/// Actor and transaction context for one unit of work
///
/// Every entry recorded with the same context shares its transaction hash,
/// which is what groups a flush/commit's changes together for the reader.
///
/// # Example
///
/// ```
/// use spoor_trail::ChangeContext;
///
/// let ctx = ChangeContext::new()
///     .with_blame_id("17")
///     .with_blame_user("john.doe")
///     .with_ip("10.0.0.1");
/// assert!(!ctx.transaction_hash().as_str().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct ChangeContext {
    transaction_hash: TransactionHash,
    blame_id: Option<String>,
    blame_user: Option<String>,
    ip: Option<String>,
}

impl ChangeContext {
    /// Creates a context with a freshly generated transaction hash
    #[must_use]
    pub fn new() -> Self {
        Self {
            transaction_hash: TransactionHash::generate(),
            blame_id: None,
            blame_user: None,
            ip: None,
        }
    }

    /// Replaces the generated transaction hash with an explicit one
    #[must_use]
    pub fn with_transaction_hash(mut self, hash: TransactionHash) -> Self {
        self.transaction_hash = hash;
        self
    }

    /// Sets the acting user's identifier
    #[must_use]
    pub fn with_blame_id(mut self, blame_id: impl Into<String>) -> Self {
        self.blame_id = Some(blame_id.into());
        self
    }

    /// Sets the acting user's display name
    #[must_use]
    pub fn with_blame_user(mut self, blame_user: impl Into<String>) -> Self {
        self.blame_user = Some(blame_user.into());
        self
    }

    /// Sets the originating client address
    #[must_use]
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = Some(ip.into());
        self
    }

    /// Returns the context's transaction hash
    pub fn transaction_hash(&self) -> &TransactionHash {
        &self.transaction_hash
    }
}

impl Default for ChangeContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Records change history into per-entity audit tables
pub struct AuditRecorder {
    configuration: AuditConfiguration,
    store: Arc<dyn IAuditStore>,
}

impl AuditRecorder {
    /// Creates a recorder for the given configuration and store
    pub fn new(configuration: AuditConfiguration, store: Arc<dyn IAuditStore>) -> Self {
        Self {
            configuration,
            store,
        }
    }

    /// Returns the configuration in effect
    pub fn configuration(&self) -> &AuditConfiguration {
        &self.configuration
    }

    /// Records the insertion of a new entity instance
    ///
    /// `new_values` is the persisted field map; each field is recorded as
    /// `{"new": value}`. Returns `None` when the entity is not audited.
    pub async fn record_insert(
        &self,
        entity: &EntityId,
        object_id: &str,
        new_values: &Value,
        ctx: &ChangeContext,
    ) -> Result<Option<EntryId>, AuditError> {
        let Some(audited) = self.configuration.entity(entity) else {
            return Ok(self.skip(entity));
        };

        let diffs = insert_diffs(new_values, audited);
        let id = self
            .append(audited, OperationKind::Insert, entity, object_id, diffs, ctx)
            .await?;
        Ok(Some(id))
    }

    /// Records a field-value update of an existing entity instance
    ///
    /// Only fields whose value actually changed between `old_values` and
    /// `new_values` are recorded, as `{"old": a, "new": b}`; fields ignored
    /// by the entity's policy never appear. Returns `None` when nothing
    /// changed or the entity is not audited.
    pub async fn record_update(
        &self,
        entity: &EntityId,
        object_id: &str,
        old_values: &Value,
        new_values: &Value,
        ctx: &ChangeContext,
    ) -> Result<Option<EntryId>, AuditError> {
        let Some(audited) = self.configuration.entity(entity) else {
            return Ok(self.skip(entity));
        };

        let diffs = update_diffs(old_values, new_values, audited);
        if diffs.is_null() {
            tracing::trace!(entity = %entity, object_id, "No field changes, skipping update entry");
            return Ok(None);
        }

        let id = self
            .append(audited, OperationKind::Update, entity, object_id, diffs, ctx)
            .await?;
        Ok(Some(id))
    }

    /// Records the removal of an entity instance
    ///
    /// `old_values` is the last persisted field map; each field is recorded
    /// as `{"old": value}`. Returns `None` when the entity is not audited.
    pub async fn record_remove(
        &self,
        entity: &EntityId,
        object_id: &str,
        old_values: &Value,
        ctx: &ChangeContext,
    ) -> Result<Option<EntryId>, AuditError> {
        let Some(audited) = self.configuration.entity(entity) else {
            return Ok(self.skip(entity));
        };

        let diffs = remove_diffs(old_values, audited);
        let id = self
            .append(audited, OperationKind::Remove, entity, object_id, diffs, ctx)
            .await?;
        Ok(Some(id))
    }

    /// Records the creation of a relationship link
    ///
    /// The entry is written on the source entity's trail; the diff payload
    /// carries the relation field and a summary of the target.
    pub async fn record_associate(
        &self,
        entity: &EntityId,
        object_id: &str,
        field: &str,
        target_entity: &EntityId,
        target_id: &str,
        ctx: &ChangeContext,
    ) -> Result<Option<EntryId>, AuditError> {
        self.record_relation(
            OperationKind::Associate,
            entity,
            object_id,
            field,
            target_entity,
            target_id,
            ctx,
        )
        .await
    }

    /// Records the removal of a relationship link
    pub async fn record_dissociate(
        &self,
        entity: &EntityId,
        object_id: &str,
        field: &str,
        target_entity: &EntityId,
        target_id: &str,
        ctx: &ChangeContext,
    ) -> Result<Option<EntryId>, AuditError> {
        self.record_relation(
            OperationKind::Dissociate,
            entity,
            object_id,
            field,
            target_entity,
            target_id,
            ctx,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_relation(
        &self,
        kind: OperationKind,
        entity: &EntityId,
        object_id: &str,
        field: &str,
        target_entity: &EntityId,
        target_id: &str,
        ctx: &ChangeContext,
    ) -> Result<Option<EntryId>, AuditError> {
        let Some(audited) = self.configuration.entity(entity) else {
            return Ok(self.skip(entity));
        };

        let diffs = json!({
            "field": field,
            "target": {
                "class": target_entity.as_str(),
                "id": target_id,
            },
        });
        let id = self
            .append(audited, kind, entity, object_id, diffs, ctx)
            .await?;
        Ok(Some(id))
    }

    fn skip(&self, entity: &EntityId) -> Option<EntryId> {
        tracing::trace!(entity = %entity, "Entity not audited, skipping");
        None
    }

    async fn append(
        &self,
        audited: &AuditedEntity,
        kind: OperationKind,
        entity: &EntityId,
        object_id: &str,
        diffs: Value,
        ctx: &ChangeContext,
    ) -> Result<EntryId, AuditError> {
        let table = self.configuration.audit_table_name_for(audited.table_name());

        let mut entry = Entry::new(kind, entity.clone(), object_id)
            .with_diffs(diffs)
            .with_transaction_hash(ctx.transaction_hash.clone());
        if let Some(ref blame_id) = ctx.blame_id {
            entry = entry.with_blame_id(blame_id.clone());
        }
        if let Some(ref blame_user) = ctx.blame_user {
            entry = entry.with_blame_user(blame_user.clone());
        }
        if let Some(ref ip) = ctx.ip {
            entry = entry.with_ip(ip.clone());
        }

        let id = self.store.append_entry(&table, &entry).await?;

        tracing::debug!(
            entity = %entity,
            object_id,
            kind = %kind,
            transaction_hash = %ctx.transaction_hash,
            "Recorded audit entry"
        );
        Ok(id)
    }
}

// ============================================================================
// Diff computation
// ============================================================================

/// Fields of a snapshot, or nothing when the snapshot is not an object
fn object_fields(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

/// Per-field `{"new": value}` payload for an insert
fn insert_diffs(new_values: &Value, audited: &AuditedEntity) -> Value {
    let mut diffs = Map::new();
    if let Some(fields) = object_fields(new_values) {
        for (field, value) in fields {
            if !audited.ignores_field(field) {
                diffs.insert(field.clone(), json!({ "new": value }));
            }
        }
    }
    Value::Object(diffs)
}

/// Per-field `{"old": value}` payload for a removal
fn remove_diffs(old_values: &Value, audited: &AuditedEntity) -> Value {
    let mut diffs = Map::new();
    if let Some(fields) = object_fields(old_values) {
        for (field, value) in fields {
            if !audited.ignores_field(field) {
                diffs.insert(field.clone(), json!({ "old": value }));
            }
        }
    }
    Value::Object(diffs)
}

/// Per-field `{"old": a, "new": b}` payload for changed fields only
///
/// Fields present in one snapshot but not the other diff against `null`.
/// Returns `Value::Null` when no auditable field changed.
fn update_diffs(old_values: &Value, new_values: &Value, audited: &AuditedEntity) -> Value {
    let empty = Map::new();
    let old = object_fields(old_values).unwrap_or(&empty);
    let new = object_fields(new_values).unwrap_or(&empty);

    let mut fields: Vec<&String> = old.keys().chain(new.keys()).collect();
    fields.sort();
    fields.dedup();

    let mut diffs = Map::new();
    for field in fields {
        if audited.ignores_field(field) {
            continue;
        }
        let old_value = old.get(field).unwrap_or(&Value::Null);
        let new_value = new.get(field).unwrap_or(&Value::Null);
        if old_value != new_value {
            diffs.insert(field.clone(), json!({ "old": old_value, "new": new_value }));
        }
    }

    if diffs.is_empty() {
        Value::Null
    } else {
        Value::Object(diffs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use spoor_core::config::EntityPolicy;
    use spoor_core::ports::EntryQuery;

    /// In-memory mock store that records appended entries per table
    struct MockStore {
        appended: Mutex<Vec<(String, Entry)>>,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                appended: Mutex::new(Vec::new()),
            }
        }

        fn appended(&self) -> Vec<(String, Entry)> {
            self.appended.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl IAuditStore for MockStore {
        async fn query_entries(
            &self,
            _audit_table: &str,
            _query: &EntryQuery,
        ) -> anyhow::Result<Vec<Entry>> {
            Ok(vec![])
        }

        async fn count_entries(
            &self,
            _audit_table: &str,
            _query: &EntryQuery,
        ) -> anyhow::Result<u64> {
            Ok(0)
        }

        async fn append_entry(
            &self,
            audit_table: &str,
            entry: &Entry,
        ) -> anyhow::Result<EntryId> {
            let mut appended = self.appended.lock().unwrap();
            let id = EntryId::new(appended.len() as i64 + 1);
            appended.push((audit_table.to_string(), entry.clone()));
            Ok(id)
        }
    }

    fn post() -> EntityId {
        EntityId::new("acme::model::Post")
    }

    fn tag() -> EntityId {
        EntityId::new("acme::model::Tag")
    }

    fn recorder_with_mock() -> (AuditRecorder, Arc<MockStore>) {
        let store = Arc::new(MockStore::new());
        let configuration = AuditConfiguration::builder()
            .register(post(), "post")
            .register_with_policy(
                tag(),
                "tag",
                EntityPolicy::default().with_ignored_field("updated_at"),
            )
            .build();
        (AuditRecorder::new(configuration, store.clone()), store)
    }

    #[tokio::test]
    async fn test_record_insert() {
        let (recorder, store) = recorder_with_mock();
        let ctx = ChangeContext::new().with_blame_user("john.doe");

        let id = recorder
            .record_insert(
                &post(),
                "1",
                &json!({"title": "Hello", "body": "World"}),
                &ctx,
            )
            .await
            .unwrap();
        assert!(id.is_some());

        let appended = store.appended();
        assert_eq!(appended.len(), 1);

        let (table, entry) = &appended[0];
        assert_eq!(table, "post_audit");
        assert_eq!(entry.kind(), OperationKind::Insert);
        assert_eq!(entry.object_id(), "1");
        assert_eq!(entry.transaction_hash(), Some(ctx.transaction_hash()));
        assert_eq!(entry.blame_user(), Some("john.doe"));
        assert_eq!(
            *entry.diffs(),
            json!({"title": {"new": "Hello"}, "body": {"new": "World"}})
        );
    }

    #[tokio::test]
    async fn test_record_update_keeps_changed_fields_only() {
        let (recorder, store) = recorder_with_mock();
        let ctx = ChangeContext::new();

        recorder
            .record_update(
                &post(),
                "1",
                &json!({"title": "Hello", "body": "World"}),
                &json!({"title": "Hi", "body": "World"}),
                &ctx,
            )
            .await
            .unwrap();

        let appended = store.appended();
        let (_, entry) = &appended[0];
        assert_eq!(entry.kind(), OperationKind::Update);
        assert_eq!(
            *entry.diffs(),
            json!({"title": {"old": "Hello", "new": "Hi"}})
        );
    }

    #[tokio::test]
    async fn test_record_update_without_changes_records_nothing() {
        let (recorder, store) = recorder_with_mock();
        let ctx = ChangeContext::new();

        let snapshot = json!({"title": "Hello"});
        let id = recorder
            .record_update(&post(), "1", &snapshot, &snapshot, &ctx)
            .await
            .unwrap();

        assert!(id.is_none());
        assert!(store.appended().is_empty());
    }

    #[tokio::test]
    async fn test_record_update_ignores_policy_fields() {
        let (recorder, store) = recorder_with_mock();
        let ctx = ChangeContext::new();

        // Only the ignored field changed
        let id = recorder
            .record_update(
                &tag(),
                "4",
                &json!({"label": "rust", "updated_at": "2026-01-01"}),
                &json!({"label": "rust", "updated_at": "2026-02-01"}),
                &ctx,
            )
            .await
            .unwrap();

        assert!(id.is_none());
        assert!(store.appended().is_empty());
    }

    #[tokio::test]
    async fn test_record_remove() {
        let (recorder, store) = recorder_with_mock();
        let ctx = ChangeContext::new();

        recorder
            .record_remove(&post(), "1", &json!({"title": "Hello"}), &ctx)
            .await
            .unwrap();

        let appended = store.appended();
        let (_, entry) = &appended[0];
        assert_eq!(entry.kind(), OperationKind::Remove);
        assert_eq!(*entry.diffs(), json!({"title": {"old": "Hello"}}));
    }

    #[tokio::test]
    async fn test_record_associate_and_dissociate() {
        let (recorder, store) = recorder_with_mock();
        let ctx = ChangeContext::new();

        recorder
            .record_associate(&post(), "1", "tags", &tag(), "4", &ctx)
            .await
            .unwrap();
        recorder
            .record_dissociate(&post(), "1", "tags", &tag(), "4", &ctx)
            .await
            .unwrap();

        let appended = store.appended();
        assert_eq!(appended.len(), 2);
        assert_eq!(appended[0].1.kind(), OperationKind::Associate);
        assert_eq!(appended[1].1.kind(), OperationKind::Dissociate);
        assert_eq!(
            *appended[0].1.diffs(),
            json!({"field": "tags", "target": {"class": "acme::model::Tag", "id": "4"}})
        );
    }

    #[tokio::test]
    async fn test_unaudited_entity_is_skipped_silently() {
        let (recorder, store) = recorder_with_mock();
        let ctx = ChangeContext::new();
        let draft = EntityId::new("acme::model::Draft");

        let id = recorder
            .record_insert(&draft, "1", &json!({"title": "x"}), &ctx)
            .await
            .unwrap();

        assert!(id.is_none());
        assert!(store.appended().is_empty());
    }

    #[tokio::test]
    async fn test_entries_of_one_context_share_transaction_hash() {
        let (recorder, store) = recorder_with_mock();
        let ctx = ChangeContext::new();

        recorder
            .record_insert(&post(), "1", &json!({"title": "a"}), &ctx)
            .await
            .unwrap();
        recorder
            .record_insert(&post(), "2", &json!({"title": "b"}), &ctx)
            .await
            .unwrap();

        let appended = store.appended();
        assert_eq!(
            appended[0].1.transaction_hash(),
            appended[1].1.transaction_hash()
        );
    }

    #[test]
    fn test_update_diffs_handles_added_and_removed_fields() {
        let audited_config = AuditConfiguration::builder().register(post(), "post").build();
        let audited = audited_config.entity(&post()).unwrap();

        let diffs = update_diffs(
            &json!({"title": "Hello", "legacy": 1}),
            &json!({"title": "Hello", "subtitle": "World"}),
            audited,
        );

        assert_eq!(
            diffs,
            json!({
                "legacy": {"old": 1, "new": null},
                "subtitle": {"old": null, "new": "World"},
            })
        );
    }
}
