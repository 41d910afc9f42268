//! AuditReader - query service over the audit trail
//!
//! Reconstructs filterable, paginated views of the per-entity audit tables.
//! Every query method validates its parameters before touching storage,
//! resolves the entity's audit table through the injected configuration,
//! and issues a single bounded read (or, for the transaction-hash lookup,
//! one bounded read per audited entity). Storage failures propagate
//! unchanged; nothing is retried or masked.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use spoor_core::config::AuditConfiguration;
use spoor_core::domain::{
    AuditError, Entry, EntityId, IntoOperationTokens, OperationFilter, OperationKind,
    TransactionHash,
};
use spoor_core::ports::{EntryQuery, IAuditStore};

use crate::pager::AuditPager;

/// Default page number for paginated queries
pub const DEFAULT_PAGE: u32 = 1;

/// Default page size for paginated queries
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Read-only query service over the audit trail
///
/// The reader owns an immutable [`AuditConfiguration`] and an operation
/// filter; the filter is the only mutable state and is only touched by
/// [`AuditReader::filter_by`]. Query methods never write to storage.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use spoor_core::config::AuditConfiguration;
/// use spoor_core::domain::EntityId;
/// use spoor_core::ports::IAuditStore;
/// use spoor_trail::AuditReader;
///
/// # async fn example(store: Arc<dyn IAuditStore>) -> anyhow::Result<()> {
/// let post = EntityId::new("acme::model::Post");
/// let configuration = AuditConfiguration::builder()
///     .register(post.clone(), "post")
///     .build();
///
/// let mut reader = AuditReader::new(configuration, store);
/// let updates = reader
///     .filter_by("update")
///     .get_audits(&post, None, 1, 50, None)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct AuditReader {
    configuration: AuditConfiguration,
    store: Arc<dyn IAuditStore>,
    filters: OperationFilter,
}

impl AuditReader {
    /// Creates a reader with an empty operation filter
    pub fn new(configuration: AuditConfiguration, store: Arc<dyn IAuditStore>) -> Self {
        Self {
            configuration,
            store,
            filters: OperationFilter::new(),
        }
    }

    /// Replaces the operation filter with the valid subset of `operations`
    ///
    /// Accepts a single token or a sequence; tokens that do not name an
    /// operation kind are dropped silently, so an all-invalid input leaves
    /// the filter empty (= no filtering). Chainable.
    pub fn filter_by(&mut self, operations: impl IntoOperationTokens) -> &mut Self {
        self.filters = OperationFilter::from_tokens(operations);
        self
    }

    /// Returns the configuration in effect
    pub fn configuration(&self) -> &AuditConfiguration {
        &self.configuration
    }

    /// Returns the current filter contents, in insertion order
    pub fn filters(&self) -> &[OperationKind] {
        self.filters.kinds()
    }

    /// Returns the entity's base table name
    ///
    /// # Errors
    /// Returns `AuditError::UnauditedEntity` if the entity is not audited
    pub fn get_entity_table_name(&self, entity: &EntityId) -> Result<&str, AuditError> {
        self.configuration
            .table_name(entity)
            .ok_or_else(|| AuditError::UnauditedEntity(entity.clone()))
    }

    /// Returns the entity's audit table name (base name + configured
    /// prefix/suffix, `_audit` suffix by default)
    ///
    /// # Errors
    /// Returns `AuditError::UnauditedEntity` if the entity is not audited
    pub fn get_entity_audit_table_name(&self, entity: &EntityId) -> Result<String, AuditError> {
        self.configuration
            .audit_table_name(entity)
            .ok_or_else(|| AuditError::UnauditedEntity(entity.clone()))
    }

    /// Returns every audited entity mapped to its base table name
    ///
    /// Keys iterate in sorted order.
    pub fn get_entities(&self) -> BTreeMap<EntityId, String> {
        self.configuration
            .audited_entities()
            .map(|(entity, audited)| (entity.clone(), audited.table_name().to_string()))
            .collect()
    }

    /// Returns one page of the entity's audit history, newest first
    ///
    /// Optionally restricted to one `object_id` and/or one
    /// `transaction_hash`; the active operation filter always applies, and
    /// all predicates combine as a conjunction. A page past the last match
    /// returns an empty vec.
    ///
    /// # Errors
    /// `AuditError::InvalidArgument` when `page` or `page_size` is zero
    /// (before any storage access); `AuditError::UnauditedEntity` for an
    /// unknown entity.
    pub async fn get_audits(
        &self,
        entity: &EntityId,
        object_id: Option<&str>,
        page: u32,
        page_size: u32,
        transaction_hash: Option<&TransactionHash>,
    ) -> Result<Vec<Entry>, AuditError> {
        validate_pagination(page, page_size)?;
        let table = self.get_entity_audit_table_name(entity)?;

        let mut query = self.base_query(object_id);
        if let Some(hash) = transaction_hash {
            query = query.with_transaction_hash(hash.clone());
        }
        query = query.with_page(page_offset(page, page_size), u64::from(page_size));

        tracing::debug!(entity = %entity, page, page_size, "Querying audit entries");
        Ok(self.store.query_entries(&table, &query).await?)
    }

    /// Returns one page of the entity's audit history plus pagination
    /// metadata (total match count, page count, whether further pages
    /// exist)
    ///
    /// # Errors
    /// Same taxonomy as [`AuditReader::get_audits`]
    pub async fn get_audits_pager(
        &self,
        entity: &EntityId,
        object_id: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<AuditPager, AuditError> {
        validate_pagination(page, page_size)?;
        let table = self.get_entity_audit_table_name(entity)?;

        let query = self.base_query(object_id);
        let total_count = self.store.count_entries(&table, &query).await?;
        let entries = self
            .store
            .query_entries(
                &table,
                &query.with_page(page_offset(page, page_size), u64::from(page_size)),
            )
            .await?;

        Ok(AuditPager::new(entries, page, page_size, total_count))
    }

    /// Returns the total number of matching entries, ignoring pagination
    ///
    /// Honors the active operation filter.
    ///
    /// # Errors
    /// `AuditError::UnauditedEntity` for an unknown entity
    pub async fn get_audits_count(
        &self,
        entity: &EntityId,
        object_id: Option<&str>,
    ) -> Result<u64, AuditError> {
        let table = self.get_entity_audit_table_name(entity)?;
        Ok(self
            .store
            .count_entries(&table, &self.base_query(object_id))
            .await?)
    }

    /// Returns one page of entries whose `created_at` falls within
    /// `[start, end]` (open-ended when `end` is `None`), newest first
    ///
    /// # Errors
    /// `AuditError::InvalidArgument` when `start > end` or when `page` or
    /// `page_size` is zero, all before any storage access;
    /// `AuditError::UnauditedEntity` for an unknown entity.
    pub async fn get_audits_by_date(
        &self,
        entity: &EntityId,
        object_id: Option<&str>,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<Entry>, AuditError> {
        validate_pagination(page, page_size)?;
        if let Some(end) = end {
            if start > end {
                return Err(AuditError::invalid_argument(
                    "start date must not be after end date",
                ));
            }
        }
        let table = self.get_entity_audit_table_name(entity)?;

        let mut query = self.base_query(object_id).with_created_from(start);
        if let Some(end) = end {
            query = query.with_created_until(end);
        }
        query = query.with_page(page_offset(page, page_size), u64::from(page_size));

        Ok(self.store.query_entries(&table, &query).await?)
    }

    /// Returns the full audit history of exactly one object, newest first
    ///
    /// Honors the active operation filter; unpaginated (a single object's
    /// trail is bounded by its own lifecycle).
    ///
    /// # Errors
    /// `AuditError::UnauditedEntity` for an unknown entity
    pub async fn get_audit(
        &self,
        entity: &EntityId,
        object_id: &str,
    ) -> Result<Vec<Entry>, AuditError> {
        let table = self.get_entity_audit_table_name(entity)?;
        Ok(self
            .store
            .query_entries(&table, &self.base_query(Some(object_id)))
            .await?)
    }

    /// Returns every audited entity mapped to its entries sharing the
    /// given transaction hash
    ///
    /// One transaction can touch many entity types, so this fans out over
    /// the audited-entity registry with one bounded query per entity and
    /// merges the results. Entities with no matching entries are present
    /// with an empty vec. The active operation filter applies to each
    /// per-entity query.
    pub async fn get_audits_by_transaction_hash(
        &self,
        transaction_hash: &TransactionHash,
    ) -> Result<BTreeMap<EntityId, Vec<Entry>>, AuditError> {
        let mut results = BTreeMap::new();

        for (entity, audited) in self.configuration.audited_entities() {
            let table = self.configuration.audit_table_name_for(audited.table_name());
            let query = self
                .base_query(None)
                .with_transaction_hash(transaction_hash.clone());
            let entries = self.store.query_entries(&table, &query).await?;
            results.insert(entity.clone(), entries);
        }

        tracing::debug!(
            transaction_hash = %transaction_hash,
            entities = results.len(),
            "Collected audit entries by transaction hash"
        );
        Ok(results)
    }

    /// Builds the query every method starts from: active filter plus the
    /// optional object restriction
    fn base_query(&self, object_id: Option<&str>) -> EntryQuery {
        let mut query = EntryQuery::new().with_operations(self.filters.kinds().to_vec());
        if let Some(object_id) = object_id {
            query = query.with_object_id(object_id);
        }
        query
    }
}

/// Rejects zero pages and page sizes before any storage access
fn validate_pagination(page: u32, page_size: u32) -> Result<(), AuditError> {
    if page == 0 {
        return Err(AuditError::invalid_argument("page must be >= 1"));
    }
    if page_size == 0 {
        return Err(AuditError::invalid_argument("page size must be >= 1"));
    }
    Ok(())
}

/// Offset of a 1-indexed page
fn page_offset(page: u32, page_size: u32) -> u64 {
    u64::from(page - 1) * u64::from(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use spoor_core::domain::EntryId;

    /// In-memory mock store that records which tables were touched
    struct MockStore {
        touched: Mutex<Vec<String>>,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                touched: Mutex::new(Vec::new()),
            }
        }

        fn touched(&self) -> Vec<String> {
            self.touched.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl IAuditStore for MockStore {
        async fn query_entries(
            &self,
            audit_table: &str,
            _query: &EntryQuery,
        ) -> anyhow::Result<Vec<Entry>> {
            self.touched.lock().unwrap().push(audit_table.to_string());
            Ok(vec![])
        }

        async fn count_entries(
            &self,
            audit_table: &str,
            _query: &EntryQuery,
        ) -> anyhow::Result<u64> {
            self.touched.lock().unwrap().push(audit_table.to_string());
            Ok(0)
        }

        async fn append_entry(
            &self,
            audit_table: &str,
            _entry: &Entry,
        ) -> anyhow::Result<EntryId> {
            self.touched.lock().unwrap().push(audit_table.to_string());
            Ok(EntryId::new(1))
        }
    }

    fn post() -> EntityId {
        EntityId::new("acme::model::Post")
    }

    fn reader_with_mock() -> (AuditReader, Arc<MockStore>) {
        let store = Arc::new(MockStore::new());
        let configuration = AuditConfiguration::builder()
            .register(post(), "post")
            .register(EntityId::new("acme::model::Author"), "author")
            .build();
        (AuditReader::new(configuration, store.clone()), store)
    }

    #[test]
    fn test_filter_is_empty_by_default() {
        let (reader, _) = reader_with_mock();
        assert!(reader.filters().is_empty());
    }

    #[test]
    fn test_filter_by_replaces_set() {
        let (mut reader, _) = reader_with_mock();

        reader.filter_by(["insert", "update"]);
        assert_eq!(
            reader.filters(),
            &[OperationKind::Insert, OperationKind::Update]
        );

        reader.filter_by("remove");
        assert_eq!(reader.filters(), &[OperationKind::Remove]);

        reader.filter_by("UNKNOWN");
        assert!(reader.filters().is_empty());
    }

    #[test]
    fn test_table_name_resolution() {
        let (reader, _) = reader_with_mock();

        assert_eq!(reader.get_entity_table_name(&post()).unwrap(), "post");
        assert_eq!(
            reader.get_entity_audit_table_name(&post()).unwrap(),
            "post_audit"
        );

        let unknown = EntityId::new("acme::model::Draft");
        assert!(reader
            .get_entity_table_name(&unknown)
            .unwrap_err()
            .is_unaudited_entity());
        assert!(reader
            .get_entity_audit_table_name(&unknown)
            .unwrap_err()
            .is_unaudited_entity());
    }

    #[test]
    fn test_get_entities_sorted() {
        let (reader, _) = reader_with_mock();

        let entities = reader.get_entities();
        let keys: Vec<_> = entities.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["acme::model::Author", "acme::model::Post"]);
        assert_eq!(entities.values().collect::<Vec<_>>(), vec!["author", "post"]);
    }

    #[tokio::test]
    async fn test_invalid_page_fails_before_storage_access() {
        let (reader, store) = reader_with_mock();

        let result = reader.get_audits(&post(), None, 0, 50, None).await;
        assert!(result.unwrap_err().is_invalid_argument());

        let result = reader.get_audits(&post(), None, 1, 0, None).await;
        assert!(result.unwrap_err().is_invalid_argument());

        let result = reader.get_audits_pager(&post(), None, 0, 50).await;
        assert!(result.unwrap_err().is_invalid_argument());

        assert!(store.touched().is_empty());
    }

    #[tokio::test]
    async fn test_inverted_date_range_fails_before_storage_access() {
        let (reader, store) = reader_with_mock();
        let now = Utc::now();

        let result = reader
            .get_audits_by_date(&post(), None, now, Some(now - chrono::Duration::days(1)), 1, 50)
            .await;
        assert!(result.unwrap_err().is_invalid_argument());
        assert!(store.touched().is_empty());
    }

    #[tokio::test]
    async fn test_unaudited_entity_fails_before_storage_access() {
        let (reader, store) = reader_with_mock();
        let unknown = EntityId::new("acme::model::Draft");

        let result = reader.get_audits(&unknown, None, 1, 50, None).await;
        assert!(result.unwrap_err().is_unaudited_entity());

        let result = reader.get_audits_count(&unknown, None).await;
        assert!(result.unwrap_err().is_unaudited_entity());

        let result = reader.get_audit(&unknown, "1").await;
        assert!(result.unwrap_err().is_unaudited_entity());

        assert!(store.touched().is_empty());
    }

    #[tokio::test]
    async fn test_transaction_hash_lookup_fans_out_over_registry() {
        let (reader, store) = reader_with_mock();
        let hash = TransactionHash::generate();

        let results = reader.get_audits_by_transaction_hash(&hash).await.unwrap();

        // Every audited entity is present, even with no matches
        assert_eq!(results.len(), 2);
        assert!(results.values().all(Vec::is_empty));
        assert_eq!(store.touched(), vec!["author_audit", "post_audit"]);
    }

    #[test]
    fn test_page_offset() {
        assert_eq!(page_offset(1, 50), 0);
        assert_eq!(page_offset(2, 50), 50);
        assert_eq!(page_offset(3, 25), 50);
    }
}
