//! Metadata catalog and lookup cache.
//!
//! The catalog serves the fixed vocabularies (topics, application areas,
//! institution types, membership types) and resolves metadata identifiers
//! back to display items for profile assembly.
//!
//! The lookup cache is filled by a single scan of the metadata table on first
//! use and lives for the whole process. Concurrent first callers may each
//! scan; the last write wins, and no lock is held while the store is queried.

use crate::error::Result;
use crate::store::DirectoryStore;
use hipeac_core::{MembershipType, MetadataId, MetadataItem, MetadataType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A membership type option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipTypeItem {
    pub key: MembershipType,
    pub label: String,
}

/// Complete metadata catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataResponse {
    pub application_areas: Vec<MetadataItem>,
    pub institution_types: Vec<MetadataItem>,
    pub membership_types: Vec<MembershipTypeItem>,
    pub topics: Vec<MetadataItem>,
}

/// The four membership types. Never read from storage.
pub fn membership_type_items() -> Vec<MembershipTypeItem> {
    MembershipType::ALL
        .into_iter()
        .map(|key| MembershipTypeItem {
            key,
            label: key.label().to_string(),
        })
        .collect()
}

type LookupTable = HashMap<MetadataType, HashMap<MetadataId, String>>;

/// Process-lifetime metadata lookup table: type -> (id -> value).
pub struct MetadataCache {
    enabled: bool,
    entries: RwLock<Option<LookupTable>>,
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataCache {
    /// Create an empty, enabled cache.
    pub fn new() -> Self {
        Self {
            enabled: true,
            entries: RwLock::new(None),
        }
    }

    /// Create a cache that never stores anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            entries: RwLock::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_populated(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Fill the cache with one scan of the metadata table, unless it is
    /// already filled or disabled.
    pub async fn ensure_populated(&self, store: &dyn DirectoryStore) -> Result<()> {
        if !self.enabled || self.is_populated() {
            return Ok(());
        }

        let rows = store.metadata(&MetadataType::ALL).await?;
        let mut table = LookupTable::new();
        for row in &rows {
            table
                .entry(row.metadata_type)
                .or_default()
                .insert(row.id, row.value.clone());
        }

        tracing::debug!(rows = rows.len(), "Populated metadata lookup cache");

        *self.entries.write().unwrap_or_else(PoisonError::into_inner) = Some(table);
        Ok(())
    }

    /// Add one entry to a populated cache. No-op otherwise.
    pub fn insert(&self, metadata_type: MetadataType, id: MetadataId, value: &str) {
        if !self.enabled {
            return;
        }
        let mut guard = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(table) = guard.as_mut() {
            table
                .entry(metadata_type)
                .or_default()
                .insert(id, value.to_string());
        }
    }

    /// Look up a display item. `None` when absent or not yet populated.
    pub fn lookup(&self, metadata_type: MetadataType, id: MetadataId) -> Option<MetadataItem> {
        let guard = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()?
            .get(&metadata_type)?
            .get(&id)
            .map(|value| MetadataItem {
                id,
                value: value.clone(),
            })
    }
}

/// Vocabulary access for resources, `get_metadata` and profile assembly.
pub struct MetadataCatalog {
    store: Arc<dyn DirectoryStore>,
    cache: MetadataCache,
}

impl MetadataCatalog {
    pub fn new(store: Arc<dyn DirectoryStore>, cache: MetadataCache) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// The full catalog, read with a single metadata query.
    pub async fn get_metadata(&self) -> Result<MetadataResponse> {
        let rows = self.store.metadata(&MetadataType::ALL).await?;

        let mut response = MetadataResponse {
            membership_types: membership_type_items(),
            ..Default::default()
        };
        for row in rows {
            let bucket = match row.metadata_type {
                MetadataType::ApplicationArea => &mut response.application_areas,
                MetadataType::InstitutionType => &mut response.institution_types,
                MetadataType::Topic => &mut response.topics,
            };
            bucket.push(row.item());
        }

        Ok(response)
    }

    /// Items of one stored type, ordered by (position, value).
    pub async fn list(&self, metadata_type: MetadataType) -> Result<Vec<MetadataItem>> {
        let rows = self.store.metadata(&[metadata_type]).await?;
        Ok(rows.iter().map(|row| row.item()).collect())
    }

    /// Resolve identifiers of one type to display items, keeping input order.
    /// Identifiers the cache does not know are read from the store and added
    /// to it. Identifiers without a matching row are dropped.
    pub async fn resolve(
        &self,
        metadata_type: MetadataType,
        ids: &[MetadataId],
    ) -> Result<Vec<MetadataItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut resolved: HashMap<MetadataId, String> = HashMap::new();
        let mut missing = Vec::new();
        if self.cache.is_enabled() {
            self.cache.ensure_populated(self.store.as_ref()).await?;
            for id in ids {
                match self.cache.lookup(metadata_type, *id) {
                    Some(item) => {
                        resolved.insert(item.id, item.value);
                    }
                    None => missing.push(*id),
                }
            }
        } else {
            missing.extend_from_slice(ids);
        }

        if !missing.is_empty() {
            let rows = self.store.metadata_by_ids(&missing).await?;
            for row in rows
                .into_iter()
                .filter(|row| row.metadata_type == metadata_type)
            {
                self.cache.insert(metadata_type, row.id, &row.value);
                resolved.insert(row.id, row.value);
            }
        }

        Ok(ids
            .iter()
            .filter_map(|id| {
                resolved.get(id).map(|value| MetadataItem {
                    id: *id,
                    value: value.clone(),
                })
            })
            .collect())
    }

    /// Resolve a single identifier.
    pub async fn resolve_one(
        &self,
        metadata_type: MetadataType,
        id: MetadataId,
    ) -> Result<Option<MetadataItem>> {
        Ok(self.resolve(metadata_type, &[id]).await?.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryDirectory;

    fn store() -> Arc<InMemoryDirectory> {
        let store = InMemoryDirectory::new();
        store.add_metadata(1, MetadataType::Topic, "Compilers", 2);
        store.add_metadata(2, MetadataType::Topic, "Artificial Intelligence", 1);
        store.add_metadata(3, MetadataType::Topic, "Architecture", 2);
        store.add_metadata(10, MetadataType::ApplicationArea, "Healthcare", 0);
        store.add_metadata(20, MetadataType::InstitutionType, "University", 0);
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_get_metadata_returns_all_types() {
        let catalog = MetadataCatalog::new(store(), MetadataCache::new());
        let response = catalog.get_metadata().await.unwrap();

        let topics: Vec<_> = response.topics.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(
            topics,
            vec!["Artificial Intelligence", "Architecture", "Compilers"]
        );
        assert_eq!(response.application_areas[0].value, "Healthcare");
        assert_eq!(response.institution_types[0].value, "University");
        assert_eq!(response.membership_types.len(), 4);
    }

    #[tokio::test]
    async fn test_membership_types_do_not_depend_on_store() {
        let catalog = MetadataCatalog::new(Arc::new(InMemoryDirectory::new()), MetadataCache::new());
        let response = catalog.get_metadata().await.unwrap();

        assert!(response.topics.is_empty());
        let keys: Vec<_> = response.membership_types.iter().map(|m| m.key.key()).collect();
        assert_eq!(
            keys,
            vec!["member", "associated_member", "affiliated_member", "affiliated_phd"]
        );
    }

    #[tokio::test]
    async fn test_list_single_type() {
        let catalog = MetadataCatalog::new(store(), MetadataCache::new());
        let items = catalog.list(MetadataType::ApplicationArea).await.unwrap();
        assert_eq!(
            items,
            vec![MetadataItem {
                id: 10,
                value: "Healthcare".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_cache_populates_once() {
        let store = store();
        let cache = MetadataCache::new();
        assert!(!cache.is_populated());
        assert!(cache.lookup(MetadataType::Topic, 1).is_none());

        cache.ensure_populated(store.as_ref()).await.unwrap();
        cache.ensure_populated(store.as_ref()).await.unwrap();

        assert!(cache.is_populated());
        assert_eq!(store.metadata_scans(), 1);
        assert_eq!(
            cache.lookup(MetadataType::Topic, 1).map(|i| i.value),
            Some("Compilers".to_string())
        );
        // Ids are scoped by type.
        assert!(cache.lookup(MetadataType::ApplicationArea, 1).is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_never_scans() {
        let store = store();
        let cache = MetadataCache::disabled();
        cache.ensure_populated(store.as_ref()).await.unwrap();
        assert!(!cache.is_populated());
        assert_eq!(store.metadata_scans(), 0);
    }

    #[tokio::test]
    async fn test_resolve_same_with_and_without_cache() {
        let store = store();
        let cached = MetadataCatalog::new(store.clone(), MetadataCache::new());
        let uncached = MetadataCatalog::new(store.clone(), MetadataCache::disabled());

        let ids = [3, 999, 1];
        let a = cached.resolve(MetadataType::Topic, &ids).await.unwrap();
        let b = uncached.resolve(MetadataType::Topic, &ids).await.unwrap();

        assert_eq!(a, b);
        let values: Vec<_> = a.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(values, vec!["Architecture", "Compilers"]);
    }

    #[tokio::test]
    async fn test_resolve_reads_values_added_after_population() {
        let store = store();
        let catalog = MetadataCatalog::new(store.clone(), MetadataCache::new());
        catalog.resolve(MetadataType::Topic, &[1]).await.unwrap();
        assert!(catalog.cache().is_populated());

        store.add_metadata(5, MetadataType::Topic, "Quantum", 0);
        let items = catalog.resolve(MetadataType::Topic, &[5, 1]).await.unwrap();

        let values: Vec<_> = items.iter().map(|i| i.value.as_str()).collect();
        assert_eq!(values, vec!["Quantum", "Compilers"]);
        assert_eq!(store.metadata_scans(), 1);
        assert_eq!(
            catalog.cache().lookup(MetadataType::Topic, 5).map(|i| i.value),
            Some("Quantum".to_string())
        );
    }

    #[tokio::test]
    async fn test_resolve_one_wrong_type() {
        let catalog = MetadataCatalog::new(store(), MetadataCache::disabled());
        let item = catalog
            .resolve_one(MetadataType::InstitutionType, 1)
            .await
            .unwrap();
        assert!(item.is_none());
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = store();
        store.set_unavailable(true);
        let catalog = MetadataCatalog::new(store, MetadataCache::new());
        assert!(catalog.get_metadata().await.is_err());
        assert!(!catalog.cache().is_populated());
    }
}
