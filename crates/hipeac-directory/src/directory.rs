use crate::catalog::{MetadataCache, MetadataCatalog, MetadataResponse};
use crate::error::Result;
use crate::store::DirectoryStore;
use hipeac_core::DirectoryConfig;
use std::sync::Arc;

/// Entry point for all read operations: catalog, member search and expert
/// finder share one store handle and one metadata cache.
pub struct Directory {
    pub(crate) store: Arc<dyn DirectoryStore>,
    pub(crate) catalog: MetadataCatalog,
    pub(crate) config: DirectoryConfig,
}

impl Directory {
    pub fn new(store: Arc<dyn DirectoryStore>, config: DirectoryConfig) -> Self {
        let cache = if config.cache_metadata {
            MetadataCache::new()
        } else {
            MetadataCache::disabled()
        };
        Self {
            catalog: MetadataCatalog::new(store.clone(), cache),
            store,
            config,
        }
    }

    pub fn catalog(&self) -> &MetadataCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Full metadata catalog.
    pub async fn get_metadata(&self) -> Result<MetadataResponse> {
        self.catalog.get_metadata().await
    }
}
