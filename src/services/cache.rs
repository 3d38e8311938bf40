// src/services/cache.rs
// DOCUMENTATION: Photo cache port and in-process backend
// PURPOSE: Map (entity_type, entity_id) to the current primary photo record

use crate::errors::MediaError;
use crate::models::{EntityKey, NewPhotoRecord, PhotoRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Durable key-value store for resolved photos
/// DOCUMENTATION: `upsert` is idempotent by key; a second upsert for the
/// same entity replaces the primary record instead of adding another one
#[async_trait]
pub trait PhotoCache: Send + Sync {
    /// Current primary record for the entity, if any
    async fn get(&self, key: &EntityKey) -> Result<Option<PhotoRecord>, MediaError>;

    /// Write a new primary record, demoting whatever was primary before
    async fn upsert(&self, record: NewPhotoRecord) -> Result<PhotoRecord, MediaError>;
}

/// In-process photo cache
/// DOCUMENTATION: Used when DATABASE_URL is not configured, and by tests.
/// Only the primary record per entity is retained.
#[derive(Default, Clone)]
pub struct MemoryPhotoCache {
    store: Arc<RwLock<HashMap<EntityKey, PhotoRecord>>>,
}

impl MemoryPhotoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities with a primary photo
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }
}

#[async_trait]
impl PhotoCache for MemoryPhotoCache {
    async fn get(&self, key: &EntityKey) -> Result<Option<PhotoRecord>, MediaError> {
        let store = self.store.read().await;

        match store.get(key) {
            Some(record) => {
                log::debug!("Photo cache HIT for {}", key);
                Ok(Some(record.clone()))
            }
            None => {
                log::debug!("Photo cache MISS for {}", key);
                Ok(None)
            }
        }
    }

    async fn upsert(&self, record: NewPhotoRecord) -> Result<PhotoRecord, MediaError> {
        let record = record.into_primary();
        let key = record.key();

        let mut store = self.store.write().await;
        if let Some(previous) = store.insert(key.clone(), record.clone()) {
            log::debug!(
                "Photo cache replaced {} ({} -> {})",
                key,
                previous.source,
                record.source
            );
        } else {
            log::debug!("Photo cache SET for {} ({})", key, record.source);
        }

        Ok(record)
    }
}
