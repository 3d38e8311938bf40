// src/services/testing.rs
// DOCUMENTATION: Test doubles for the provider, storage and cache ports

use crate::errors::MediaError;
use crate::models::{EntityKey, NewPhotoRecord, PhotoRecord, PhotoSource};
use crate::services::providers::{
    Attribution, FetchedImage, ImageMeta, PhotoProvider, PhotoSubject, ProviderError,
};
use crate::services::{BlobStore, MemoryPhotoCache, PhotoCache};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// Provider with a fixed outcome that records every call
pub struct ScriptedProvider {
    source: PhotoSource,
    enabled: bool,
    outcome: Result<(), ProviderError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    used: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn succeeding(source: PhotoSource) -> Arc<Self> {
        Arc::new(Self::build(source, true, Ok(()), None))
    }

    pub fn failing(source: PhotoSource, err: ProviderError) -> Arc<Self> {
        Arc::new(Self::build(source, true, Err(err), None))
    }

    pub fn disabled(source: PhotoSource) -> Arc<Self> {
        Arc::new(Self::build(source, false, Ok(()), None))
    }

    pub fn slow(source: PhotoSource, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(source, true, Ok(()), Some(delay)))
    }

    pub fn slow_failing(source: PhotoSource, delay: Duration, err: ProviderError) -> Arc<Self> {
        Arc::new(Self::build(source, true, Err(err), Some(delay)))
    }

    fn build(
        source: PhotoSource,
        enabled: bool,
        outcome: Result<(), ProviderError>,
        delay: Option<Duration>,
    ) -> Self {
        Self {
            source,
            enabled,
            outcome,
            delay,
            calls: AtomicUsize::new(0),
            used: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn used(&self) -> usize {
        self.used.load(Ordering::SeqCst)
    }

    pub async fn queries(&self) -> Vec<String> {
        self.queries.lock().await.clone()
    }
}

#[async_trait]
impl PhotoProvider for ScriptedProvider {
    fn source(&self) -> PhotoSource {
        self.source
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn query_for(&self, subject: &PhotoSubject) -> Option<String> {
        match self.source {
            PhotoSource::Places => subject.photo_reference.clone(),
            PhotoSource::Pexels => Some(subject.name_query()),
            _ => Some(subject.qualified_query()),
        }
    }

    async fn fetch_image(&self, query: &str) -> Result<FetchedImage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries.lock().await.push(query.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()?;

        Ok(FetchedImage {
            bytes: vec![0xFF, 0xD8, 0xFF],
            content_type: "image/jpeg".to_string(),
            external_id: Some(query.to_string()),
            source_ref: Some(query.to_string()),
            meta: ImageMeta {
                author: Some("Test Author".to_string()),
                ..Default::default()
            },
        })
    }

    fn attribution(&self, meta: &ImageMeta) -> Attribution {
        Attribution {
            text: format!(
                "{} via {}",
                meta.author.as_deref().unwrap_or("unknown"),
                self.source
            ),
            license: (self.source == PhotoSource::Commons).then(|| "CC BY-SA 4.0".to_string()),
        }
    }

    async fn mark_used(&self, _meta: &ImageMeta) -> Result<(), ProviderError> {
        self.used.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub const MEMORY_STORE_PREFIX: &str = "memory://";

/// Blob store kept in memory; can be told to reject uploads
#[derive(Default)]
pub struct MemoryBlobStore {
    buckets: RwLock<HashSet<String>>,
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
    reject_uploads: AtomicBool,
    put_delay: Option<Duration>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        let store = Self::default();
        store.reject_uploads.store(true, Ordering::SeqCst);
        store
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            put_delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_reject_uploads(&self, reject: bool) {
        self.reject_uploads.store(reject, Ordering::SeqCst);
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), MediaError> {
        self.buckets.write().await.insert(bucket.to_string());
        Ok(())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), MediaError> {
        if let Some(delay) = self.put_delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject_uploads.load(Ordering::SeqCst) {
            return Err(MediaError::UploadFailed(format!("{}: rejected", key)));
        }

        self.objects
            .write()
            .await
            .insert(format!("{}/{}", bucket, key), (bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}{}/{}", MEMORY_STORE_PREFIX, bucket, key)
    }
}

/// Cache whose reads always miss and whose writes always fail
#[derive(Default)]
pub struct FailingPhotoCache {
    pub writes: AtomicUsize,
}

#[async_trait]
impl PhotoCache for FailingPhotoCache {
    async fn get(&self, _key: &EntityKey) -> Result<Option<PhotoRecord>, MediaError> {
        Ok(None)
    }

    async fn upsert(&self, _record: NewPhotoRecord) -> Result<PhotoRecord, MediaError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(MediaError::DatabaseError("connection reset".to_string()))
    }
}

/// Memory cache whose first read pauses after looking up the key, so the
/// caller acts on a miss that may be stale by the time it resumes
pub struct StallingPhotoCache {
    inner: MemoryPhotoCache,
    stall: Duration,
    stalled: AtomicBool,
}

impl StallingPhotoCache {
    pub fn new(inner: MemoryPhotoCache, stall: Duration) -> Self {
        Self {
            inner,
            stall,
            stalled: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl PhotoCache for StallingPhotoCache {
    async fn get(&self, key: &EntityKey) -> Result<Option<PhotoRecord>, MediaError> {
        let found = self.inner.get(key).await?;
        if !self.stalled.swap(true, Ordering::SeqCst) {
            tokio::time::sleep(self.stall).await;
        }
        Ok(found)
    }

    async fn upsert(&self, record: NewPhotoRecord) -> Result<PhotoRecord, MediaError> {
        self.inner.upsert(record).await
    }
}
