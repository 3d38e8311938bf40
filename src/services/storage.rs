// src/services/storage.rs
// DOCUMENTATION: Durable object storage for cached photos
// PURPOSE: Persist provider bytes once and hand out a provider-independent public URL

use crate::errors::MediaError;
use crate::models::{EntityKey, PhotoSource};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Bucket-style blob store
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Create the bucket if missing; "already exists" is success
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), MediaError>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), MediaError>;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

/// Storage REST API client (Supabase storage protocol)
pub struct StorageApi {
    client: Client,
    base_url: String,
    service_key: String,
}

impl StorageApi {
    pub fn new(client: Client, base_url: &str, service_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
    }
}

/// The storage API reports an existing bucket as 409, or as 400 with a
/// "Duplicate" / "already exists" body
fn is_existing_bucket(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT
        || (status == StatusCode::BAD_REQUEST
            && (body.contains("Duplicate") || body.contains("already exists")))
}

#[async_trait]
impl BlobStore for StorageApi {
    async fn ensure_bucket(&self, bucket: &str) -> Result<(), MediaError> {
        let response = self
            .authorized(self.client.post(format!("{}/storage/v1/bucket", self.base_url)))
            .json(&json!({ "id": bucket, "name": bucket, "public": true }))
            .send()
            .await
            .map_err(|e| MediaError::StorageError(format!("Create bucket failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            log::info!("Created storage bucket '{}'", bucket);
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if is_existing_bucket(status, &body) {
            log::debug!("Storage bucket '{}' already exists", bucket);
            return Ok(());
        }

        log::error!("Storage bucket '{}' error {}: {}", bucket, status, body);
        Err(MediaError::StorageError(format!(
            "Create bucket '{}' failed with {}: {}",
            bucket, status, body
        )))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), MediaError> {
        let response = self
            .authorized(
                self.client
                    .post(format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, key)),
            )
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| MediaError::UploadFailed(format!("{}: {}", key, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::UploadFailed(format!(
                "{}: {} {}",
                key, status, body
            )));
        }

        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base_url, bucket, key)
    }
}

/// File extension for a stored image
fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/png" => "png",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "jpg",
    }
}

/// Object key: `{entity_type}/{entity_id}/{source}-{suffix}.{ext}`
/// The random suffix keeps a new upload from overwriting an earlier one
pub fn object_key(key: &EntityKey, source: PhotoSource, content_type: &str) -> String {
    format!(
        "{}/{}/{}-{}.{}",
        key.entity_type,
        sanitize_segment(&key.entity_id),
        source,
        Uuid::new_v4().simple(),
        extension_for(content_type)
    )
}

/// Entity ids are opaque; keep them from introducing extra path segments
fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Uploads resolved photos into the photo bucket
#[derive(Clone)]
pub struct BlobUploader {
    store: Arc<dyn BlobStore>,
    bucket: String,
}

impl BlobUploader {
    pub fn new(store: Arc<dyn BlobStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }

    /// Called once at startup
    pub async fn ensure_bucket(&self) -> Result<(), MediaError> {
        self.store.ensure_bucket(&self.bucket).await
    }

    /// Store the bytes and return their public URL
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        source: PhotoSource,
        key: &EntityKey,
    ) -> Result<String, MediaError> {
        let object = object_key(key, source, content_type);
        let size = bytes.len();

        self.store
            .put(&self.bucket, &object, bytes, content_type)
            .await?;

        log::debug!("Uploaded {} ({} bytes) to bucket '{}'", object, size, self.bucket);
        Ok(self.store.public_url(&self.bucket, &object))
    }
}
