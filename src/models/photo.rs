// src/models/photo.rs
// DOCUMENTATION: Photo records and resolution DTOs
// PURPOSE: Types shared by the cache, the orchestrator and the handlers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Kind of travel place a photo belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Destination,
    Attraction,
    Restaurant,
    Accommodation,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Destination => "destination",
            EntityType::Attraction => "attraction",
            EntityType::Restaurant => "restaurant",
            EntityType::Accommodation => "accommodation",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "destination" => Ok(EntityType::Destination),
            "attraction" => Ok(EntityType::Attraction),
            "restaurant" => Ok(EntityType::Restaurant),
            "accommodation" => Ok(EntityType::Accommodation),
            other => Err(format!("unknown entity type: {}", other)),
        }
    }
}

/// Provider that supplied a photo
/// Declaration order is the waterfall order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoSource {
    Places,
    Unsplash,
    Commons,
    Pexels,
}

impl PhotoSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoSource::Places => "places",
            PhotoSource::Unsplash => "unsplash",
            PhotoSource::Commons => "commons",
            PhotoSource::Pexels => "pexels",
        }
    }
}

impl fmt::Display for PhotoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "places" => Ok(PhotoSource::Places),
            "unsplash" => Ok(PhotoSource::Unsplash),
            "commons" => Ok(PhotoSource::Commons),
            "pexels" => Ok(PhotoSource::Pexels),
            other => Err(format!("unknown photo source: {}", other)),
        }
    }
}

/// Cache key: one primary photo per (entity_type, entity_id)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity_type: EntityType,
    pub entity_id: String,
}

impl EntityKey {
    pub fn new(entity_type: EntityType, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type,
            entity_id: entity_id.into(),
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}

/// Cached outcome of a successful resolution
/// `cached_url` always points at object storage, never at a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoRecord {
    pub id: Uuid,
    pub entity_type: EntityType,
    pub entity_id: String,
    pub source: PhotoSource,
    pub external_id: Option<String>,
    pub source_ref: Option<String>,
    pub cached_url: String,
    pub attribution: Option<String>,
    pub license: Option<String>,
    pub is_primary: bool,
    pub inserted_at: DateTime<Utc>,
}

impl PhotoRecord {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type, self.entity_id.clone())
    }
}

/// Record to be written after a provider succeeded and the bytes were stored
#[derive(Debug, Clone)]
pub struct NewPhotoRecord {
    pub entity_type: EntityType,
    pub entity_id: String,
    pub source: PhotoSource,
    pub external_id: Option<String>,
    pub source_ref: Option<String>,
    pub cached_url: String,
    pub attribution: Option<String>,
    pub license: Option<String>,
}

impl NewPhotoRecord {
    /// Materialize as the primary record for its entity
    pub fn into_primary(self) -> PhotoRecord {
        PhotoRecord {
            id: Uuid::new_v4(),
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            source: self.source,
            external_id: self.external_id,
            source_ref: self.source_ref,
            cached_url: self.cached_url,
            attribution: self.attribution,
            license: self.license,
            is_primary: true,
            inserted_at: Utc::now(),
        }
    }
}

/// Request body for resolving an entity photo
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    pub entity_type: EntityType,

    #[validate(length(min = 1, max = 255))]
    pub entity_id: String,

    #[validate(length(min = 1, max = 255))]
    pub entity_name: String,

    #[validate(length(max = 128))]
    pub country: Option<String>,

    #[validate(length(min = 1, max = 2048))]
    pub photo_reference: Option<String>,

    #[serde(default)]
    pub force_refresh: bool,
}

impl ResolveRequest {
    pub fn key(&self) -> EntityKey {
        EntityKey::new(self.entity_type, self.entity_id.clone())
    }

    /// Human label used in logs and in NoImageAvailable
    pub fn describe(&self) -> String {
        format!("{} '{}'", self.entity_type, self.entity_name)
    }
}

/// Photo DTO returned to the web client
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedPhoto {
    pub url: String,
    pub source: PhotoSource,
    pub attribution: Option<String>,
    pub license: Option<String>,
    pub cached: bool,
}

impl PhotoRecord {
    /// Convert a cached record into the API response DTO
    pub fn to_resolved(&self, cached: bool) -> ResolvedPhoto {
        ResolvedPhoto {
            url: self.cached_url.clone(),
            source: self.source,
            attribution: self.attribution.clone(),
            license: self.license.clone(),
            cached,
        }
    }
}
