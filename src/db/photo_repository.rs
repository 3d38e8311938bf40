// src/db/photo_repository.rs
// DOCUMENTATION: Postgres-backed photo cache
// PURPOSE: Read and write primary entity photos in the entity_photos table

use crate::errors::MediaError;
use crate::models::{EntityKey, NewPhotoRecord, PhotoRecord};
use crate::services::PhotoCache;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Postgres unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Raw row as stored; enums are TEXT columns
#[derive(Debug, Clone, FromRow)]
struct PhotoRow {
    id: Uuid,
    entity_type: String,
    entity_id: String,
    source: String,
    external_id: Option<String>,
    source_ref: Option<String>,
    cached_url: String,
    attribution: Option<String>,
    license: Option<String>,
    is_primary: bool,
    inserted_at: DateTime<Utc>,
}

impl TryFrom<PhotoRow> for PhotoRecord {
    type Error = MediaError;

    fn try_from(row: PhotoRow) -> Result<Self, Self::Error> {
        Ok(PhotoRecord {
            id: row.id,
            entity_type: row.entity_type.parse().map_err(MediaError::DatabaseError)?,
            entity_id: row.entity_id,
            source: row.source.parse().map_err(MediaError::DatabaseError)?,
            external_id: row.external_id,
            source_ref: row.source_ref,
            cached_url: row.cached_url,
            attribution: row.attribution,
            license: row.license,
            is_primary: row.is_primary,
            inserted_at: row.inserted_at,
        })
    }
}

/// Photo cache on top of PostgreSQL
/// DOCUMENTATION: The partial unique index on (entity_type, entity_id)
/// WHERE is_primary guarantees a single primary per entity. Older
/// records are demoted, never rewritten.
#[derive(Clone)]
pub struct PgPhotoCache {
    pool: PgPool,
}

impl PgPhotoCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn replace_primary(&self, record: &NewPhotoRecord) -> Result<PhotoRow, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE entity_photos
            SET is_primary = FALSE
            WHERE entity_type = $1 AND entity_id = $2 AND is_primary
            "#,
        )
        .bind(record.entity_type.as_str())
        .bind(&record.entity_id)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, PhotoRow>(
            r#"
            INSERT INTO entity_photos (
                entity_type, entity_id, source, external_id, source_ref,
                cached_url, attribution, license, is_primary
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, TRUE)
            RETURNING *
            "#,
        )
        .bind(record.entity_type.as_str())
        .bind(&record.entity_id)
        .bind(record.source.as_str())
        .bind(&record.external_id)
        .bind(&record.source_ref)
        .bind(&record.cached_url)
        .bind(&record.attribution)
        .bind(&record.license)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

#[async_trait]
impl PhotoCache for PgPhotoCache {
    async fn get(&self, key: &EntityKey) -> Result<Option<PhotoRecord>, MediaError> {
        let row = sqlx::query_as::<_, PhotoRow>(
            r#"
            SELECT * FROM entity_photos
            WHERE entity_type = $1 AND entity_id = $2 AND is_primary
            ORDER BY inserted_at DESC
            LIMIT 1
            "#,
        )
        .bind(key.entity_type.as_str())
        .bind(&key.entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            log::error!("Failed to read cached photo for {}: {}", key, e);
            MediaError::DatabaseError(format!("Fetch photo failed: {}", e))
        })?;

        row.map(PhotoRecord::try_from).transpose()
    }

    async fn upsert(&self, record: NewPhotoRecord) -> Result<PhotoRecord, MediaError> {
        // A concurrent writer for the same entity trips the partial unique
        // index; one retry makes the later writer win.
        let row = match self.replace_primary(&record).await {
            Err(e) if is_unique_violation(&e) => {
                log::debug!(
                    "Concurrent primary write for {}/{}, retrying",
                    record.entity_type,
                    record.entity_id
                );
                self.replace_primary(&record).await
            }
            other => other,
        }
        .map_err(|e| {
            log::error!(
                "Failed to write cached photo for {}/{}: {}",
                record.entity_type,
                record.entity_id,
                e
            );
            MediaError::DatabaseError(format!("Upsert photo failed: {}", e))
        })?;

        PhotoRecord::try_from(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityType, PhotoSource};

    fn row(entity_type: &str, source: &str) -> PhotoRow {
        PhotoRow {
            id: Uuid::new_v4(),
            entity_type: entity_type.to_string(),
            entity_id: "42".to_string(),
            source: source.to_string(),
            external_id: Some("ref-123".to_string()),
            source_ref: None,
            cached_url: "https://storage.local/destination/42/places-a.jpg".to_string(),
            attribution: Some("Photo via Google Places".to_string()),
            license: None,
            is_primary: true,
            inserted_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_to_record() {
        let record = PhotoRecord::try_from(row("destination", "places")).unwrap();
        assert_eq!(record.entity_type, EntityType::Destination);
        assert_eq!(record.source, PhotoSource::Places);
        assert_eq!(record.external_id.as_deref(), Some("ref-123"));
    }

    #[test]
    fn test_row_with_unknown_source_is_rejected() {
        let err = PhotoRecord::try_from(row("destination", "flickr")).unwrap_err();
        assert!(matches!(err, MediaError::DatabaseError(_)));
    }
}
