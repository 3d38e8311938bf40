// src/services/providers/pexels.rs
// DOCUMENTATION: Pexels search adapter
// PURPOSE: Last-resort stock search, queried by entity name only

use super::{
    download_image, Attribution, FetchedImage, ImageMeta, PhotoProvider, PhotoSubject,
    ProviderError, ProviderQuota, RateLimitStatus,
};
use crate::models::PhotoSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    photos: Vec<PexelsPhoto>,
}

#[derive(Debug, Deserialize)]
struct PexelsPhoto {
    id: u64,
    photographer: Option<String>,
    photographer_url: Option<String>,
    src: PexelsSrc,
}

#[derive(Debug, Deserialize)]
struct PexelsSrc {
    large: String,
}

/// Pexels API client
pub struct PexelsProvider {
    client: Client,
    api_key: String,
    base_url: String,
    quota: ProviderQuota,
}

impl PexelsProvider {
    pub fn new(client: Client, api_key: String, quota: ProviderQuota) -> Self {
        Self {
            client,
            api_key,
            base_url: "https://api.pexels.com/v1".to_string(),
            quota,
        }
    }
}

#[async_trait]
impl PhotoProvider for PexelsProvider {
    fn source(&self) -> PhotoSource {
        PhotoSource::Pexels
    }

    fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn query_for(&self, subject: &PhotoSubject) -> Option<String> {
        Some(subject.name_query())
    }

    async fn fetch_image(&self, query: &str) -> Result<FetchedImage, ProviderError> {
        self.quota.try_acquire()?;
        log::debug!("Pexels search: query={}", query);

        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .header(reqwest::header::AUTHORIZATION, &self.api_key)
            .query(&[("query", query), ("per_page", "1")])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "pexels search"))?;

        self.quota.observe_headers(response.headers());

        if !response.status().is_success() {
            return Err(ProviderError::from_status(response.status(), "pexels search"));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "pexels search body"))?;

        let photo = body.photos.into_iter().next().ok_or_else(|| {
            ProviderError::NotFound(format!("pexels has no photo for '{}'", query))
        })?;

        let (bytes, content_type) =
            download_image(&self.client, &photo.src.large, "pexels image").await?;

        Ok(FetchedImage {
            bytes,
            content_type,
            external_id: Some(photo.id.to_string()),
            source_ref: Some(query.to_string()),
            meta: ImageMeta {
                author: photo.photographer,
                author_url: photo.photographer_url,
                license: None,
                download_location: None,
            },
        })
    }

    fn attribution(&self, meta: &ImageMeta) -> Attribution {
        let text = match meta.author.as_deref() {
            Some(author) => format!("Photo by {} on Pexels", author),
            None => "Photo from Pexels".to_string(),
        };

        Attribution {
            text,
            license: None,
        }
    }

    fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        Some(self.quota.status())
    }
}
