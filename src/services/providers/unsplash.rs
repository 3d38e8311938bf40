// src/services/providers/unsplash.rs
// DOCUMENTATION: Unsplash search adapter
// PURPOSE: Keyword photo search with download tracking required by the Unsplash API terms

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
    results: Vec<UnsplashPhoto>,
}

#[derive(Debug, Deserialize)]
struct UnsplashPhoto {
    id: String,
    urls: UnsplashUrls,
    user: UnsplashUser,
    links: UnsplashLinks,
}

#[derive(Debug, Deserialize)]
struct UnsplashUrls {
    regular: String,
}

#[derive(Debug, Deserialize)]
struct UnsplashUser {
    name: String,
    links: Option<UnsplashUserLinks>,
}

#[derive(Debug, Deserialize)]
struct UnsplashUserLinks {
    html: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UnsplashLinks {
    download_location: Option<String>,
}

/// Unsplash API client
pub struct UnsplashProvider {
    client: Client,
    access_key: String,
    base_url: String,
    quota: ProviderQuota,
}

impl UnsplashProvider {
    pub fn new(client: Client, access_key: String, quota: ProviderQuota) -> Self {
        Self {
            client,
            access_key,
            base_url: "https://api.unsplash.com".to_string(),
            quota,
        }
    }

    fn auth_header(&self) -> String {
        format!("Client-ID {}", self.access_key)
    }

    async fn search(&self, query: &str) -> Result<UnsplashPhoto, ProviderError> {
        let response = self
            .client
            .get(format!("{}/search/photos", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header("Accept-Version", "v1")
            .query(&[
                ("query", query),
                ("per_page", "1"),
                ("orientation", "landscape"),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "unsplash search"))?;

        self.quota.observe_headers(response.headers());

        if !response.status().is_success() {
            return Err(ProviderError::from_status(response.status(), "unsplash search"));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "unsplash search body"))?;

        body.results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::NotFound(format!("unsplash has no photo for '{}'", query)))
    }
}

#[async_trait]
impl PhotoProvider for UnsplashProvider {
    fn source(&self) -> PhotoSource {
        PhotoSource::Unsplash
    }

    fn is_enabled(&self) -> bool {
        !self.access_key.is_empty()
    }

    fn query_for(&self, subject: &PhotoSubject) -> Option<String> {
        Some(subject.qualified_query())
    }

    async fn fetch_image(&self, query: &str) -> Result<FetchedImage, ProviderError> {
        self.quota.try_acquire()?;
        log::debug!("Unsplash search: query={}", query);

        let photo = self.search(query).await?;
        let (bytes, content_type) =
            download_image(&self.client, &photo.urls.regular, "unsplash image").await?;

        Ok(FetchedImage {
            bytes,
            content_type,
            external_id: Some(photo.id),
            source_ref: Some(query.to_string()),
            meta: ImageMeta {
                author: Some(photo.user.name),
                author_url: photo.user.links.and_then(|l| l.html),
                license: None,
                download_location: photo.links.download_location,
            },
        })
    }

    fn attribution(&self, meta: &ImageMeta) -> Attribution {
        let text = match meta.author.as_deref() {
            Some(author) => format!("Photo by {} on Unsplash", author),
            None => "Photo from Unsplash".to_string(),
        };

        Attribution {
            text,
            license: None,
        }
    }

    fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        Some(self.quota.status())
    }

    /// Report the download so the photographer's stats count it
    async fn mark_used(&self, meta: &ImageMeta) -> Result<(), ProviderError> {
        let Some(location) = meta.download_location.as_deref() else {
            return Ok(());
        };

        let response = self
            .client
            .get(location)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "unsplash download tracking"))?;

        self.quota.observe_headers(response.headers());

        if !response.status().is_success() {
            return Err(ProviderError::from_status(
                response.status(),
                "unsplash download tracking",
            ));
        }

        log::debug!("Unsplash download tracked: {}", location);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(key: &str) -> UnsplashProvider {
        UnsplashProvider::new(Client::new(), key.to_string(), ProviderQuota::per_hour("unsplash", 50))
    }

    #[test]
    fn test_enabled_only_with_key() {
        assert!(!provider("").is_enabled());
        assert!(provider("access").is_enabled());
    }

    #[test]
    fn test_query_uses_country() {
        let subject = PhotoSubject {
            entity_name: "Eiffel Tower".to_string(),
            country: Some("France".to_string()),
            photo_reference: Some("ignored".to_string()),
        };
        assert_eq!(provider("k").query_for(&subject), Some("Eiffel Tower France".to_string()));
    }

    #[test]
    fn test_parse_search_response() {
        let body: SearchResponse = serde_json::from_value(serde_json::json!({
            "total": 1,
            "results": [{
                "id": "abc123",
                "urls": { "regular": "https://images.unsplash.com/photo-abc" },
                "user": { "name": "Jane Doe", "links": { "html": "https://unsplash.com/@jane" } },
                "links": { "download_location": "https://api.unsplash.com/photos/abc123/download" }
            }]
        }))
        .unwrap();

        let photo = &body.results[0];
        assert_eq!(photo.id, "abc123");
        assert_eq!(photo.user.name, "Jane Doe");
        assert!(photo.links.download_location.is_some());
    }

    #[test]
    fn test_attribution() {
        let meta = ImageMeta {
            author: Some("Jane Doe".to_string()),
            ..Default::default()
        };
        assert_eq!(provider("k").attribution(&meta).text, "Photo by Jane Doe on Unsplash");
    }

    #[tokio::test]
    async fn test_spent_budget_skips_network() {
        let p = UnsplashProvider::new(
            Client::new(),
            "k".to_string(),
            ProviderQuota::per_hour("unsplash", 1),
        );
        p.quota.try_acquire().unwrap();

        // Local budget is spent, so this must fail before any request is made
        let err = p.fetch_image("Paris").await.unwrap_err();
        assert_eq!(err.kind(), "rate_limited");
    }

    #[tokio::test]
    async fn test_mark_used_without_location_is_noop() {
        assert!(provider("k").mark_used(&ImageMeta::default()).await.is_ok());
    }
}
