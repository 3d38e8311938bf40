// src/services/providers/mod.rs
// DOCUMENTATION: Photo provider port shared by all external photo APIs
// PURPOSE: Uniform capability the media orchestrator iterates over

pub mod commons;
pub mod pexels;
pub mod places;
pub mod quota;
pub mod unsplash;

pub use commons::CommonsProvider;
pub use pexels::PexelsProvider;
pub use places::PlacesPhotoProvider;
pub use quota::{ProviderQuota, RateLimitStatus};
pub use unsplash::UnsplashProvider;

use crate::config::Config;
use crate::models::PhotoSource;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Why a single provider attempt failed
/// DOCUMENTATION: All variants are recoverable; the orchestrator moves on
/// to the next provider. `kind()` keeps them apart in logs and counters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("no matching image: {0}")]
    NotFound(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("authentication failed: {0}")]
    AuthError(String),

    #[error("network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotFound(_) => "not_found",
            ProviderError::RateLimited(_) => "rate_limited",
            ProviderError::AuthError(_) => "auth_error",
            ProviderError::NetworkError(_) => "network_error",
        }
    }

    /// Map a non-success HTTP status onto the provider taxonomy
    pub fn from_status(status: StatusCode, context: &str) -> Self {
        let msg = format!("{} returned {}", context, status);
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::AuthError(msg),
            StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(msg),
            StatusCode::NOT_FOUND => ProviderError::NotFound(msg),
            _ => ProviderError::NetworkError(msg),
        }
    }

    /// Map a transport or body decoding failure
    /// The URL is dropped first: some providers take their key as a query parameter
    pub fn from_reqwest(err: reqwest::Error, context: &str) -> Self {
        match err.status() {
            Some(status) => Self::from_status(status, context),
            None => ProviderError::NetworkError(format!("{}: {}", context, err.without_url())),
        }
    }
}

/// What the caller knows about the entity being illustrated
#[derive(Debug, Clone)]
pub struct PhotoSubject {
    pub entity_name: String,
    pub country: Option<String>,
    pub photo_reference: Option<String>,
}

impl PhotoSubject {
    /// Keyword query: name plus country to disambiguate same-named places
    pub fn qualified_query(&self) -> String {
        match self.country.as_deref().map(str::trim) {
            Some(country) if !country.is_empty() => {
                format!("{} {}", self.entity_name.trim(), country)
            }
            _ => self.entity_name.trim().to_string(),
        }
    }

    /// Keyword query on the name alone
    pub fn name_query(&self) -> String {
        self.entity_name.trim().to_string()
    }
}

/// Provider response details needed for attribution and follow-up calls
#[derive(Debug, Clone, Default)]
pub struct ImageMeta {
    pub author: Option<String>,
    pub author_url: Option<String>,
    pub license: Option<String>,
    /// Provider-side "photo was used" endpoint, when the provider has one
    pub download_location: Option<String>,
}

/// Raw image plus the handles needed to persist and credit it
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Provider handle of the photo (photo reference, photo id, file title)
    pub external_id: Option<String>,
    /// Query or reference that produced the photo
    pub source_ref: Option<String>,
    pub meta: ImageMeta,
}

/// Display credit for a provider-sourced image
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribution {
    pub text: String,
    pub license: Option<String>,
}

/// Uniform wrapper around one external photo API
#[async_trait]
pub trait PhotoProvider: Send + Sync {
    fn source(&self) -> PhotoSource;

    /// Credentials or feature flag present. Disabled providers are skipped
    /// without any network call.
    fn is_enabled(&self) -> bool;

    /// Query this provider would run for the subject; `None` skips it
    fn query_for(&self, subject: &PhotoSubject) -> Option<String>;

    async fn fetch_image(&self, query: &str) -> Result<FetchedImage, ProviderError>;

    /// Pure: derive the credit line from response metadata
    fn attribution(&self, meta: &ImageMeta) -> Attribution;

    fn rate_limit_status(&self) -> Option<RateLimitStatus> {
        None
    }

    /// Called once the photo has been persisted and is going to be shown
    async fn mark_used(&self, _meta: &ImageMeta) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Shared HTTP client for provider calls
/// Redirects are followed (the Places photo endpoint answers with a 302)
pub fn http_client(timeout: Duration, user_agent: &str) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .build()
}

/// Build the four adapters from configuration
/// DOCUMENTATION: Each adapter owns its quota; unconfigured adapters are
/// still built and simply report themselves disabled
pub fn from_config(config: &Config) -> Result<Vec<Arc<dyn PhotoProvider>>, reqwest::Error> {
    let client = http_client(config.provider_timeout(), &config.wikimedia_user_agent)?;

    let mut providers: Vec<Arc<dyn PhotoProvider>> = Vec::with_capacity(4);
    providers.push(Arc::new(PlacesPhotoProvider::new(
        client.clone(),
        config.google_places_api_key.clone(),
    )));
    providers.push(Arc::new(UnsplashProvider::new(
        client.clone(),
        config.unsplash_access_key.clone(),
        ProviderQuota::per_hour("unsplash", config.unsplash_hourly_limit),
    )));
    providers.push(Arc::new(CommonsProvider::new(
        client.clone(),
        config.wikimedia_enabled,
    )));
    providers.push(Arc::new(PexelsProvider::new(
        client,
        config.pexels_api_key.clone(),
        ProviderQuota::per_hour("pexels", config.pexels_hourly_limit),
    )));

    Ok(providers)
}

/// Download image bytes from a provider CDN URL
pub async fn download_image(
    client: &Client,
    url: &str,
    context: &str,
) -> Result<(Vec<u8>, String), ProviderError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(e, context))?;

    read_image(response, context).await
}

/// Check status and content type, then read the image body
pub async fn read_image(
    response: Response,
    context: &str,
) -> Result<(Vec<u8>, String), ProviderError> {
    if !response.status().is_success() {
        return Err(ProviderError::from_status(response.status(), context));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .unwrap_or_else(|| "image/jpeg".to_string());

    if !content_type.starts_with("image/") {
        return Err(ProviderError::NotFound(format!(
            "{} served {} instead of an image",
            context, content_type
        )));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProviderError::from_reqwest(e, context))?;

    if bytes.is_empty() {
        return Err(ProviderError::NotFound(format!("{} served an empty body", context)));
    }

    Ok((bytes.to_vec(), content_type))
}
