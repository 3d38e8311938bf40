// src/services/providers/places.rs
// DOCUMENTATION: Google Places photo adapter
// PURPOSE: Fetch the photo a caller already referenced by photo_reference

use super::{
    read_image, Attribution, FetchedImage, ImageMeta, PhotoProvider, PhotoSubject,
    ProviderError,
};
use crate::models::PhotoSource;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};

/// Width requested from the photo endpoint
const MAX_WIDTH: u32 = 1600;

const CONTEXT: &str = "google places photo";

/// Google Places photo client
/// DOCUMENTATION: Directly addressed source; only runs when the caller
/// supplies a photo reference, so it never performs a keyword search
pub struct PlacesPhotoProvider {
    /// HTTP client for making requests
    client: Client,
    /// Google Places API key
    api_key: String,
    /// Base URL for Google Places API
    base_url: String,
}

impl PlacesPhotoProvider {
    pub fn new(client: Client, api_key: String) -> Self {
        Self {
            client,
            api_key,
            base_url: "https://maps.googleapis.com/maps/api/place".to_string(),
        }
    }

    /// Photo endpoint request for a reference
    /// DOCUMENTATION: The endpoint redirects to the image itself. Parameters go
    /// through `query` so the caller-supplied reference is URL-encoded
    fn photo_request(&self, photo_reference: &str, max_width: u32) -> RequestBuilder {
        self.client
            .get(format!("{}/photo", self.base_url))
            .query(&[("maxwidth", max_width)])
            .query(&[("photoreference", photo_reference), ("key", self.api_key.as_str())])
    }
}

/// The photo endpoint answers an unknown or expired reference with 400
fn classify_status(status: StatusCode) -> ProviderError {
    if status == StatusCode::BAD_REQUEST {
        ProviderError::NotFound(format!("{} returned {}", CONTEXT, status))
    } else {
        ProviderError::from_status(status, CONTEXT)
    }
}

#[async_trait]
impl PhotoProvider for PlacesPhotoProvider {
    fn source(&self) -> PhotoSource {
        PhotoSource::Places
    }

    fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn query_for(&self, subject: &PhotoSubject) -> Option<String> {
        subject
            .photo_reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
    }

    async fn fetch_image(&self, photo_reference: &str) -> Result<FetchedImage, ProviderError> {
        log::debug!("Google Places photo fetch: reference={}", photo_reference);

        let response = self
            .photo_request(photo_reference, MAX_WIDTH)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, CONTEXT))?;

        if !response.status().is_success() {
            return Err(classify_status(response.status()));
        }
        let (bytes, content_type) = read_image(response, CONTEXT).await?;

        Ok(FetchedImage {
            bytes,
            content_type,
            external_id: Some(photo_reference.to_string()),
            source_ref: Some(photo_reference.to_string()),
            meta: ImageMeta::default(),
        })
    }

    fn attribution(&self, meta: &ImageMeta) -> Attribution {
        let text = match meta.author.as_deref() {
            Some(author) => format!("Photo by {} via Google Places", author),
            None => "Photo via Google Places".to_string(),
        };

        Attribution {
            text,
            license: None,
        }
    }
}
