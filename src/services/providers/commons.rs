// src/services/providers/commons.rs
// DOCUMENTATION: Wikimedia Commons search adapter
// PURPOSE: Openly licensed photos; the only provider that fills in a license

use super::{
    download_image, Attribution, FetchedImage, ImageMeta, PhotoProvider, PhotoSubject,
    ProviderError,
};
use crate::models::PhotoSource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const THUMB_WIDTH: &str = "1600";
const CANDIDATES: &str = "5";

/// Bitmap formats worth showing; Commons also hosts SVG, PDF, TIFF and video
const BITMAP_MIME: &[&str] = &["image/jpeg", "image/png", "image/webp"];

#[derive(Debug, Deserialize)]
struct ApiResponse {
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    pages: Vec<ApiPage>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    title: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: String,
    thumburl: Option<String>,
    mime: Option<String>,
    extmetadata: Option<ExtMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ExtMetadata {
    artist: Option<MetaValue>,
    license_short_name: Option<MetaValue>,
}

#[derive(Debug, Deserialize)]
struct MetaValue {
    value: String,
}

/// A search hit that can be downloaded
#[derive(Debug, PartialEq)]
struct Candidate {
    title: String,
    url: String,
    artist: Option<String>,
    license: Option<String>,
}

/// Wikimedia Commons client
pub struct CommonsProvider {
    client: Client,
    enabled: bool,
    api_url: String,
}

impl CommonsProvider {
    pub fn new(client: Client, enabled: bool) -> Self {
        Self {
            client,
            enabled,
            api_url: "https://commons.wikimedia.org/w/api.php".to_string(),
        }
    }
}

/// Artist fields are HTML fragments (`<a href=..>Name</a>`)
fn strip_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Best bitmap hit in search ranking order
fn pick_candidate(response: ApiResponse) -> Option<Candidate> {
    let mut pages = response.query?.pages;
    pages.sort_by_key(|p| p.index);

    pages.into_iter().find_map(|page| {
        let info = page.imageinfo.into_iter().next()?;
        let mime = info.mime.as_deref()?;
        if !BITMAP_MIME.contains(&mime) {
            return None;
        }

        let meta = info.extmetadata;
        let artist = meta
            .as_ref()
            .and_then(|m| m.artist.as_ref())
            .map(|v| strip_html(&v.value))
            .filter(|a| !a.is_empty());
        let license = meta
            .as_ref()
            .and_then(|m| m.license_short_name.as_ref())
            .map(|v| v.value.trim().to_string())
            .filter(|l| !l.is_empty());

        Some(Candidate {
            title: page.title,
            url: info.thumburl.unwrap_or(info.url),
            artist,
            license,
        })
    })
}

#[async_trait]
impl PhotoProvider for CommonsProvider {
    fn source(&self) -> PhotoSource {
        PhotoSource::Commons
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn query_for(&self, subject: &PhotoSubject) -> Option<String> {
        Some(subject.qualified_query())
    }

    async fn fetch_image(&self, query: &str) -> Result<FetchedImage, ProviderError> {
        log::debug!("Commons search: query={}", query);

        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrnamespace", "6"),
                ("gsrlimit", CANDIDATES),
                ("prop", "imageinfo"),
                ("iiprop", "url|mime|extmetadata"),
                ("iiurlwidth", THUMB_WIDTH),
            ])
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "commons search"))?;

        if !response.status().is_success() {
            return Err(ProviderError::from_status(response.status(), "commons search"));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, "commons search body"))?;

        let candidate = pick_candidate(body).ok_or_else(|| {
            ProviderError::NotFound(format!("commons has no bitmap for '{}'", query))
        })?;

        let (bytes, content_type) =
            download_image(&self.client, &candidate.url, "commons image").await?;

        Ok(FetchedImage {
            bytes,
            content_type,
            external_id: Some(candidate.title),
            source_ref: Some(query.to_string()),
            meta: ImageMeta {
                author: candidate.artist,
                author_url: None,
                license: candidate.license,
                download_location: None,
            },
        })
    }

    fn attribution(&self, meta: &ImageMeta) -> Attribution {
        let text = match meta.author.as_deref() {
            Some(author) => format!("{} via Wikimedia Commons", author),
            None => "Wikimedia Commons".to_string(),
        };

        Attribution {
            text,
            license: meta.license.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_body() -> serde_json::Value {
        serde_json::json!({
            "batchcomplete": true,
            "query": { "pages": [
                {
                    "title": "File:Tour Eiffel plan.svg",
                    "index": 1,
                    "imageinfo": [{
                        "url": "https://upload.wikimedia.org/plan.svg",
                        "mime": "image/svg+xml"
                    }]
                },
                {
                    "title": "File:Tour Eiffel Wikimedia Commons.jpg",
                    "index": 2,
                    "imageinfo": [{
                        "url": "https://upload.wikimedia.org/full.jpg",
                        "thumburl": "https://upload.wikimedia.org/1600px.jpg",
                        "mime": "image/jpeg",
                        "extmetadata": {
                            "Artist": { "value": "<a href=\"//commons.wikimedia.org/wiki/User:Benh\">Benh   LIEU SONG</a>" },
                            "LicenseShortName": { "value": "CC BY-SA 3.0" }
                        }
                    }]
                },
                {
                    "title": "File:Later.jpg",
                    "index": 3,
                    "imageinfo": [{ "url": "https://upload.wikimedia.org/later.jpg", "mime": "image/jpeg" }]
                }
            ]}
        })
    }

    #[test]
    fn test_pick_first_bitmap_in_rank_order() {
        let response: ApiResponse = serde_json::from_value(search_body()).unwrap();
        let candidate = pick_candidate(response).unwrap();

        assert_eq!(candidate.title, "File:Tour Eiffel Wikimedia Commons.jpg");
        assert_eq!(candidate.url, "https://upload.wikimedia.org/1600px.jpg");
        assert_eq!(candidate.artist.as_deref(), Some("Benh LIEU SONG"));
        assert_eq!(candidate.license.as_deref(), Some("CC BY-SA 3.0"));
    }

    #[test]
    fn test_no_query_block_means_no_candidate() {
        let response: ApiResponse = serde_json::from_value(serde_json::json!({
            "batchcomplete": true
        }))
        .unwrap();
        assert!(pick_candidate(response).is_none());
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(strip_html("<span>Jane <b>Doe</b></span>"), "Jane Doe");
        assert_eq!(strip_html("Plain"), "Plain");
    }

    #[test]
    fn test_attribution_carries_license() {
        let provider = CommonsProvider::new(Client::new(), true);
        let attribution = provider.attribution(&ImageMeta {
            author: Some("Benh LIEU SONG".to_string()),
            license: Some("CC BY-SA 3.0".to_string()),
            ..Default::default()
        });

        assert_eq!(attribution.text, "Benh LIEU SONG via Wikimedia Commons");
        assert_eq!(attribution.license.as_deref(), Some("CC BY-SA 3.0"));
    }

    #[test]
    fn test_flag_controls_enabled() {
        assert!(!CommonsProvider::new(Client::new(), false).is_enabled());
    }
}
