// src/services/media_orchestrator.rs
// DOCUMENTATION: Photo resolution waterfall
// PURPOSE: Cache lookup, then providers in fixed priority, then upload and cache write

use crate::errors::MediaError;
use crate::models::{
    EntityKey, NewPhotoRecord, PhotoRecord, PhotoSource, ResolveRequest, ResolvedPhoto,
};
use crate::services::providers::{
    FetchedImage, PhotoProvider, PhotoSubject, ProviderError, RateLimitStatus,
};
use crate::services::{BlobUploader, PhotoCache};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{timeout, Instant};

const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(8);
const DEFAULT_RESOLVE_DEADLINE: Duration = Duration::from_secs(25);

/// Per-provider outcome counters
#[derive(Debug, Default)]
struct ProviderCounters {
    attempts: AtomicU64,
    successes: AtomicU64,
    not_found: AtomicU64,
    rate_limited: AtomicU64,
    auth_errors: AtomicU64,
    network_errors: AtomicU64,
    upload_failures: AtomicU64,
}

impl ProviderCounters {
    fn record_failure(&self, err: &ProviderError) {
        let counter = match err {
            ProviderError::NotFound(_) => &self.not_found,
            ProviderError::RateLimited(_) => &self.rate_limited,
            ProviderError::AuthError(_) => &self.auth_errors,
            ProviderError::NetworkError(_) => &self.network_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> CountersSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        CountersSnapshot {
            attempts: load(&self.attempts),
            successes: load(&self.successes),
            not_found: load(&self.not_found),
            rate_limited: load(&self.rate_limited),
            auth_errors: load(&self.auth_errors),
            network_errors: load(&self.network_errors),
            upload_failures: load(&self.upload_failures),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountersSnapshot {
    pub attempts: u64,
    pub successes: u64,
    pub not_found: u64,
    pub rate_limited: u64,
    pub auth_errors: u64,
    pub network_errors: u64,
    pub upload_failures: u64,
}

/// Observability view of one provider
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderReport {
    pub source: PhotoSource,
    pub enabled: bool,
    pub rate_limit: Option<RateLimitStatus>,
    pub counters: CountersSnapshot,
}

struct ProviderSlot {
    provider: Arc<dyn PhotoProvider>,
    counters: ProviderCounters,
}

/// Resolutions currently running, keyed by entity.
/// Waiters hold a receiver; the leader's sender closes when it finishes.
type InFlight = Arc<Mutex<HashMap<EntityKey, watch::Receiver<()>>>>;

enum Flight {
    Leader(FlightGuard),
    Waiter(watch::Receiver<()>),
}

/// Removes the in-flight entry and wakes waiters when the leader is done,
/// including on cancellation
struct FlightGuard {
    key: EntityKey,
    in_flight: InFlight,
    _done: watch::Sender<()>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        map.remove(&self.key);
    }
}

/// Media orchestrator
/// DOCUMENTATION: Answers "give me a representative photo for this place".
///
/// Process:
/// 1. Unless forced, return the cached primary record (no network calls)
/// 2. Try enabled providers one at a time in priority order
///    (places, unsplash, commons, pexels)
/// 3. Upload the first image that arrives, write the cache record, return
/// 4. NoImageAvailable when every provider was skipped or failed
pub struct MediaOrchestrator {
    providers: Vec<ProviderSlot>,
    uploader: BlobUploader,
    cache: Arc<dyn PhotoCache>,
    provider_timeout: Duration,
    resolve_deadline: Duration,
    in_flight: InFlight,
}

impl MediaOrchestrator {
    /// Providers are ordered by source priority regardless of input order
    pub fn new(
        providers: Vec<Arc<dyn PhotoProvider>>,
        uploader: BlobUploader,
        cache: Arc<dyn PhotoCache>,
    ) -> Self {
        let mut providers: Vec<ProviderSlot> = providers
            .into_iter()
            .map(|provider| ProviderSlot {
                provider,
                counters: ProviderCounters::default(),
            })
            .collect();
        providers.sort_by_key(|slot| slot.provider.source());

        Self {
            providers,
            uploader,
            cache,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            resolve_deadline: DEFAULT_RESOLVE_DEADLINE,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_timeouts(mut self, provider_timeout: Duration, resolve_deadline: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self.resolve_deadline = resolve_deadline;
        self
    }

    pub fn uploader(&self) -> &BlobUploader {
        &self.uploader
    }

    /// Resolve a representative photo for an entity
    pub async fn resolve(&self, req: &ResolveRequest) -> Result<ResolvedPhoto, MediaError> {
        let key = req.key();

        if req.force_refresh {
            log::info!("Force refresh requested for {}", key);
            return self.run_waterfall(req, &key).await;
        }

        if let Some(hit) = self.cached(&key).await {
            return Ok(hit.to_resolved(true));
        }

        match self.join_or_lead(&key) {
            Flight::Leader(guard) => {
                // A previous leader may have finished between our miss and
                // taking the lead
                if let Some(hit) = self.cached(&key).await {
                    return Ok(hit.to_resolved(true));
                }
                let result = self.run_waterfall(req, &key).await;
                drop(guard);
                result
            }
            Flight::Waiter(mut done) => {
                log::debug!("Waiting on in-flight resolution for {}", key);
                // Err only means the leader's sender is gone, which is the signal
                let _ = done.changed().await;

                if let Some(hit) = self.cached(&key).await {
                    return Ok(hit.to_resolved(true));
                }
                log::debug!("In-flight resolution for {} left no record, retrying", key);
                self.run_waterfall(req, &key).await
            }
        }
    }

    /// Provider status for the admin endpoint
    pub fn provider_report(&self) -> Vec<ProviderReport> {
        self.providers
            .iter()
            .map(|slot| ProviderReport {
                source: slot.provider.source(),
                enabled: slot.provider.is_enabled(),
                rate_limit: slot.provider.rate_limit_status(),
                counters: slot.counters.snapshot(),
            })
            .collect()
    }

    /// A cache read failure is treated as a miss
    async fn cached(&self, key: &EntityKey) -> Option<PhotoRecord> {
        match self.cache.get(key).await {
            Ok(Some(record)) if !record.cached_url.is_empty() => {
                log::debug!("Photo cache hit for {} ({})", key, record.source);
                Some(record)
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("Photo cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    fn join_or_lead(&self, key: &EntityKey) -> Flight {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(done) = map.get(key) {
            return Flight::Waiter(done.clone());
        }

        let (tx, rx) = watch::channel(());
        map.insert(key.clone(), rx);
        Flight::Leader(FlightGuard {
            key: key.clone(),
            in_flight: self.in_flight.clone(),
            _done: tx,
        })
    }

    async fn run_waterfall(
        &self,
        req: &ResolveRequest,
        key: &EntityKey,
    ) -> Result<ResolvedPhoto, MediaError> {
        let subject = PhotoSubject {
            entity_name: req.entity_name.clone(),
            country: req.country.clone(),
            photo_reference: req.photo_reference.clone(),
        };
        let deadline = Instant::now() + self.resolve_deadline;

        for slot in &self.providers {
            let provider = slot.provider.as_ref();
            let source = provider.source();

            if !provider.is_enabled() {
                log::debug!("{}: provider {} disabled, skipping", key, source);
                continue;
            }
            let Some(query) = provider.query_for(&subject) else {
                log::debug!("{}: nothing to ask provider {}, skipping", key, source);
                continue;
            };

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::warn!("{}: resolve deadline spent before trying {}", key, source);
                break;
            }
            let budget = remaining.min(self.provider_timeout);

            slot.counters.attempts.fetch_add(1, Ordering::Relaxed);
            let fetched = match timeout(budget, provider.fetch_image(&query)).await {
                Ok(Ok(image)) => image,
                Ok(Err(e)) => {
                    slot.counters.record_failure(&e);
                    log::warn!("{}: provider {} failed [{}]: {}", key, source, e.kind(), e);
                    continue;
                }
                Err(_) => {
                    let e = ProviderError::NetworkError(format!("timed out after {:?}", budget));
                    slot.counters.record_failure(&e);
                    log::warn!("{}: provider {} failed [{}]: {}", key, source, e.kind(), e);
                    continue;
                }
            };

            // Upload and cache write share what is left of the deadline
            let remaining = deadline.saturating_duration_since(Instant::now());
            let persisted =
                match timeout(remaining, self.persist(provider, fetched, req, key)).await {
                    Ok(result) => result,
                    Err(_) => Err(MediaError::UploadFailed(format!(
                        "resolve deadline spent while storing {} photo",
                        source
                    ))),
                };

            match persisted {
                Ok(resolved) => {
                    slot.counters.successes.fetch_add(1, Ordering::Relaxed);
                    log::info!("{}: resolved photo from {} -> {}", key, source, resolved.url);
                    return Ok(resolved);
                }
                Err(e) => {
                    slot.counters.upload_failures.fetch_add(1, Ordering::Relaxed);
                    log::warn!("{}: upload of {} photo failed: {}", key, source, e);
                }
            }
        }

        log::warn!("{}: no provider produced a photo", key);
        Err(MediaError::NoImageAvailable(req.describe()))
    }

    /// Upload, credit and cache a fetched image
    /// Only the upload can fail; a cache write failure is logged and swallowed
    async fn persist(
        &self,
        provider: &dyn PhotoProvider,
        fetched: FetchedImage,
        req: &ResolveRequest,
        key: &EntityKey,
    ) -> Result<ResolvedPhoto, MediaError> {
        let FetchedImage {
            bytes,
            content_type,
            external_id,
            source_ref,
            meta,
        } = fetched;
        let source = provider.source();
        let attribution = provider.attribution(&meta);
        log::debug!(
            "{}: crediting \"{}\" ({})",
            key,
            attribution.text,
            meta.author_url.as_deref().unwrap_or("no profile link")
        );

        let cached_url = self
            .uploader
            .upload(bytes, &content_type, source, key)
            .await?;

        if let Err(e) = provider.mark_used(&meta).await {
            log::warn!("{}: {} usage notification failed: {}", key, source, e);
        }

        let record = NewPhotoRecord {
            entity_type: req.entity_type,
            entity_id: req.entity_id.clone(),
            source,
            external_id,
            source_ref,
            cached_url: cached_url.clone(),
            attribution: Some(attribution.text.clone()),
            license: attribution.license.clone(),
        };
        if let Err(e) = self.cache.upsert(record).await {
            log::warn!(
                "{}: cache write failed, next request will re-run the waterfall: {}",
                key,
                e
            );
        }

        Ok(ResolvedPhoto {
            url: cached_url,
            source,
            attribution: Some(attribution.text),
            license: attribution.license,
            cached: false,
        })
    }
}
