// src/services/providers/quota.rs
// DOCUMENTATION: Client-side request budget for quota-limited providers
// PURPOSE: Refuse calls locally once the hourly budget is spent

use super::ProviderError;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::header::HeaderMap;
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicI64, Ordering};

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const UNKNOWN: i64 = -1;

/// Snapshot of a provider's request budget
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    /// Client-side budget per hour
    pub limit_per_hour: u32,
    /// Last limit the provider reported, if any
    pub reported_limit: Option<u32>,
    /// Last remaining count the provider reported, if any
    pub reported_remaining: Option<u32>,
}

/// Hourly budget owned by one adapter instance
/// DOCUMENTATION: Built once at startup and moved into its adapter, so the
/// counter lives exactly as long as that adapter
pub struct ProviderQuota {
    name: &'static str,
    limit_per_hour: u32,
    limiter: DirectLimiter,
    reported_limit: AtomicI64,
    reported_remaining: AtomicI64,
}

impl ProviderQuota {
    pub fn per_hour(name: &'static str, limit: u32) -> Self {
        let burst = NonZeroU32::new(limit).unwrap_or(NonZeroU32::MIN);
        Self {
            name,
            limit_per_hour: burst.get(),
            limiter: RateLimiter::direct(Quota::per_hour(burst)),
            reported_limit: AtomicI64::new(UNKNOWN),
            reported_remaining: AtomicI64::new(UNKNOWN),
        }
    }

    /// Take one request from the budget
    pub fn try_acquire(&self) -> Result<(), ProviderError> {
        self.limiter.check().map_err(|_| {
            ProviderError::RateLimited(format!(
                "{} local budget of {}/hour exhausted",
                self.name, self.limit_per_hour
            ))
        })
    }

    /// Remember X-Ratelimit-Limit / X-Ratelimit-Remaining from a response
    pub fn observe_headers(&self, headers: &HeaderMap) {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok())
        };

        if let Some(limit) = read("x-ratelimit-limit") {
            self.reported_limit.store(limit as i64, Ordering::Relaxed);
        }
        if let Some(remaining) = read("x-ratelimit-remaining") {
            self.reported_remaining.store(remaining as i64, Ordering::Relaxed);
            if remaining == 0 {
                log::warn!("{} reports its request quota is exhausted", self.name);
            }
        }
    }

    pub fn status(&self) -> RateLimitStatus {
        let load = |value: &AtomicI64| {
            let v = value.load(Ordering::Relaxed);
            (v >= 0).then_some(v as u32)
        };

        RateLimitStatus {
            limit_per_hour: self.limit_per_hour,
            reported_limit: load(&self.reported_limit),
            reported_remaining: load(&self.reported_remaining),
        }
    }
}
