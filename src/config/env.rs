// src/config/env.rs
// DOCUMENTATION: Environment variable management
// PURPOSE: Load and validate configuration from .env files

use dotenv::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Application configuration loaded from environment variables
/// DOCUMENTATION: Centralizes all configuration in one struct
/// Load with Config::from_env() at application startup
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string
    /// Empty means the photo cache lives in process memory only
    pub database_url: String,

    /// Server bind address (e.g., "127.0.0.1")
    pub server_address: String,

    /// Server listen port (default 8003)
    pub server_port: u16,

    /// Environment: development, staging, production
    pub environment: String,

    /// Log level: debug, info, warn, error
    pub log_level: String,

    /// Admin authentication token (for refresh and provider status endpoints)
    pub admin_token: String,

    /// Maximum connections in database pool
    pub db_max_connections: u32,

    /// Connection timeout in seconds
    pub db_connection_timeout: u64,

    /// Google Places API key (photo references)
    pub google_places_api_key: String,

    /// Unsplash access key
    pub unsplash_access_key: String,

    /// Client-side Unsplash budget per hour
    pub unsplash_hourly_limit: u32,

    /// Wikimedia Commons needs no key, only a flag and a descriptive User-Agent
    pub wikimedia_enabled: bool,
    pub wikimedia_user_agent: String,

    /// Pexels API key
    pub pexels_api_key: String,

    /// Client-side Pexels budget per hour
    pub pexels_hourly_limit: u32,

    /// Object storage base URL (e.g., https://xyz.supabase.co)
    pub storage_url: String,

    /// Object storage service key
    pub storage_service_key: String,

    /// Bucket that holds cached photos
    pub photo_bucket: String,

    /// Upper bound for a single provider fetch, in seconds
    pub provider_timeout_secs: u64,

    /// Upper bound for a whole resolution, in seconds
    pub resolve_deadline_secs: u64,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    /// DOCUMENTATION: Reads from .env or process environment
    /// Called once at application startup
    pub fn from_env() -> Self {
        dotenv().ok();

        Config {
            database_url: var_or("DATABASE_URL", ""),
            server_address: var_or("SERVER_ADDRESS", "127.0.0.1"),
            server_port: parse_or("SERVER_PORT", 8003),
            environment: var_or("ENVIRONMENT", "development"),
            log_level: var_or("LOG_LEVEL", "info"),
            admin_token: var_or("ADMIN_TOKEN", "admin-token-dev"),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 20),
            db_connection_timeout: parse_or("DB_CONNECTION_TIMEOUT", 30),

            google_places_api_key: var_or("GOOGLE_PLACES_API_KEY", ""),
            unsplash_access_key: var_or("UNSPLASH_ACCESS_KEY", ""),
            unsplash_hourly_limit: parse_or("UNSPLASH_HOURLY_LIMIT", 50),
            wikimedia_enabled: parse_or("WIKIMEDIA_ENABLED", true),
            wikimedia_user_agent: var_or(
                "WIKIMEDIA_USER_AGENT",
                concat!("travel-media/", env!("CARGO_PKG_VERSION")),
            ),
            pexels_api_key: var_or("PEXELS_API_KEY", ""),
            pexels_hourly_limit: parse_or("PEXELS_HOURLY_LIMIT", 200),

            storage_url: var_or("STORAGE_URL", ""),
            storage_service_key: var_or("STORAGE_SERVICE_KEY", ""),
            photo_bucket: var_or("PHOTO_BUCKET", "place-photos"),

            provider_timeout_secs: parse_or("PROVIDER_TIMEOUT_SECS", 8),
            resolve_deadline_secs: parse_or("RESOLVE_DEADLINE_SECS", 25),
        }
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs.max(1))
    }

    pub fn resolve_deadline(&self) -> Duration {
        Duration::from_secs(self.resolve_deadline_secs.max(1))
    }

    /// Validate critical configuration
    /// DOCUMENTATION: Ensures application can start safely
    /// Missing provider keys only disable that provider
    pub fn validate(&self) -> Result<(), String> {
        if self.storage_url.is_empty() || self.storage_service_key.is_empty() {
            return Err("STORAGE_URL and STORAGE_SERVICE_KEY are required".to_string());
        }

        if self.database_url.is_empty() {
            log::warn!("DATABASE_URL not configured - photo cache will not survive restarts");
        }
        if self.google_places_api_key.is_empty() {
            log::warn!("GOOGLE_PLACES_API_KEY not configured - places photos disabled");
        }
        if self.unsplash_access_key.is_empty() {
            log::warn!("UNSPLASH_ACCESS_KEY not configured - unsplash search disabled");
        }
        if !self.wikimedia_enabled {
            log::warn!("WIKIMEDIA_ENABLED=false - commons search disabled");
        }
        if self.pexels_api_key.is_empty() {
            log::warn!("PEXELS_API_KEY not configured - pexels search disabled");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_durations_never_zero() {
        let mut config = Config::from_env();
        config.provider_timeout_secs = 0;
        config.resolve_deadline_secs = 0;
        assert_eq!(config.provider_timeout(), Duration::from_secs(1));
        assert_eq!(config.resolve_deadline(), Duration::from_secs(1));
    }

    #[test]
    fn test_validate_requires_storage() {
        let mut config = Config::from_env();
        config.storage_url = String::new();
        assert!(config.validate().is_err());

        config.storage_url = "https://storage.local".to_string();
        config.storage_service_key = "service-key".to_string();
        assert!(config.validate().is_ok());
    }
}
