// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, cache, storage and providers, then start the HTTP server

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use config::Config;
use db::PgPhotoCache;
use dotenv::dotenv;
use services::{providers, BlobUploader, MediaOrchestrator, MemoryPhotoCache, PhotoCache, StorageApi};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Load configuration
    let config = Config::from_env();

    // 3. Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        let log_level = if !config.log_level.is_empty() {
            config.log_level.as_str()
        } else {
            "info,actix_web=info,sqlx=warn"
        };
        std::env::set_var("RUST_LOG", log_level);
    }
    env_logger::init();

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting travel-media service...");
    log::info!("Environment: {}", config.environment);
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Photo cache: Postgres when configured, in-process otherwise
    let cache: Arc<dyn PhotoCache> = if config.database_url.is_empty() {
        log::info!("Using in-memory photo cache");
        Arc::new(MemoryPhotoCache::new())
    } else {
        let pool = config::init_db_pool(&config)
            .await
            .context("failed to connect to database")?;
        Arc::new(PgPhotoCache::new(pool))
    };

    // 5. Object storage
    let http = providers::http_client(config.provider_timeout(), &config.wikimedia_user_agent)
        .context("failed to build HTTP client")?;
    let store = StorageApi::new(http, &config.storage_url, config.storage_service_key.clone());
    let uploader = BlobUploader::new(Arc::new(store), config.photo_bucket.clone());

    // 6. Providers and orchestrator
    let photo_providers =
        providers::from_config(&config).context("failed to build provider clients")?;
    let orchestrator = Arc::new(
        MediaOrchestrator::new(photo_providers, uploader, cache)
            .with_timeouts(config.provider_timeout(), config.resolve_deadline()),
    );

    orchestrator
        .uploader()
        .ensure_bucket()
        .await
        .with_context(|| format!("failed to prepare bucket '{}'", config.photo_bucket))?;
    log::info!("Photo bucket '{}' ready", config.photo_bucket);

    // 7. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let config_clone = config.clone();

    HttpServer::new(move || {
        App::new()
            // Application state (config and orchestrator)
            .app_data(web::Data::new(config_clone.clone()))
            .app_data(web::Data::new(orchestrator.clone()))
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::media_config)
            .configure(handlers::admin_config)
    })
    .bind(&server_addr)
    .with_context(|| format!("failed to bind {}", server_addr))?
    .run()
    .await?;

    Ok(())
}
