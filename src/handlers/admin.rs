// src/handlers/admin.rs
// DOCUMENTATION: Admin handlers for the media service
// PURPOSE: Forced refresh and provider status, behind X-Admin-Token

use super::media::check_request;
use crate::config::Config;
use crate::errors::MediaError;
use crate::models::ResolveRequest;
use crate::services::MediaOrchestrator;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use std::sync::Arc;

/// POST /admin/media/refresh
/// Re-run the provider waterfall for an entity and replace its cached photo
///
/// DOCUMENTATION: Same body as /media/resolve; forceRefresh is implied
pub async fn refresh_photo(
    orchestrator: web::Data<Arc<MediaOrchestrator>>,
    config: web::Data<Config>,
    req: HttpRequest,
    body: web::Json<ResolveRequest>,
) -> Result<impl Responder, MediaError> {
    verify_admin_token(&req, &config)?;

    check_request(&body)?;

    let mut request = body.into_inner();
    request.force_refresh = true;

    log::info!("Admin refresh requested for {}", request.key());

    let photo = orchestrator.resolve(&request).await?;
    Ok(HttpResponse::Ok().json(photo))
}

/// GET /admin/media/providers
/// Enabled flag, rate-limit status and outcome counters per provider
pub async fn provider_status(
    orchestrator: web::Data<Arc<MediaOrchestrator>>,
    config: web::Data<Config>,
    req: HttpRequest,
) -> Result<impl Responder, MediaError> {
    verify_admin_token(&req, &config)?;
    Ok(HttpResponse::Ok().json(orchestrator.provider_report()))
}

/// Verify admin authentication token
/// DOCUMENTATION: Checks X-Admin-Token header against configured admin token
fn verify_admin_token(req: &HttpRequest, config: &Config) -> Result<(), MediaError> {
    let token = req
        .headers()
        .get("X-Admin-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or(MediaError::Unauthorized)?;

    if token != config.admin_token {
        log::warn!("Invalid admin token attempt");
        return Err(MediaError::Unauthorized);
    }

    Ok(())
}

/// Configuration for admin routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin/media")
            .route("/refresh", web::post().to(refresh_photo))
            .route("/providers", web::get().to(provider_status)),
    );
}
