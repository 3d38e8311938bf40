// src/handlers/media.rs
// DOCUMENTATION: HTTP handler for photo resolution
// PURPOSE: Parse the request, call the orchestrator, serialize {url, source, attribution, cached}

use crate::errors::MediaError;
use crate::models::ResolveRequest;
use crate::services::MediaOrchestrator;
use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

/// POST /media/resolve
/// Resolve a representative photo for a destination, attraction, restaurant or accommodation
pub async fn resolve_photo(
    orchestrator: web::Data<Arc<MediaOrchestrator>>,
    req: web::Json<ResolveRequest>,
) -> Result<impl Responder, MediaError> {
    check_request(&req)?;

    let photo = orchestrator.resolve(&req.into_inner()).await?;
    Ok(HttpResponse::Ok().json(photo))
}

/// Field limits via validator, then reject names and ids that are only whitespace
pub(crate) fn check_request(req: &ResolveRequest) -> Result<(), MediaError> {
    if let Err(e) = req.validate() {
        return Err(MediaError::ValidationError(e.to_string()));
    }
    if req.entity_id.trim().is_empty() || req.entity_name.trim().is_empty() {
        return Err(MediaError::InvalidInput(
            "entityId and entityName must not be blank".to_string(),
        ));
    }
    Ok(())
}

/// Configuration for media routes
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/media").route("/resolve", web::post().to(resolve_photo)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PhotoSource;
    use crate::services::providers::PhotoProvider;
    use crate::services::testing::{MemoryBlobStore, ScriptedProvider};
    use crate::services::{BlobUploader, MemoryPhotoCache};
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    fn orchestrator(providers: Vec<Arc<dyn PhotoProvider>>) -> Arc<MediaOrchestrator> {
        Arc::new(MediaOrchestrator::new(
            providers,
            BlobUploader::new(Arc::new(MemoryBlobStore::new()), "place-photos"),
            Arc::new(MemoryPhotoCache::new()),
        ))
    }

    #[actix_web::test]
    async fn test_resolve_then_cached() {
        let orchestrator = orchestrator(vec![
            ScriptedProvider::succeeding(PhotoSource::Places) as Arc<dyn PhotoProvider>
        ]);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(orchestrator))
                .configure(config),
        )
        .await;

        let body = json!({
            "entityType": "destination",
            "entityId": "42",
            "entityName": "Eiffel Tower",
            "photoReference": "ref-123"
        });

        let first: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/media/resolve")
                .set_json(&body)
                .to_request(),
        )
        .await;
        assert_eq!(first["source"], "places");
        assert_eq!(first["cached"], false);

        let second: Value = test::call_and_read_body_json(
            &app,
            test::TestRequest::post()
                .uri("/media/resolve")
                .set_json(&body)
                .to_request(),
        )
        .await;
        assert_eq!(second["cached"], true);
        assert_eq!(second["url"], first["url"]);
    }

    #[actix_web::test]
    async fn test_no_image_is_404() {
        let orchestrator = orchestrator(vec![
            ScriptedProvider::disabled(PhotoSource::Pexels) as Arc<dyn PhotoProvider>
        ]);
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(orchestrator))
                .configure(config),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/media/resolve")
                .set_json(json!({
                    "entityType": "restaurant",
                    "entityId": "r-1",
                    "entityName": "Chez Nobody"
                }))
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "NO_IMAGE_AVAILABLE");
    }

    #[actix_web::test]
    async fn test_invalid_request_is_400() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(orchestrator(Vec::new())))
                .configure(config),
        )
        .await;

        let resp = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/media/resolve")
                .set_json(json!({
                    "entityType": "attraction",
                    "entityId": "",
                    "entityName": "Louvre"
                }))
                .to_request(),
        )
        .await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_blank_name_is_invalid_input() {
        let req: ResolveRequest = serde_json::from_value(json!({
            "entityType": "destination",
            "entityId": "42",
            "entityName": "   "
        }))
        .unwrap();

        match check_request(&req) {
            Err(MediaError::InvalidInput(_)) => {}
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }
}
