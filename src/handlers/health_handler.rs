use std::sync::Arc;

use actix_web::{get, web, HttpResponse};

use crate::app_state::AppState;

#[get("/health")]
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Ready once the entity store answers. The analysis service is reported but
/// not probed; finalization still succeeds while it is down.
#[get("/health/ready")]
pub async fn health_check_ready(state: web::Data<Arc<AppState>>) -> HttpResponse {
    let store_error = state.store.health_check().await.err().map(|e| e.to_string());
    if let Some(error) = &store_error {
        log::warn!("Readiness check failed: {}", error);
    }

    let response = serde_json::json!({
        "status": if store_error.is_none() { "ready" } else { "not_ready" },
        "version": env!("CARGO_PKG_VERSION"),
        "store": {
            "backend": state.config.store_backend.as_str(),
            "reachable": store_error.is_none(),
            "error": store_error,
        },
        "analysis": {
            "endpoint": state.config.ai_service_url,
            "concurrency": state.config.analysis_concurrency,
        }
    });

    if store_error.is_none() {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}
