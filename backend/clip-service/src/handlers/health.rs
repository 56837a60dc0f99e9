/// Health and metrics endpoints
use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::db::SqliteStore;
use crate::metrics;
use crate::services::TranscodeQueue;

pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub async fn liveness() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "alive" }))
}

/// Ready when the database answers and the transcode queue accepts work
pub async fn readiness(
    store: web::Data<SqliteStore>,
    queue: web::Data<TranscodeQueue>,
) -> HttpResponse {
    if let Err(e) = store.ping().await {
        tracing::warn!(error = %e, "readiness check: database unavailable");
        return HttpResponse::ServiceUnavailable().json(json!({
            "status": "unavailable",
            "database": "down",
        }));
    }

    if !queue.is_accepting() {
        return HttpResponse::ServiceUnavailable().json(json!({
            "status": "unavailable",
            "transcode_queue": "closed",
        }));
    }

    HttpResponse::Ok().json(json!({
        "status": "ready",
        "transcode_queue": {
            "queued": queue.depth(),
            "in_flight": queue.in_flight(),
        },
    }))
}

pub async fn metrics_handler() -> HttpResponse {
    match metrics::render() {
        Ok((content_type, body)) => HttpResponse::Ok().content_type(content_type).body(body),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            HttpResponse::InternalServerError().finish()
        }
    }
}
