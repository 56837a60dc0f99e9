/// HTTP handlers for clip-service
///
/// - Videos: upload intake and the per-conversation feed
/// - Health: liveness, readiness and Prometheus metrics
pub mod health;
pub mod videos;

use actix_web::web;

pub use health::{health, liveness, metrics_handler, readiness};
pub use videos::{list_videos, upload_video};

/// Register every route of the service
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/upload", web::post().to(upload_video))
            .route("/videos", web::get().to(list_videos))
            .service(
                web::scope("/v1/health")
                    .route("", web::get().to(health))
                    .route("/ready", web::get().to(readiness))
                    .route("/live", web::get().to(liveness)),
            ),
    )
    .route("/metrics", web::get().to(metrics_handler));
}
