/// Shared application state and its registration on the actix app
use actix_web::web;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::db::{MembershipDirectory, SqliteStore, VideoStore};
use crate::error::Result;
use crate::handlers;
use crate::services::{IntakeService, TranscodeQueue, TranscodeWorker, Transcoder, VideoLayout};
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub store: SqliteStore,
    pub sessions: Arc<SessionStore>,
    pub intake: web::Data<IntakeService>,
    pub queue: web::Data<TranscodeQueue>,
}

impl AppState {
    /// Wire the pipeline and start the transcode queue
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        config: &Config,
        store: SqliteStore,
        sessions: Arc<SessionStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let video_store: Arc<dyn VideoStore> = Arc::new(store.clone());

        let worker = Arc::new(TranscodeWorker::from_config(
            video_store.clone(),
            transcoder,
            &config.transcode,
        ));
        let queue = TranscodeQueue::start(
            worker,
            config.transcode.concurrency,
            config.transcode.queue_capacity,
        );

        let intake = IntakeService::new(
            VideoLayout::new(&config.storage.videos_dir),
            video_store,
            config.storage.max_upload_bytes,
        );

        Self {
            store,
            sessions,
            intake: web::Data::new(intake),
            queue: web::Data::new(queue),
        }
    }

    /// Re-enqueue videos a previous process left pending
    pub async fn recover(&self) -> Result<usize> {
        self.queue
            .recover_pending(&self.store, self.intake.layout())
            .await
    }

    pub async fn shutdown(&self, grace: Duration) {
        self.queue.shutdown(grace).await;
    }

    /// App data and routes for one actix worker
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        let members: Arc<dyn MembershipDirectory> = Arc::new(self.store.clone());
        let videos: Arc<dyn VideoStore> = Arc::new(self.store.clone());

        cfg.app_data(web::Data::new(self.store.clone()))
            .app_data(web::Data::new(self.sessions.clone()))
            .app_data(web::Data::new(members))
            .app_data(web::Data::new(videos))
            .app_data(self.intake.clone())
            .app_data(self.queue.clone());

        handlers::configure_routes(cfg);
    }
}
