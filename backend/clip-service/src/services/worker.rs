/// Transcode worker: drives one pending video to a terminal status
///
/// Outcomes:
/// - success: only the canonical file remains, status `ready`
/// - exhaustion: only the original remains, status `error`
///
/// The worker is the only writer of terminal statuses.
use resilience::{with_retry, RetryConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use video_core::{VideoId, VideoStatus};

use crate::config::TranscodeConfig;
use crate::db::VideoStore;
use crate::metrics;
use crate::services::intake::remove_quietly;
use crate::services::transcoder::{TranscodeError, Transcoder};

/// Work item handed from intake (or recovery) to the queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    pub video_id: VideoId,
    pub original_path: PathBuf,
    pub canonical_path: PathBuf,
}

pub struct TranscodeWorker {
    store: Arc<dyn VideoStore>,
    transcoder: Arc<dyn Transcoder>,
    retry: RetryConfig,
}

impl TranscodeWorker {
    pub fn new(
        store: Arc<dyn VideoStore>,
        transcoder: Arc<dyn Transcoder>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            store,
            transcoder,
            retry,
        }
    }

    /// Fixed-delay retry policy from configuration
    pub fn from_config(
        store: Arc<dyn VideoStore>,
        transcoder: Arc<dyn Transcoder>,
        config: &TranscodeConfig,
    ) -> Self {
        Self::new(
            store,
            transcoder,
            RetryConfig::fixed(config.max_attempts, config.retry_delay()),
        )
    }

    /// Run the job to completion and return the terminal status it reached
    pub async fn run(&self, job: TranscodeJob) -> VideoStatus {
        let started = Instant::now();
        info!(video_id = %job.video_id, input = %job.original_path.display(), "transcode started");

        let status = match self.reconcile(&job).await {
            Some(status) => status,
            None => self.convert(&job).await,
        };

        self.finish(&job.video_id, status).await;
        metrics::TRANSCODE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());
        status
    }

    /// Settle jobs whose original is already gone, as left by an interrupted run
    async fn reconcile(&self, job: &TranscodeJob) -> Option<VideoStatus> {
        if file_exists(&job.original_path).await {
            return None;
        }

        if file_exists(&job.canonical_path).await {
            info!(video_id = %job.video_id, "original already consumed, canonical present");
            Some(VideoStatus::Ready)
        } else {
            error!(
                video_id = %job.video_id,
                path = %job.original_path.display(),
                "original missing and no canonical output"
            );
            Some(VideoStatus::Error)
        }
    }

    async fn convert(&self, job: &TranscodeJob) -> VideoStatus {
        let transcoder = &self.transcoder;

        let result = with_retry(self.retry.clone(), move |attempt| async move {
            match attempt_once(transcoder.as_ref(), job).await {
                Ok(()) => {
                    metrics::TRANSCODE_ATTEMPTS_TOTAL
                        .with_label_values(&["success"])
                        .inc();
                    Ok(())
                }
                Err(err) => {
                    metrics::TRANSCODE_ATTEMPTS_TOTAL
                        .with_label_values(&["failure"])
                        .inc();
                    // A failed attempt never leaves a partial canonical file behind
                    remove_quietly(&job.canonical_path).await;
                    warn!(video_id = %job.video_id, attempt, error = %err, "transcode attempt failed");
                    Err(err)
                }
            }
        })
        .await;

        match result {
            Ok(()) => {
                if let Err(e) = tokio::fs::remove_file(&job.original_path).await {
                    warn!(
                        video_id = %job.video_id,
                        error = %e,
                        path = %job.original_path.display(),
                        "failed to delete original after conversion"
                    );
                }
                VideoStatus::Ready
            }
            Err(err) => {
                let attempts = err.attempts();
                let last_error = err.into_last_error();
                error!(
                    video_id = %job.video_id,
                    attempts,
                    error = %last_error,
                    "transcode failed permanently, original kept"
                );
                remove_quietly(&job.canonical_path).await;
                VideoStatus::Error
            }
        }
    }

    async fn finish(&self, video_id: &VideoId, status: VideoStatus) {
        metrics::TRANSCODE_JOBS_TOTAL
            .with_label_values(&[status.as_str()])
            .inc();

        match self.store.set_status(video_id, status).await {
            Ok(()) => info!(video_id = %video_id, status = %status, "transcode finished"),
            Err(e) => {
                metrics::STATUS_WRITE_FAILURES_TOTAL.inc();
                error!(
                    video_id = %video_id,
                    status = %status,
                    error = %e,
                    "failed to record terminal status"
                );
            }
        }
    }
}

async fn attempt_once(transcoder: &dyn Transcoder, job: &TranscodeJob) -> Result<(), TranscodeError> {
    transcoder
        .transcode(&job.original_path, &job.canonical_path)
        .await?;

    if file_exists(&job.canonical_path).await {
        Ok(())
    } else {
        Err(TranscodeError::MissingOutput(job.canonical_path.clone()))
    }
}

async fn file_exists(path: &std::path::Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}
