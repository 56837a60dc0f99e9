//! Shared harness for the HTTP integration suites
#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, Error};
use async_trait::async_trait;
use clip_service::config::{
    AppConfig, Config, DatabaseConfig, SessionConfig, StorageConfig, TranscodeConfig,
};
use clip_service::db::{SqliteStore, VideoStore};
use clip_service::middleware::RequestMetrics;
use clip_service::models::VideoRecord;
use clip_service::services::{TranscodeError, Transcoder};
use clip_service::session::{session_cookie, SessionStore};
use clip_service::AppState;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use video_core::{VideoId, VideoStatus};

pub const BOUNDARY: &str = "----clip-service-test-boundary";

/// How the fake converter behaves on every call
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Write a canonical file and succeed
    Succeed,
    /// Leave a partial file behind and fail
    Fail,
    /// Never finish
    Stall,
}

pub struct FakeTranscoder {
    behavior: Behavior,
    attempts: AtomicU32,
}

impl FakeTranscoder {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            attempts: AtomicU32::new(0),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(&self, _input: &Path, output: &Path) -> Result<(), TranscodeError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Succeed => {
                tokio::fs::write(output, b"canonical mp4").await.unwrap();
                Ok(())
            }
            Behavior::Fail => {
                tokio::fs::write(output, b"trunc").await.unwrap();
                Err(TranscodeError::TimedOut(Duration::from_millis(1)))
            }
            Behavior::Stall => {
                futures::future::pending::<()>().await;
                Ok(())
            }
        }
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub config: Config,
    pub store: SqliteStore,
    pub sessions: Arc<SessionStore>,
    pub transcoder: Arc<FakeTranscoder>,
    pub state: AppState,
}

impl TestEnv {
    pub async fn new(behavior: Behavior) -> Self {
        Self::with_limit(behavior, 10 * 1024 * 1024).await
    }

    pub async fn with_limit(behavior: Behavior, max_upload_bytes: u64) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().join("videos"), max_upload_bytes);
        Self::from_config(behavior, dir, config).await
    }

    /// Small worker pool and queue to exercise backpressure
    pub async fn with_queue(behavior: Behavior, concurrency: usize, queue_capacity: usize) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path().join("videos"), 10 * 1024 * 1024);
        config.transcode.concurrency = concurrency;
        config.transcode.queue_capacity = queue_capacity;
        Self::from_config(behavior, dir, config).await
    }

    async fn from_config(behavior: Behavior, dir: TempDir, config: Config) -> Self {

        let store = SqliteStore::in_memory().await.unwrap();
        for conversation in ["conv-1", "conv-2"] {
            store
                .create_conversation(conversation, &format!("invite-{conversation}"), conversation)
                .await
                .unwrap();
        }
        store.add_member("conv-1", "alice").await.unwrap();
        store.add_member("conv-2", "bob").await.unwrap();

        let sessions = Arc::new(SessionStore::new());
        let transcoder = Arc::new(FakeTranscoder::new(behavior));
        let state = AppState::new(&config, store.clone(), sessions.clone(), transcoder.clone());

        Self {
            dir,
            config,
            store,
            sessions,
            transcoder,
            state,
        }
    }

    pub fn app(
        &self,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        let state = self.state.clone();
        App::new()
            .wrap(RequestMetrics)
            .configure(move |cfg| state.configure(cfg))
    }

    pub fn login(&self, username: &str) -> actix_web::cookie::Cookie<'static> {
        session_cookie(&self.sessions.create(username))
    }

    pub fn videos_dir(&self) -> &Path {
        &self.config.storage.videos_dir
    }

    /// Every file below the videos directory
    pub fn stored_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut dirs = vec![self.videos_dir().to_path_buf()];
        while let Some(dir) = dirs.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    dirs.push(path);
                } else {
                    files.push(path);
                }
            }
        }
        files.sort();
        files
    }

    pub async fn record(&self, id: &str) -> VideoRecord {
        let id = VideoId::parse(id).expect("response id is a video id");
        self.store.get(&id).await.unwrap().expect("record exists")
    }

    /// Poll until the video leaves `pending`
    pub async fn wait_for_terminal(&self, id: &str) -> VideoRecord {
        for _ in 0..500 {
            let record = self.record(id).await;
            if record.status != VideoStatus::Pending {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("video {id} never left pending");
    }

    pub async fn shutdown(&self) {
        self.state.shutdown(Duration::from_millis(100)).await;
    }
}

pub fn test_config(videos_dir: PathBuf, max_upload_bytes: u64) -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".into(),
            port: 0,
            env: "test".into(),
            shutdown_grace_secs: 1,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
        },
        storage: StorageConfig {
            videos_dir,
            max_upload_bytes,
        },
        transcode: TranscodeConfig {
            retry_delay_ms: 1,
            ..TranscodeConfig::default()
        },
        session: SessionConfig::default(),
    }
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// `multipart/form-data` body with its content type
pub fn multipart(parts: &[Part<'_>]) -> (String, Vec<u8>) {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}
