/// Database access layer
///
/// This module provides:
/// - SQLite connection pooling and migrations
/// - The `VideoStore` and `MembershipDirectory` seams consumed by the pipeline
/// - `SqliteStore`, the production implementation of both
pub mod membership_repo;
pub mod video_repo;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use video_core::{VideoId, VideoStatus};

use crate::config::DatabaseConfig;
use crate::error::Result;
use crate::models::{NewVideo, VideoRecord};

/// Metadata store for video records
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Insert a `pending` record; fails on a duplicate id or unknown conversation
    async fn create_pending(&self, video: &NewVideo) -> Result<VideoRecord>;

    /// Move a pending record to `ready` or `error`; fails if the id is unknown
    async fn set_status(&self, id: &VideoId, status: VideoStatus) -> Result<()>;

    /// All records of a conversation, newest first
    async fn list_by_conversation(&self, conversation_id: &str) -> Result<Vec<VideoRecord>>;

    async fn get(&self, id: &VideoId) -> Result<Option<VideoRecord>>;

    /// Records left in `pending`, oldest first
    async fn list_pending(&self) -> Result<Vec<VideoRecord>>;
}

/// Authorization context
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn conversation_exists(&self, conversation_id: &str) -> Result<bool>;

    async fn is_member(&self, conversation_id: &str, username: &str) -> Result<bool>;
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database and apply migrations
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!(url = %config.url, "opening database");

        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        tracing::info!("database ready");
        Ok(store)
    }

    /// Private in-memory database, kept alive on a single connection
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create_conversation(&self, id: &str, invite_code: &str, name: &str) -> Result<()> {
        membership_repo::create_conversation(&self.pool, id, invite_code, name).await
    }

    pub async fn add_member(&self, conversation_id: &str, username: &str) -> Result<()> {
        membership_repo::add_member(&self.pool, conversation_id, username).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl VideoStore for SqliteStore {
    async fn create_pending(&self, video: &NewVideo) -> Result<VideoRecord> {
        video_repo::create_pending(&self.pool, video).await
    }

    async fn set_status(&self, id: &VideoId, status: VideoStatus) -> Result<()> {
        video_repo::update_status(&self.pool, id, status).await
    }

    async fn list_by_conversation(&self, conversation_id: &str) -> Result<Vec<VideoRecord>> {
        video_repo::list_by_conversation(&self.pool, conversation_id).await
    }

    async fn get(&self, id: &VideoId) -> Result<Option<VideoRecord>> {
        video_repo::get_video(&self.pool, id).await
    }

    async fn list_pending(&self) -> Result<Vec<VideoRecord>> {
        video_repo::list_pending(&self.pool).await
    }
}

#[async_trait]
impl MembershipDirectory for SqliteStore {
    async fn conversation_exists(&self, conversation_id: &str) -> Result<bool> {
        membership_repo::conversation_exists(&self.pool, conversation_id).await
    }

    async fn is_member(&self, conversation_id: &str, username: &str) -> Result<bool> {
        membership_repo::is_member(&self.pool, conversation_id, username).await
    }
}
