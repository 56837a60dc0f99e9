/// Video repository - database operations for videos
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use video_core::{VideoId, VideoStatus};

use crate::error::{AppError, Result};
use crate::models::{NewVideo, VideoRecord};

const VIDEO_COLUMNS: &str =
    "id, conversation_id, uploader, canonical_path, status, uploaded_at";

/// Fixed-width UTC timestamp so lexical order matches chronological order
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

pub async fn create_pending(pool: &SqlitePool, video: &NewVideo) -> Result<VideoRecord> {
    let uploaded_at = format_timestamp(Utc::now());
    let canonical_path = video.canonical_path.to_string_lossy().into_owned();

    let record = sqlx::query_as::<_, VideoRecord>(&format!(
        "INSERT INTO videos (id, conversation_id, uploader, canonical_path, status, uploaded_at) \
         VALUES (?, ?, ?, ?, ?, ?) \
         RETURNING {VIDEO_COLUMNS}"
    ))
    .bind(&video.id)
    .bind(&video.conversation_id)
    .bind(&video.uploader)
    .bind(canonical_path)
    .bind(VideoStatus::Pending)
    .bind(uploaded_at)
    .fetch_one(pool)
    .await?;

    Ok(record)
}

pub async fn get_video(pool: &SqlitePool, id: &VideoId) -> Result<Option<VideoRecord>> {
    let video = sqlx::query_as::<_, VideoRecord>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(video)
}

/// Move a pending video to a terminal status
///
/// Only `pending` rows are updated, so a terminal status is written once.
pub async fn update_status(pool: &SqlitePool, id: &VideoId, status: VideoStatus) -> Result<()> {
    let status = VideoStatus::Pending.transition(status)?;

    let result = sqlx::query("UPDATE videos SET status = ? WHERE id = ? AND status = ?")
        .bind(status)
        .bind(id)
        .bind(VideoStatus::Pending)
        .execute(pool)
        .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    match get_video(pool, id).await? {
        Some(existing) => Err(AppError::Conflict(format!(
            "video {} is already {}",
            id, existing.status
        ))),
        None => Err(AppError::NotFound(format!("video {id}"))),
    }
}

/// All videos of a conversation, newest first
pub async fn list_by_conversation(
    pool: &SqlitePool,
    conversation_id: &str,
) -> Result<Vec<VideoRecord>> {
    let videos = sqlx::query_as::<_, VideoRecord>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos \
         WHERE conversation_id = ? \
         ORDER BY uploaded_at DESC, rowid DESC"
    ))
    .bind(conversation_id)
    .fetch_all(pool)
    .await?;

    Ok(videos)
}

/// Videos still waiting for a terminal status, oldest first
pub async fn list_pending(pool: &SqlitePool) -> Result<Vec<VideoRecord>> {
    let videos = sqlx::query_as::<_, VideoRecord>(&format!(
        "SELECT {VIDEO_COLUMNS} FROM videos \
         WHERE status = ? \
         ORDER BY uploaded_at ASC, rowid ASC"
    ))
    .bind(VideoStatus::Pending)
    .fetch_all(pool)
    .await?;

    Ok(videos)
}
