/// Data models for clip-service
///
/// This module defines structures for:
/// - VideoRecord: the metadata row of one uploaded video
/// - Request/response payloads of the upload and listing endpoints
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use video_core::{VideoId, VideoStatus};

// ========================================
// Video Models
// ========================================

/// Video database entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct VideoRecord {
    pub id: VideoId,
    pub conversation_id: String,
    pub uploader: String,
    pub canonical_path: String,
    pub status: VideoStatus,
    pub uploaded_at: DateTime<Utc>,
}

/// Input for the pending record written at intake
#[derive(Debug, Clone)]
pub struct NewVideo {
    pub id: VideoId,
    pub conversation_id: String,
    pub uploader: String,
    pub canonical_path: PathBuf,
}

/// Feed entry returned by the listing endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoListItem {
    pub id: String,
    pub uploader: String,
    pub status: VideoStatus,
    pub uploaded_at: String,
}

impl From<VideoRecord> for VideoListItem {
    fn from(record: VideoRecord) -> Self {
        Self {
            id: record.id.to_string(),
            uploader: record.uploader,
            status: record.status,
            uploaded_at: record
                .uploaded_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// Body of a 202 Accepted upload response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAccepted {
    pub id: String,
    pub status: VideoStatus,
}

impl From<&VideoRecord> for UploadAccepted {
    fn from(record: &VideoRecord) -> Self {
        Self {
            id: record.id.to_string(),
            status: record.status,
        }
    }
}

/// Query string of `GET /api/videos`
#[derive(Debug, Clone, Deserialize)]
pub struct ListVideosQuery {
    pub conversation_id: Option<String>,
}
