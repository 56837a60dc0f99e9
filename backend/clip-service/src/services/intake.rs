/// Durable intake: stream an upload to disk, then record it as pending
///
/// Layout under `videos_dir`:
///
/// ```text
/// <videos_dir>/<conversation_id>/original_<id><ext>   until conversion succeeds
/// <videos_dir>/<conversation_id>/<id>.mp4             once conversion succeeds
/// ```
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use video_core::constants::{CANONICAL_EXTENSION, ORIGINAL_PREFIX};
use video_core::VideoId;

use crate::db::VideoStore;
use crate::error::{AppError, Result};
use crate::models::{NewVideo, VideoRecord};
use crate::services::worker::TranscodeJob;

/// Conversation ids become directory names, so only a safe alphabet is accepted
pub fn validate_conversation_id(conversation_id: &str) -> Result<()> {
    if conversation_id.is_empty() {
        return Err(AppError::BadRequest("'conversation_id' is required".into()));
    }
    let safe = conversation_id.len() <= 128
        && conversation_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !safe {
        return Err(AppError::BadRequest("invalid 'conversation_id'".into()));
    }
    Ok(())
}

/// Deterministic on-disk paths of a video's artifacts
#[derive(Debug, Clone)]
pub struct VideoLayout {
    videos_dir: PathBuf,
}

impl VideoLayout {
    pub fn new(videos_dir: impl Into<PathBuf>) -> Self {
        Self {
            videos_dir: videos_dir.into(),
        }
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    pub fn conversation_dir(&self, conversation_id: &str) -> PathBuf {
        self.videos_dir.join(conversation_id)
    }

    /// `ext` includes the leading dot
    pub fn original_path(&self, conversation_id: &str, id: &VideoId, ext: &str) -> PathBuf {
        self.conversation_dir(conversation_id)
            .join(format!("{ORIGINAL_PREFIX}{id}{ext}"))
    }

    pub fn canonical_path(&self, conversation_id: &str, id: &VideoId) -> PathBuf {
        self.conversation_dir(conversation_id)
            .join(format!("{id}{CANONICAL_EXTENSION}"))
    }

    /// Locate the original of a video whose source extension is not recorded
    pub async fn find_original(&self, conversation_id: &str, id: &VideoId) -> Option<PathBuf> {
        let prefix = format!("{ORIGINAL_PREFIX}{id}.");
        let mut entries = fs::read_dir(self.conversation_dir(conversation_id)).await.ok()?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                return Some(entry.path());
            }
        }
        None
    }
}

/// Outcome of a committed intake
#[derive(Debug, Clone)]
pub struct Intake {
    pub record: VideoRecord,
    pub job: TranscodeJob,
    pub bytes: u64,
}

pub struct IntakeService {
    layout: VideoLayout,
    store: Arc<dyn VideoStore>,
    max_upload_bytes: u64,
}

impl IntakeService {
    pub fn new(layout: VideoLayout, store: Arc<dyn VideoStore>, max_upload_bytes: u64) -> Self {
        Self {
            layout,
            store,
            max_upload_bytes,
        }
    }

    pub fn layout(&self) -> &VideoLayout {
        &self.layout
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Persist the stream as an original artifact and record it as pending
    ///
    /// The caller has already checked membership and the extension. On any
    /// failure nothing survives: no record, no partial file.
    pub async fn accept<S, E>(
        &self,
        uploader: &str,
        conversation_id: &str,
        ext: &str,
        stream: S,
    ) -> Result<Intake>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: Into<AppError>,
    {
        validate_conversation_id(conversation_id)?;

        let conversation_dir = self.layout.conversation_dir(conversation_id);
        fs::create_dir_all(&conversation_dir).await.map_err(|e| {
            error!(error = %e, dir = %conversation_dir.display(), "failed to create conversation directory");
            AppError::from(e)
        })?;

        let id = VideoId::generate();
        let original_path = self.layout.original_path(conversation_id, &id, ext);
        let canonical_path = self.layout.canonical_path(conversation_id, &id);

        info!(video_id = %id, path = %original_path.display(), username = %uploader, "saving original upload");
        let written = match self.write_original(&original_path, stream).await {
            Ok(written) => written,
            Err(err) => {
                remove_quietly(&original_path).await;
                warn!(video_id = %id, error = %err, "upload write failed, partial file removed");
                return Err(err);
            }
        };

        let new_video = NewVideo {
            id: id.clone(),
            conversation_id: conversation_id.to_string(),
            uploader: uploader.to_string(),
            canonical_path: canonical_path.clone(),
        };

        let record = match self.store.create_pending(&new_video).await {
            Ok(record) => record,
            Err(err) => {
                error!(video_id = %id, error = %err, "failed to create video record");
                remove_quietly(&original_path).await;
                return Err(err);
            }
        };

        info!(video_id = %id, bytes = written, "upload persisted");

        Ok(Intake {
            record,
            job: TranscodeJob {
                video_id: id,
                original_path,
                canonical_path,
            },
            bytes: written,
        })
    }

    async fn write_original<S, E>(&self, path: &Path, mut stream: S) -> Result<u64>
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Unpin,
        E: Into<AppError>,
    {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;

        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(Into::into)?;
            written += chunk.len() as u64;
            if written > self.max_upload_bytes {
                return Err(AppError::PayloadTooLarge {
                    limit: self.max_upload_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

/// Remove a file, ignoring a missing one
pub(crate) async fn remove_quietly(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(error = %e, path = %path.display(), "failed to remove file"),
    }
}
