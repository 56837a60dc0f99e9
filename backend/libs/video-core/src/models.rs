//! Core video data models

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::{CANONICAL_HEIGHT, VIDEO_ID_BYTES};

/// Video status enumeration
///
/// `Pending` moves forward exactly once, to `Ready` or `Error`. Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VideoStatus {
    Pending,
    Ready,
    Error,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Pending => "pending",
            VideoStatus::Ready => "ready",
            VideoStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, VideoStatus::Pending)
    }

    pub fn can_transition_to(&self, next: VideoStatus) -> bool {
        matches!(
            (self, next),
            (VideoStatus::Pending, VideoStatus::Ready) | (VideoStatus::Pending, VideoStatus::Error)
        )
    }

    /// Validate a transition, returning the new status
    pub fn transition(self, next: VideoStatus) -> Result<VideoStatus, InvalidTransition> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(InvalidTransition { from: self, to: next })
        }
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(VideoStatus::Pending),
            "ready" => Ok(VideoStatus::Ready),
            "error" => Ok(VideoStatus::Error),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid video status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: VideoStatus,
    pub to: VideoStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown video status: {0}")]
pub struct UnknownStatus(pub String);

/// Opaque video identifier: 128 random bits, lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub fn generate() -> Self {
        let bytes: [u8; VIDEO_ID_BYTES] = rand::random();
        Self(hex::encode(bytes))
    }

    /// Parse an id previously produced by [`VideoId::generate`]
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = raw.len() == VIDEO_ID_BYTES * 2
            && raw.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Target rendition every upload is converted to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeProfile {
    pub height: u32,
    pub video_codec: String,
    pub audio_codec: String,
}

impl TranscodeProfile {
    /// Single 720p H.264/AAC rendition
    pub fn canonical() -> Self {
        Self {
            height: CANONICAL_HEIGHT,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }

    /// Scale filter keeping the aspect ratio with an even width
    pub fn scale_filter(&self) -> String {
        format!("scale=-2:{}", self.height)
    }

    /// Converter arguments for `input -> output`, overwriting the output
    pub fn ffmpeg_args(&self, input: &str, output: &str) -> Vec<String> {
        vec![
            "-i".to_string(),
            input.to_string(),
            "-vf".to_string(),
            self.scale_filter(),
            "-c:v".to_string(),
            self.video_codec.clone(),
            "-c:a".to_string(),
            self.audio_codec.clone(),
            "-y".to_string(),
            output.to_string(),
        ]
    }
}

impl Default for TranscodeProfile {
    fn default() -> Self {
        Self::canonical()
    }
}
