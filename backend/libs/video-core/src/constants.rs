//! Video pipeline constants

/// Maximum accepted upload size (500 MB)
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Container extensions the converter is known to decode
pub const ALLOWED_EXTENSIONS: &[&str] = &[".mp4", ".mov", ".avi", ".mkv"];

/// Extension of every canonical (converted) file
pub const CANONICAL_EXTENSION: &str = ".mp4";

/// Filename prefix marking an original, not yet converted upload
pub const ORIGINAL_PREFIX: &str = "original_";

/// Output height of the canonical rendition, aspect ratio preserved
pub const CANONICAL_HEIGHT: u32 = 720;

/// Conversion attempts before a video is marked as failed
pub const TRANSCODE_MAX_ATTEMPTS: u32 = 3;

/// Constant delay between conversion attempts
pub const TRANSCODE_RETRY_DELAY_MS: u64 = 2_000;

/// FFmpeg timeout per attempt (60 minutes)
pub const FFMPEG_TIMEOUT_SECS: u64 = 60 * 60;

/// Maximum concurrent transcoding jobs
pub const MAX_CONCURRENT_TRANSCODING: usize = 2;

/// Number of random bytes behind a video id (128 bits)
pub const VIDEO_ID_BYTES: usize = 16;
