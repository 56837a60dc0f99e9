/// Configuration management for clip-service
///
/// Loads configuration from environment variables with sensible defaults.
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use video_core::constants;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub transcode: TranscodeConfig,
    pub session: SessionConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
    pub shutdown_grace_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct StorageConfig {
    pub videos_dir: PathBuf,
    pub max_upload_bytes: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct TranscodeConfig {
    pub ffmpeg_path: String,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
    pub concurrency: usize,
    pub queue_capacity: usize,
}

impl TranscodeConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            max_attempts: constants::TRANSCODE_MAX_ATTEMPTS,
            retry_delay_ms: constants::TRANSCODE_RETRY_DELAY_MS,
            timeout_secs: constants::FFMPEG_TIMEOUT_SECS,
            concurrency: constants::MAX_CONCURRENT_TRANSCODING,
            queue_capacity: 64,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SessionConfig {
    /// Sessions never expire when unset
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid value for {name}: {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub value: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let transcode_defaults = TranscodeConfig::default();

        Ok(Config {
            app: AppConfig {
                host: env_or("CLIP_SERVICE_HOST", "0.0.0.0"),
                port: parse_env("CLIP_SERVICE_PORT", 8080)?,
                env: env_or("APP_ENV", "development"),
                shutdown_grace_secs: parse_env("SHUTDOWN_GRACE_SECS", 30)?,
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", "sqlite://waffle.db?mode=rwc"),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5)?,
            },
            storage: StorageConfig {
                videos_dir: PathBuf::from(env_or("VIDEOS_DIR", "./videos")),
                max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", constants::MAX_UPLOAD_BYTES)?,
            },
            transcode: TranscodeConfig {
                ffmpeg_path: env_or("FFMPEG_PATH", &transcode_defaults.ffmpeg_path),
                max_attempts: parse_env("TRANSCODE_MAX_ATTEMPTS", transcode_defaults.max_attempts)?,
                retry_delay_ms: parse_env(
                    "TRANSCODE_RETRY_DELAY_MS",
                    transcode_defaults.retry_delay_ms,
                )?,
                timeout_secs: parse_env("TRANSCODE_TIMEOUT_SECS", transcode_defaults.timeout_secs)?,
                concurrency: parse_env("TRANSCODE_CONCURRENCY", transcode_defaults.concurrency)?,
                queue_capacity: parse_env(
                    "TRANSCODE_QUEUE_CAPACITY",
                    transcode_defaults.queue_capacity,
                )?,
            },
            session: SessionConfig {
                ttl_secs: parse_optional_env("SESSION_TTL_SECS")?,
            },
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    Ok(parse_optional_env(name)?.unwrap_or(default))
}

fn parse_optional_env<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { name, value: raw }),
        _ => Ok(None),
    }
}
