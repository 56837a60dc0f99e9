/// External converter invocation
///
/// `FfmpegTranscoder` runs one conversion of an original file into the
/// canonical 720p MP4 rendition. Retries and status bookkeeping live in the
/// worker; this type only knows how to run the converter once.
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};
use video_core::TranscodeProfile;

/// Bytes of converter stderr kept for diagnostics
const STDERR_TAIL_BYTES: usize = 2048;

#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("failed to start converter '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("converter exited with {status}: {output}")]
    Failed { status: ExitStatus, output: String },

    #[error("converter timed out after {0:?}")]
    TimedOut(Duration),

    #[error("converter reported success but wrote no output at {0}")]
    MissingOutput(PathBuf),
}

/// One conversion attempt of `input` into `output`
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}

#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
    profile: TranscodeProfile,
    timeout: Duration,
}

impl FfmpegTranscoder {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            profile: TranscodeProfile::canonical(),
            timeout,
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, input: &Path, output_path: &Path) -> Result<(), TranscodeError> {
        let args = self
            .profile
            .ffmpeg_args(&input.to_string_lossy(), &output_path.to_string_lossy());
        debug!(program = %self.program.display(), ?args, "starting converter");

        let started = Instant::now();
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        // Dropping the child on timeout kills the process
        let output = resilience::with_timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(TranscodeError::TimedOut)?
            .map_err(|source| TranscodeError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                status: output.status,
                output: stderr_tail(&output.stderr),
            });
        }

        info!(
            output = %output_path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "conversion finished"
        );
        Ok(())
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}
