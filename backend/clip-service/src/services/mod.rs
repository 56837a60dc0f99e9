/// Service layer for the clip pipeline
///
/// - `format_gate`: extension allow-list
/// - `intake`: durable write of the original plus the pending record
/// - `transcoder`: one converter invocation
/// - `worker`: retries and terminal status of one video
/// - `queue`: bounded, concurrency-limited execution of workers
pub mod format_gate;
pub mod intake;
pub mod queue;
pub mod transcoder;
pub mod worker;

pub use format_gate::validate_extension;
pub use intake::{validate_conversation_id, Intake, IntakeService, VideoLayout};
pub use queue::{QueueError, TranscodeQueue};
pub use transcoder::{FfmpegTranscoder, TranscodeError, Transcoder};
pub use worker::{TranscodeJob, TranscodeWorker};
