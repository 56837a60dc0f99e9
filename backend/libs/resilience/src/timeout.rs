/// Timeout wrapper for async operations
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Execute a future with timeout
///
/// The future is dropped when the deadline passes; the error carries the
/// limit that elapsed.
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, Duration>
where
    F: Future<Output = T>,
{
    timeout(duration, future).await.map_err(|_| duration)
}
