/// Resilience patterns for background work
///
/// - **Retry**: bounded attempts with a fixed delay
/// - **Timeout**: time limits on external calls
///
/// # Example: fixed-delay retry around a fallible call
///
/// ```rust,no_run
/// use resilience::{with_retry, RetryConfig};
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() {
///     let config = RetryConfig::fixed(3, Duration::from_secs(2));
///
///     let result = with_retry(config, |attempt| async move {
///         // Your external call here
///         if attempt < 3 { Err("busy") } else { Ok(()) }
///     })
///     .await;
/// }
/// ```

pub mod retry;
pub mod timeout;

pub use retry::{with_retry, RetryConfig, RetryError};
pub use timeout::with_timeout;
