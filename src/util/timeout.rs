//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::BatonError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, BatonError>>,
) -> Result<T, BatonError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(BatonError::Timeout(duration.as_millis() as u64)),
    }
}

/// Apply `with_timeout` only when a duration is configured.
pub async fn maybe_timeout<T>(
    duration: Option<Duration>,
    future: impl Future<Output = Result<T, BatonError>>,
) -> Result<T, BatonError> {
    match duration {
        Some(duration) => with_timeout(duration, future).await,
        None => future.await,
    }
}
