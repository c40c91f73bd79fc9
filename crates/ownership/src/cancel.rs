//! Caller-driven cancellation and deadlines for remote calls.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::CloudError;

/// Run `fut` until it finishes, `token` is cancelled, or `timeout` elapses.
///
/// Cancellation and timeout drop the in-flight future, which aborts the
/// remote call, and return [`CloudError::Cancelled`] or
/// [`CloudError::Timeout`].
///
/// # Errors
/// Returns the future's own error, or the cancellation error.
pub async fn guard<T, F>(
    token: &CancellationToken,
    timeout: Option<Duration>,
    fut: F,
) -> Result<T, CloudError>
where
    F: Future<Output = Result<T, CloudError>>,
{
    let bounded = async {
        match timeout {
            Some(limit) => tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| CloudError::Timeout(limit))?,
            None => fut.await,
        }
    };

    tokio::select! {
        biased;
        () = token.cancelled() => {
            debug!("Remote call cancelled");
            Err(CloudError::Cancelled)
        }
        result = bounded => result,
    }
}
