use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Runs `future` unless `cancel` fires first; `None` means it was cancelled.
pub(crate) async fn until_cancelled<F, T>(cancel: &CancellationToken, future: F) -> Option<T>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        value = future => Some(value),
    }
}
