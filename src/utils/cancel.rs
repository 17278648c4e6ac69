//! Racing futures against a caller-supplied cancellation token.

use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Run `future` unless `cancel` fires first
///
/// Returns `None` when the token was cancelled. The token is checked before
/// the future on every poll, so an already-cancelled token never lets the
/// future make progress.
pub async fn run_cancellable<F>(cancel: &CancellationToken, future: F) -> Option<F::Output>
where
    F: Future,
{
    tokio::select! {
        biased;

        _ = cancel.cancelled() => None,
        output = future => Some(output),
    }
}
