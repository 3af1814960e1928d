//! Exponential backoff with jitter, fired between passes (not
//! between attempts within a pass — not between attempts within one).

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::random::random_range;

/// Sleeps for `1000 * 2^pass + jitter` ms, `jitter` uniform in `[0, 256)`
/// ms, observing `cancel`. Fails with [`Error::Canceled`] if the token
/// fires before or during the sleep.
pub async fn backoff(pass: u32, cancel: &CancellationToken) -> Result<(), Error> {
    if cancel.is_cancelled() {
        return Err(Error::Canceled);
    }

    let base_ms: u64 = 1000u64.saturating_mul(1u64.checked_shl(pass).unwrap_or(u64::MAX));
    let jitter_ms = random_range(256) as u64;
    let delay = Duration::from_millis(base_ms.saturating_add(jitter_ms));

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Canceled),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn sleeps_at_least_the_base_duration() {
        let cancel = CancellationToken::new();
        let start = tokio::time::Instant::now();
        backoff(0, &cancel).await.unwrap();
        assert!(tokio::time::Instant::now() - start >= Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn already_canceled_fails_immediately() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = backoff(0, &cancel).await;
        assert!(matches!(result, Err(Error::Canceled)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_sleep_wins() {
        let cancel = CancellationToken::new();
        let cancel2 = cancel.clone();
        let handle = tokio::spawn(async move { backoff(3, &cancel2).await });
        tokio::task::yield_now().await;
        cancel.cancel();
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(Error::Canceled)));
    }
}
