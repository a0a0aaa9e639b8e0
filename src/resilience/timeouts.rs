//! Timeout enforcement.
//!
//! Every call that leaves the process gets a deadline. A timed-out call is
//! reported as `Elapsed`, distinct from the call's own error.

use std::future::Future;
use std::time::Duration;

/// Returned when a call did not finish within its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {0:?} elapsed")]
pub struct Elapsed(pub Duration);

/// Run `fut` with a deadline. The outer error is the timeout, the inner one the call's own.
pub async fn with_deadline<F, T, E>(deadline: Duration, fut: F) -> Result<Result<T, E>, Elapsed>
where
    F: Future<Output = Result<T, E>>,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| Elapsed(deadline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn slow_call_times_out() {
        let result = with_deadline(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, ()>(())
        })
        .await;

        assert_eq!(result, Err(Elapsed(Duration::from_secs(5))));
    }

    #[tokio::test]
    async fn fast_call_keeps_its_result() {
        let result = with_deadline(Duration::from_secs(5), async { Err::<(), _>("denied") }).await;
        assert_eq!(result, Ok(Err("denied")));
    }
}
