//! Deadline-bounded polling.
//!
//! [`poll_until`] drives an async check repeatedly until it reports
//! [`Attempt::Ready`], returns an error, or the policy deadline passes.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::debug;

/// Spacing between attempts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Backoff {
    /// Constant interval.
    Fixed,
    /// Interval doubles after every pending attempt, capped at `max`.
    Exponential {
        /// Upper bound on the interval.
        max: Duration,
    },
}

/// Poll interval, deadline, and backoff for [`poll_until`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryPolicy {
    /// Initial spacing between attempts.
    pub interval: Duration,
    /// Total time budget measured from the first attempt.
    pub timeout: Duration,
    /// How the interval evolves.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Fixed-interval policy.
    #[must_use]
    pub const fn fixed(interval: Duration, timeout: Duration) -> Self {
        Self {
            interval,
            timeout,
            backoff: Backoff::Fixed,
        }
    }

    fn next_interval(&self, current: Duration) -> Duration {
        match self.backoff {
            Backoff::Fixed => current,
            Backoff::Exponential { max } => current.saturating_mul(2).min(max),
        }
    }
}

/// Outcome of a single attempt.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Attempt<T> {
    /// The condition holds; stop polling.
    Ready(T),
    /// Not there yet; try again after the interval.
    Pending,
}

/// Why polling stopped without reaching [`Attempt::Ready`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RetryError<E> {
    /// The deadline passed before the condition held.
    #[error("condition not met after {attempts} attempts in {elapsed:?}")]
    DeadlineExceeded {
        /// Number of attempts made.
        attempts: u32,
        /// Time spent polling.
        elapsed: Duration,
    },
    /// An attempt failed with a non-retryable error.
    #[error(transparent)]
    Aborted(E),
}

/// Runs `check` until it is ready, fails, or `policy.timeout` elapses.
///
/// The first attempt runs immediately. An attempt is never started after the
/// deadline, and no sleep extends past it.
///
/// # Errors
///
/// Returns [`RetryError::Aborted`] with the first error from `check`, or
/// [`RetryError::DeadlineExceeded`] when the deadline passes.
pub async fn poll_until<T, E, F, Fut>(policy: RetryPolicy, mut check: F) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Attempt<T>, E>>,
{
    let started = Instant::now();
    // A timeout too large to add to the clock means "no deadline".
    let deadline = started.checked_add(policy.timeout);
    let mut interval = policy.interval;
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);
        match check().await.map_err(RetryError::Aborted)? {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Pending => debug!(attempts, "condition pending"),
        }

        let pause = match deadline {
            Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
                Some(remaining) if !remaining.is_zero() => interval.min(remaining),
                _ => break,
            },
            None => interval,
        };
        sleep(pause).await;
        interval = policy.next_interval(interval);
        if deadline.is_some_and(|deadline| Instant::now() > deadline) {
            break;
        }
    }

    Err(RetryError::DeadlineExceeded {
        attempts,
        elapsed: started.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn policy() -> RetryPolicy {
        RetryPolicy::fixed(Duration::from_secs(5), Duration::from_secs(30))
    }

    #[tokio::test(start_paused = true)]
    async fn returns_value_once_ready() {
        let calls = Cell::new(0_u32);
        let result: Result<u32, RetryError<()>> = poll_until(policy(), || {
            calls.set(calls.get() + 1);
            let current = calls.get();
            async move {
                Ok(if current == 3 {
                    Attempt::Ready(current)
                } else {
                    Attempt::Pending
                })
            }
        })
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_at_deadline() {
        let started = Instant::now();
        let result: Result<(), RetryError<()>> =
            poll_until(policy(), || async { Ok(Attempt::Pending) }).await;

        let Err(RetryError::DeadlineExceeded { attempts, .. }) = result else {
            panic!("expected deadline error, got {result:?}");
        };
        assert_eq!(attempts, 7);
        assert!(started.elapsed() <= Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_timeout_polls_without_panicking() {
        let calls = Cell::new(0_u32);
        let huge = RetryPolicy::fixed(Duration::from_secs(5), Duration::MAX);
        let result: Result<u32, RetryError<()>> = poll_until(huge, || {
            calls.set(calls.get() + 1);
            let current = calls.get();
            async move {
                Ok(if current == 4 {
                    Attempt::Ready(current)
                } else {
                    Attempt::Pending
                })
            }
        })
        .await;
        assert_eq!(result, Ok(4));
    }

    #[tokio::test(start_paused = true)]
    async fn aborts_on_first_error() {
        let calls = Cell::new(0_u32);
        let result: Result<(), RetryError<&str>> = poll_until(policy(), || {
            calls.set(calls.get() + 1);
            async { Err("boom") }
        })
        .await;
        assert_eq!(result, Err(RetryError::Aborted("boom")));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn exponential_backoff_is_capped() {
        let policy = RetryPolicy {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(60),
            backoff: Backoff::Exponential {
                max: Duration::from_secs(3),
            },
        };
        let second = policy.next_interval(Duration::from_secs(1));
        assert_eq!(second, Duration::from_secs(2));
        assert_eq!(policy.next_interval(second), Duration::from_secs(3));
    }
}
