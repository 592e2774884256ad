//! Bounded retry with exponential backoff for rate-limited calls.

use crate::config::RetrySettings;
use crate::error::{KimiError, Result};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff schedule: `initial_delay * multiplier^(n-1)` after the n-th failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: f64,
}

impl Backoff {
    pub fn new(max_attempts: u32, initial_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts,
            initial_delay,
            multiplier,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(
            settings.max_attempts,
            settings.initial_delay(),
            settings.multiplier,
        )
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        self.initial_delay.mul_f64(self.multiplier.max(0.0).powi(exponent))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

/// Something that can wait. Abstracted so tests can observe delays.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Run `op` until it succeeds, fails with a non-rate-limit error, or the
/// attempt budget is spent.
///
/// Only [`KimiError::RateLimited`] is retried. The final rate-limited
/// attempt is not followed by a delay and yields
/// [`KimiError::RetriesExhausted`].
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &Backoff,
    sleeper: &dyn Sleeper,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_rate_limited() => {
                if attempt >= max_attempts {
                    warn!("Still rate limited after {} attempts: {}", attempt, e);
                    return Err(KimiError::RetriesExhausted {
                        attempts: max_attempts,
                    });
                }

                let delay = policy.delay_after(attempt);
                warn!(
                    "API rate limit, waiting {:.1}s before retrying (attempt {}/{})",
                    delay.as_secs_f64(),
                    attempt,
                    max_attempts
                );
                sleeper.sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    /// Records requested delays without waiting.
    #[derive(Default)]
    pub(crate) struct RecordingSleeper {
        pub delays: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    fn rate_limited() -> KimiError {
        KimiError::RateLimited("429 Too Many Requests".to_string())
    }

    #[test]
    fn test_default_schedule() {
        let backoff = Backoff::default();
        assert_eq!(backoff.max_attempts, 5);
        let delays: Vec<f64> = (1..=4).map(|n| backoff.delay_after(n).as_secs_f64()).collect();
        assert_eq!(delays, vec![20.0, 30.0, 45.0, 67.5]);
    }

    #[tokio::test]
    async fn test_succeeds_on_fifth_attempt() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result = retry_with_backoff(&Backoff::default(), &sleeper, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 4 {
                    Err(rate_limited())
                } else {
                    Ok("answer")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "answer");
        assert_eq!(calls.load(Ordering::SeqCst), 5);

        let delays = sleeper.delays.lock().unwrap().clone();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(20),
                Duration::from_secs(30),
                Duration::from_secs(45),
                Duration::from_secs_f64(67.5),
            ]
        );
        assert!(delays.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(&Backoff::default(), &sleeper, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(rate_limited()) }
        })
        .await;

        assert!(matches!(result, Err(KimiError::RetriesExhausted { attempts: 5 })));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let sleeper = RecordingSleeper::default();
        let calls = AtomicU32::new(0);

        let result: Result<()> = retry_with_backoff(&Backoff::default(), &sleeper, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(KimiError::Llm("invalid model".to_string())) }
        })
        .await;

        assert!(matches!(result, Err(KimiError::Llm(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }
}
