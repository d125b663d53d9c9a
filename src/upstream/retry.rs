// src/upstream/retry.rs — Bounded retry with a constant delay
//
// Every network call goes through `run_with_retry`. Attempts are capped and
// the pause between them is fixed, so one call site blocks for at most
// (attempts - 1) * delay plus its own request time.
// Parse, extraction and disambiguation failures are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::infra::config::RetrySettings;
use crate::infra::errors::LiveTrackError;

const ATTEMPTS: u32 = 3;
const DELAY_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: ATTEMPTS,
            delay: Duration::from_secs(DELAY_SECS),
        }
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        Self {
            attempts: settings.attempts.max(1),
            delay: Duration::from_secs(settings.delay_secs),
        }
    }
}

/// Run `op` until it succeeds, fails deterministically, or runs out of attempts.
///
/// Exhaustion yields `RetriesExhausted` wrapping the last underlying error.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
) -> Result<T, LiveTrackError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LiveTrackError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !err.is_retriable() {
            tracing::warn!(operation, attempt, "Not retrying: {}", err);
            return Err(err);
        }

        if attempt >= attempts {
            return Err(LiveTrackError::RetriesExhausted {
                operation: operation.to_string(),
                attempts,
                source: Box::new(err),
            });
        }

        tracing::warn!(
            operation,
            attempt,
            max_attempts = attempts,
            delay_ms = policy.delay.as_millis() as u64,
            "Retrying after error: {}",
            err
        );
        tokio::time::sleep(policy.delay).await;
    }
}
