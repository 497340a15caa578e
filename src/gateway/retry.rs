//! Exponential back-off around a fallible backend call.
//!
//! Only rate-limit failures are retried. Anything else (bad credentials,
//! unreachable server, timeout, malformed request) fails on the first
//! attempt: retrying would only delay the inevitable error.

use crate::config::RetryPolicy;
use crate::error::GenerationError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How a failed call should be treated.
#[derive(Debug, Clone, PartialEq)]
pub enum FailureClass {
    /// The service asked us to slow down. `suggested_wait` is set when the
    /// error message names a wait ("retry in 12s").
    RateLimited { suggested_wait: Option<Duration> },
    /// Anything else: propagate immediately.
    Fatal,
}

const RATE_LIMIT_MARKERS: [&str; 5] = [
    "429",
    "quota",
    "rate limit",
    "resourceexhausted",
    "resource_exhausted",
];

static RE_SUGGESTED_WAIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"retry(?:\s+in|\s+after|-after:?)\s*([0-9]+(?:\.[0-9]+)?)\s*(ms|s)?").unwrap()
});

/// Classify an error message. Matching is case-insensitive.
pub fn classify(message: &str) -> FailureClass {
    let lower = message.to_lowercase();
    if !RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        return FailureClass::Fatal;
    }

    let suggested_wait = RE_SUGGESTED_WAIT.captures(&lower).and_then(|caps| {
        let value: f64 = caps.get(1)?.as_str().parse().ok()?;
        let secs = match caps.get(2).map(|m| m.as_str()) {
            Some("ms") => value / 1000.0,
            _ => value,
        };
        // Out-of-range waits count as no suggestion.
        Duration::try_from_secs_f64(secs).ok()
    });

    FailureClass::RateLimited { suggested_wait }
}

/// Run `call` until it succeeds, fails fatally, or the retry budget is spent.
///
/// `call` receives the zero-based attempt number. `sleep` performs the wait
/// between attempts; production passes [`tokio::time::sleep`], tests pass a
/// recorder.
///
/// A rate-limited attempt waits for the suggested duration when the error
/// names one, else for [`RetryPolicy::delay_for`] of the retry index.
pub async fn with_backoff<T, E, Call, CallFut, Sleep, SleepFut>(
    policy: &RetryPolicy,
    backend: &str,
    mut call: Call,
    mut sleep: Sleep,
) -> Result<T, GenerationError>
where
    E: Display,
    Call: FnMut(u32) -> CallFut,
    CallFut: Future<Output = Result<T, E>>,
    Sleep: FnMut(Duration) -> SleepFut,
    SleepFut: Future<Output = ()>,
{
    let mut attempt: u32 = 0;
    loop {
        let err = match call(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => e.to_string(),
        };

        let suggested_wait = match classify(&err) {
            FailureClass::Fatal => {
                return Err(GenerationError::Backend {
                    backend: backend.to_string(),
                    detail: err,
                })
            }
            FailureClass::RateLimited { suggested_wait } => suggested_wait,
        };

        if attempt >= policy.max_retries {
            return Err(GenerationError::RetriesExhausted {
                backend: backend.to_string(),
                attempts: attempt + 1,
                last_error: err,
            });
        }

        let wait = suggested_wait.unwrap_or_else(|| policy.delay_for(attempt));
        warn!(
            "{}: rate limited (attempt {}/{}), retrying in {:.1}s",
            backend,
            attempt + 1,
            policy.max_retries + 1,
            wait.as_secs_f64()
        );
        sleep(wait).await;
        attempt += 1;
    }
}
