//! Rate-limit handling for outbound requests.
//!
//! The API signals throttling with HTTP 429. [`send_with_retry`] resends the
//! same signed request with exponential backoff and additive jitter:
//!
//! ```text
//! attempt 1 -> 429, sleep 1000ms + jitter
//! attempt 2 -> 429, sleep 2000ms + jitter
//! ...
//! attempt 6 -> 429, sleep 32000ms + jitter
//! attempt 7 -> returned to the caller as-is
//! ```
//!
//! Only 429 triggers a retry. Transport errors and every other status,
//! including 5xx, are returned immediately. Sleeping and jitter go through
//! the [`Sleeper`] and [`RandomSource`] traits so tests can drive the
//! schedule deterministically.

use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use tracing::debug;

/// Backoff before the first retry, in milliseconds.
pub const INITIAL_BACKOFF_MS: u64 = 1000;

/// Multiplier applied to the backoff after each retry.
pub const BACKOFF_FACTOR: u64 = 2;

/// Largest backoff that still triggers a retry, in milliseconds.
pub const MAX_BACKOFF_MS: u64 = 32_000;

/// Upper bound of the additive jitter, in milliseconds (inclusive).
pub const MAX_JITTER_MS: u64 = 1000;

/// Blocking sleep, injectable for tests.
pub trait Sleeper {
    /// Block the current thread for `duration`.
    fn sleep(&self, duration: Duration);
}

/// Sleeps on the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Source of jitter values, injectable for tests.
pub trait RandomSource {
    /// A uniform value in `[0, upper)`.
    fn next_u64(&self, upper: u64) -> u64;
}

/// Draws jitter from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRandom;

impl RandomSource for SystemRandom {
    fn next_u64(&self, upper: u64) -> u64 {
        use rand::Rng;
        rand::rng().random_range(0..upper)
    }
}

/// Send a request, retrying on HTTP 429 with exponential backoff.
///
/// `send` is invoked once per attempt and must resend the identical signed
/// request. The first non-429 response is returned; once the backoff would
/// exceed [`MAX_BACKOFF_MS`], the 429 itself is returned.
///
/// # Errors
///
/// Any error from `send` is propagated immediately, without a retry.
pub fn send_with_retry<F, E>(
    mut send: F,
    sleeper: &dyn Sleeper,
    random: &dyn RandomSource,
) -> Result<http::Response<Bytes>, E>
where
    F: FnMut() -> Result<http::Response<Bytes>, E>,
{
    let mut backoff_ms = INITIAL_BACKOFF_MS;
    loop {
        let response = send()?;
        if response.status() != StatusCode::TOO_MANY_REQUESTS || backoff_ms > MAX_BACKOFF_MS {
            return Ok(response);
        }
        let jitter_ms = random.next_u64(MAX_JITTER_MS + 1);
        debug!(backoff_ms, jitter_ms, "rate limited, backing off");
        sleeper.sleep(Duration::from_millis(backoff_ms + jitter_ms));
        backoff_ms *= BACKOFF_FACTOR;
    }
}
