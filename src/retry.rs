//! Caller-side retry policy with exponential backoff.
//!
//! Retries wrap a whole logical call (token acquisition plus dispatch). The token manager and
//! the response cache never retry on their own, so a failure seen here has already been
//! delivered to every coalesced waiter exactly once.

// self
use crate::{_prelude::*, error::ConfigError};

/// Attempt count, base delay, and backoff multiplier for retried calls.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
	/// Retries after the first attempt; `0` disables retrying.
	pub count: u32,
	/// Delay before the first retry.
	pub delay: StdDuration,
	/// Multiplier applied to the delay after each retry.
	pub rate: f64,
}
impl RetryPolicy {
	/// Policy that never retries.
	pub const NONE: Self = Self { count: 0, delay: StdDuration::from_millis(50), rate: 1.5 };

	/// Creates a policy with the given attempt count and backoff parameters.
	pub fn new(count: u32, delay: StdDuration, rate: f64) -> Result<Self, ConfigError> {
		if !rate.is_finite() || rate < 1.0 {
			return Err(ConfigError::InvalidRetryRate { rate });
		}

		Ok(Self { count, delay, rate })
	}

	/// Delay before retry number `retry` (zero-based).
	pub fn delay_for(&self, retry: u32) -> StdDuration {
		let factor = self.rate.powi(i32::try_from(retry).unwrap_or(i32::MAX));

		StdDuration::try_from_secs_f64(self.delay.as_secs_f64() * factor)
			.unwrap_or(StdDuration::MAX)
	}

	/// Runs `op` until it succeeds, returns a non-retryable error, or attempts run out.
	pub async fn run<T, F, Fut>(&self, operation: &'static str, mut op: F) -> Result<T>
	where
		F: FnMut() -> Fut,
		Fut: Future<Output = Result<T>>,
	{
		let mut retry = 0;

		loop {
			match op().await {
				Ok(value) => return Ok(value),
				Err(e) if retry < self.count && e.is_retryable() => {
					let delay = self.delay_for(retry);

					crate::obs::record_retry(operation, retry + 1, delay, &e);
					tokio::time::sleep(delay).await;

					retry += 1;
				},
				Err(e) => return Err(e),
			}
		}
	}
}
impl Default for RetryPolicy {
	fn default() -> Self {
		Self::NONE
	}
}
