// self
use crate::{
	_prelude::*,
	auth::DecodeError,
	cache::RequestKey,
	obs::{CacheEvent, Operation},
};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOperation<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOperation<F> = F;

/// A span builder used by session operations.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("rio_session.operation", operation = operation.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (operation, stage);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOperation<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

pub(crate) fn log_cache_event(event: CacheEvent, key: &RequestKey) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(event = event.as_str(), key = %key.fingerprint(), "response cache");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (event, key);
	}
}

pub(crate) fn record_discarded_credentials(key: &str, err: &serde_json::Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(key, error = %err, "Stored credentials are not a token record; ignoring.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (key, err);
	}
}

pub(crate) fn record_undecodable_credentials(key: &str, err: &DecodeError) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(key, error = %err, "Stored tokens could not be decoded; treating as absent.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (key, err);
	}
}

pub(crate) fn record_swallowed_sign_out(err: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(error = %err, "Sign-out notification failed; cleared local session anyway.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = err;
	}
}

pub(crate) fn record_sign_out_without_user(key: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(key, "Stored tokens carry no userId; skipped sign-out notification.");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = key;
	}
}

pub(crate) fn record_retry(operation: &'static str, attempt: u32, delay: StdDuration, err: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(
			operation,
			attempt,
			delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
			error = %err,
			"retrying"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (operation, attempt, delay, err);
	}
}
