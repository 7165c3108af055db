//! Optional observability helpers for session operations and the response cache.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `rio_session.operation` with the
//!   `operation` and `stage` fields, plus `warn` events for swallowed failures and `debug`
//!   events for cache activity (when the cache's `enable_logs` is set).
//! - Enable `metrics` to increment `rio_session_operation_total` (labeled by `operation` +
//!   `outcome`) and `rio_session_cache_events_total` (labeled by `event`).

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Session operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Anonymous session issuance.
	AnonymousMint,
	/// Access-token refresh.
	Refresh,
	/// Custom-token sign-in.
	SignIn,
	/// Sign-out notification and local clear.
	SignOut,
	/// Authenticated call dispatched on behalf of the caller.
	Call,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::AnonymousMint => "anonymous_mint",
			Operation::Refresh => "refresh",
			Operation::SignIn => "sign_in",
			Operation::SignOut => "sign_out",
			Operation::Call => "call",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationOutcome {
	/// Entry to a session helper.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OperationOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OperationOutcome::Attempt => "attempt",
			OperationOutcome::Success => "success",
			OperationOutcome::Failure => "failure",
		}
	}
}
impl Display for OperationOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Response cache activity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEvent {
	/// Served from a live entry.
	Hit,
	/// Joined an identical in-flight request.
	Joined,
	/// Performed the physical fetch.
	Fetched,
	/// Admitted a fresh response.
	Stored,
	/// Response carried no freshness and was not admitted.
	NotStored,
	/// Dropped a stale entry on lookup.
	Expired,
	/// Dropped the least recently touched entry to respect capacity.
	Evicted,
}
impl CacheEvent {
	/// Returns a stable label suitable for log or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CacheEvent::Hit => "hit",
			CacheEvent::Joined => "joined",
			CacheEvent::Fetched => "fetched",
			CacheEvent::Stored => "stored",
			CacheEvent::NotStored => "not_stored",
			CacheEvent::Expired => "expired",
			CacheEvent::Evicted => "evicted",
		}
	}
}
impl Display for CacheEvent {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Counts a cache event and, when `log` is set, emits a debug event keyed by fingerprint.
pub(crate) fn record_cache_event(log: bool, event: CacheEvent, key: &crate::cache::RequestKey) {
	count_cache_event(event);

	if log {
		log_cache_event(event, key);
	}
}
