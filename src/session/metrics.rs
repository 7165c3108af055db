// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::obs::{Operation, OperationOutcome};

/// Thread-safe counters for one operation kind.
#[derive(Debug, Default)]
pub struct OperationCounters {
	attempts: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl OperationCounters {
	/// Returns the total number of attempts.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of successful completions.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of failures surfaced to the caller.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}
}

/// In-process counters for every session operation.
#[derive(Debug, Default)]
pub struct SessionMetrics {
	anonymous_mint: OperationCounters,
	refresh: OperationCounters,
	sign_in: OperationCounters,
	sign_out: OperationCounters,
	call: OperationCounters,
}
impl SessionMetrics {
	/// Counters for `operation`.
	pub fn get(&self, operation: Operation) -> &OperationCounters {
		match operation {
			Operation::AnonymousMint => &self.anonymous_mint,
			Operation::Refresh => &self.refresh,
			Operation::SignIn => &self.sign_in,
			Operation::SignOut => &self.sign_out,
			Operation::Call => &self.call,
		}
	}

	pub(crate) fn record(&self, operation: Operation, outcome: OperationOutcome) {
		let counters = self.get(operation);
		let counter = match outcome {
			OperationOutcome::Attempt => &counters.attempts,
			OperationOutcome::Success => &counters.success,
			OperationOutcome::Failure => &counters.failure,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}
}
