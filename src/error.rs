//! Session-level error types shared across the token manager, dispatcher, cache, and stores.

// self
use crate::{_prelude::*, auth::DecodeError};

/// Session-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Errors are cheap to clone so that one failed fetch can be delivered to every caller that
/// coalesced onto it.
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Dispatched call failed on the wire or returned a non-success status.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// A token-affecting call (anonymous mint, refresh, sign-in) failed.
	#[error("Authentication call `{operation}` failed.")]
	AuthNetwork {
		/// Operation label (`anonymous_mint`, `refresh`, `sign_in`).
		operation: &'static str,
		/// Underlying transport failure.
		#[source]
		source: TransportError,
	},
	/// The stored refresh token expired; the caller must sign in again.
	#[error("Session expired at unix time {expired_at}; re-authentication is required.")]
	SessionExpired {
		/// Expiry (`exp` claim, unix seconds) of the refresh token.
		expired_at: i64,
	},
	/// A token supplied by the caller or issued by the server could not be decoded.
	#[error("Token could not be decoded.")]
	InvalidToken {
		/// Decoding failure.
		#[source]
		source: DecodeError,
	},
}
impl Error {
	/// Returns `true` when repeating the same call may succeed.
	///
	/// Used by [`RetryPolicy`](crate::retry::RetryPolicy); neither the cache nor the token
	/// manager retries on its own.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Transport(e) | Self::AuthNetwork { source: e, .. } => e.is_retryable(),
			_ => false,
		}
	}

	pub(crate) fn auth_network(operation: &'static str, err: Error) -> Self {
		match err {
			Self::Transport(source) => Self::AuthNetwork { operation, source },
			other => other,
		}
	}
}

/// Configuration and validation failures.
#[derive(Clone, Debug, PartialEq, ThisError)]
pub enum ConfigError {
	/// Project identifier was empty or contained whitespace.
	#[error("Project id `{project_id}` is invalid.")]
	InvalidProjectId {
		/// Offending identifier.
		project_id: String,
	},
	/// A base or override URL could not be built.
	#[error("Request URL is invalid.")]
	InvalidUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// The URL override cannot act as a base (e.g. `data:` URLs).
	#[error("URL override `{url}` cannot be used as a base URL.")]
	InvalidOverride {
		/// Rejected override.
		url: String,
	},
	/// The outbound HTTP request could not be assembled.
	#[error("HTTP request could not be constructed: {message}.")]
	HttpRequest {
		/// Builder failure summary.
		message: String,
	},
	/// Cache capacity must admit at least one entry.
	#[error("Cache capacity must be at least 1.")]
	ZeroCacheCapacity,
	/// Retry backoff multiplier must be finite and at least 1.
	#[error("Retry backoff rate {rate} is invalid.")]
	InvalidRetryRate {
		/// Rejected multiplier.
		rate: f64,
	},
}
impl From<url::ParseError> for ConfigError {
	fn from(source: url::ParseError) -> Self {
		Self::InvalidUrl { source }
	}
}
impl From<oauth2::http::Error> for ConfigError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::HttpRequest { message: e.to_string() }
	}
}

/// Transport-level failures (network, timeout, non-success status).
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the backend.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: SharedError,
	},
	/// The request exceeded the configured timeout.
	#[error("Request timed out.")]
	Timeout,
	/// The backend answered with a non-success status.
	#[error("Backend returned {status} {status_text}.")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Canonical reason phrase.
		status_text: String,
		/// Response body (lossy UTF-8), for diagnostics.
		body: String,
	},
	/// The response body did not match the expected shape.
	#[error("Response body could not be decoded: {message}.")]
	Body {
		/// Structured parsing failure, including the JSON path.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Network { source: Arc::new(src) }
	}

	/// Returns `true` for failures that are plausibly transient.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Network { .. } | Self::Timeout => true,
			Self::Status { status, .. } => *status == 429 || *status >= 500,
			Self::Body { .. } => false,
		}
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout } else { Self::network(e) }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn retryable_classification_follows_status() {
		let server = TransportError::Status {
			status: 503,
			status_text: "Service Unavailable".into(),
			body: String::new(),
		};
		let client = TransportError::Status {
			status: 404,
			status_text: "Not Found".into(),
			body: String::new(),
		};

		assert!(Error::from(server.clone()).is_retryable());
		assert!(!Error::from(client).is_retryable());
		assert!(Error::AuthNetwork { operation: "refresh", source: server }.is_retryable());
		assert!(!Error::SessionExpired { expired_at: 0 }.is_retryable());
		assert!(Error::from(TransportError::Timeout).is_retryable());
	}

	#[test]
	fn auth_network_wraps_only_transport_failures() {
		let wrapped = Error::auth_network("refresh", TransportError::Timeout.into());

		assert!(matches!(wrapped, Error::AuthNetwork { operation: "refresh", .. }));

		let untouched = Error::auth_network("refresh", Error::SessionExpired { expired_at: 1 });

		assert!(matches!(untouched, Error::SessionExpired { expired_at: 1 }));
	}

	#[test]
	fn store_error_converts_into_session_error_with_source() {
		let store_error =
			crate::store::StoreError::Backend { message: "disk unavailable".into() };
		let session_error: Error = store_error.clone().into();

		assert!(matches!(session_error, Error::Storage(_)));

		let source = StdError::source(&session_error)
			.expect("Session error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}
}
