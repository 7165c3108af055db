//! Transport seam for every outbound call.
//!
//! The session core depends on an HTTP stack only through [`HttpTransport`], which hands out
//! short-lived [`AsyncHttpClient`] handles bound to a request timeout. Errors raised by those
//! handles are normalized by a [`TransportErrorMapper`], and responses are captured into a
//! [`CapturedResponse`] that the response cache can clone and replay.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{HeaderMap, StatusCode},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::{ConfigError, TransportError},
};

/// Abstraction over HTTP transports capable of executing session calls.
///
/// Implementations must be `Send + Sync + 'static` so one transport can be shared by the
/// token manager and the dispatcher, and the handles they return must own whatever state
/// the request future needs so that future stays `Send`.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle bound to a single timeout.
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds a handle whose calls fail with a timeout once `timeout` elapses.
	fn handle(&self, timeout: StdDuration) -> Self::Handle;
}

/// Maps transport-specific failures into session errors.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a session error.
	fn map_transport_error(&self, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::network(inner).into(),
			HttpClientError::Other(message) =>
				TransportError::network(std::io::Error::other(message)).into(),
			_ => TransportError::network(std::io::Error::other("unknown transport failure"))
				.into(),
		}
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	type Handle = TimeoutHandle;
	type TransportError = ReqwestError;

	fn handle(&self, timeout: StdDuration) -> Self::Handle {
		TimeoutHandle(Arc::new(TimeoutClient { client: self.0.clone(), timeout }))
	}
}

#[cfg(feature = "reqwest")]
struct TimeoutClient {
	client: ReqwestClient,
	timeout: StdDuration,
}

/// Handle returned by [`ReqwestHttpClient`]; applies its timeout to every request.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct TimeoutHandle(Arc<TimeoutClient>);
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for TimeoutHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		let inner = Arc::clone(&self.0);

		Box::pin(async move {
			let mut request: reqwest::Request = request.try_into().map_err(Box::new)?;

			*request.timeout_mut() = Some(inner.timeout);

			let response = inner.client.execute(request).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();
			let mut response_new =
				HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*response_new.status_mut() = status;
			*response_new.headers_mut() = headers;

			Ok(response_new)
		})
	}
}
#[cfg(feature = "reqwest")]
impl Debug for TimeoutHandle {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TimeoutHandle").field("timeout", &self.0.timeout).finish()
	}
}

/// Fully buffered response: status, headers, and body.
///
/// Cached entries hold these by value and every hit hands out a clone, so waiters never share
/// mutable state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedResponse {
	/// HTTP status code.
	pub status: u16,
	/// Canonical reason phrase for `status`, empty when unknown.
	pub status_text: String,
	/// Response headers.
	pub headers: HeaderMap,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl CapturedResponse {
	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Header value as text, if present and valid UTF-8.
	pub fn header(&self, name: &str) -> Option<&str> {
		self.headers.get(name).and_then(|value| value.to_str().ok())
	}

	/// Body decoded as lossy UTF-8.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T, TransportError>
	where
		T: DeserializeOwned,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|e| TransportError::Body { message: e.to_string() })
	}

	/// Converts a non-success response into [`TransportError::Status`].
	pub fn error_for_status(self) -> Result<Self, TransportError> {
		if self.is_success() {
			Ok(self)
		} else {
			Err(TransportError::Status {
				status: self.status,
				status_text: self.status_text.clone(),
				body: self.text(),
			})
		}
	}
}
impl From<HttpResponse> for CapturedResponse {
	fn from(response: HttpResponse) -> Self {
		let status = response.status();
		let (parts, body) = response.into_parts();

		Self {
			status: status.as_u16(),
			status_text: StatusCode::canonical_reason(&status).unwrap_or_default().to_owned(),
			headers: parts.headers,
			body,
		}
	}
}

/// Executes `request` on a fresh handle and captures the response.
///
/// Non-success statuses surface as [`TransportError::Status`].
pub(crate) async fn execute<C, M>(
	client: &C,
	mapper: &M,
	timeout: StdDuration,
	request: HttpRequest,
) -> Result<CapturedResponse>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let handle = client.handle(timeout);
	let response = handle.call(request).await.map_err(|e| mapper.map_transport_error(e))?;

	Ok(CapturedResponse::from(response).error_for_status()?)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn response(status: u16, body: &str) -> CapturedResponse {
		let mut raw = HttpResponse::new(body.as_bytes().to_vec());

		*raw.status_mut() = StatusCode::from_u16(status).expect("Fixture status should be valid.");
		raw.headers_mut().insert("cache-control", "max-age=5".parse().expect("Header value"));

		CapturedResponse::from(raw)
	}

	#[test]
	fn captured_response_exposes_status_headers_and_json() {
		let ok = response(200, r#"{"value":7}"#);

		assert!(ok.is_success());
		assert_eq!(ok.status_text, "OK");
		assert_eq!(ok.header("Cache-Control"), Some("max-age=5"));
		assert_eq!(
			ok.json::<serde_json::Value>().expect("Body should decode."),
			serde_json::json!({ "value": 7 })
		);

		#[derive(Debug, Deserialize)]
		#[allow(dead_code)]
		struct Shape {
			value: String,
		}

		let err = ok.json::<Shape>().expect_err("Mismatched shape should fail.");

		assert!(matches!(err, TransportError::Body { ref message } if message.contains("value")));
	}

	#[test]
	fn non_success_becomes_status_error() {
		let err = response(503, "busy").error_for_status().expect_err("503 should fail.");

		assert!(matches!(
			err,
			TransportError::Status { status: 503, ref status_text, ref body }
				if status_text == "Service Unavailable" && body == "busy"
		));
	}
}
