//! HTTP call dispatcher: turns a [`CallRequest`] into a physical request and routes reads
//! through the response cache.
//!
//! The dispatcher never touches token or cache state on its own; it only builds requests,
//! hands cacheable reads to [`ResponseCache::get`], and sends everything else directly.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use oauth2::{
	HttpRequest,
	http::{
		HeaderMap, HeaderName, HeaderValue, Method, Request,
		header::{AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	cache::{RequestKey, ResponseCache},
	clock::Clock,
	config::ClientConfig,
	error::ConfigError,
	http::{self, CapturedResponse, HttpTransport, TransportErrorMapper},
};

const CULTURE_PARAM: &str = "__culture";
const PLATFORM_PARAM: &str = "__platform";
const DATA_PARAM: &str = "data";
const IS_BASE64_PARAM: &str = "__isbase64";

/// One logical call: method, path, query, headers, optional JSON body.
#[derive(Clone, Debug)]
pub struct CallRequest {
	/// HTTP method.
	pub method: Method,
	/// Path below `/<project>/`, e.g. `CALL/Orders/list`.
	pub path: String,
	/// Target project; defaults to the configured project.
	pub project_id: Option<String>,
	/// Query parameters in insertion order.
	pub query: Vec<(String, String)>,
	/// Extra request headers.
	pub headers: HeaderMap,
	/// Structured payload.
	pub body: Option<serde_json::Value>,
	/// Whether a GET body rides in the query as base64 (`data` + `__isbase64`).
	pub base64_body: bool,
	/// Token attached instead of the session's own.
	pub token: Option<String>,
	/// Skips the response cache even for reads.
	pub bypass_cache: bool,
}
impl CallRequest {
	/// Creates a request with the given method and path.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self {
			method,
			path: path.into(),
			project_id: None,
			query: Vec::new(),
			headers: HeaderMap::new(),
			body: None,
			base64_body: true,
			token: None,
			bypass_cache: false,
		}
	}

	/// Creates a GET request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Creates a POST request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::POST, path)
	}

	/// Targets `project_id` instead of the configured project.
	pub fn project(mut self, project_id: impl Into<String>) -> Self {
		self.project_id = Some(project_id.into());

		self
	}

	/// Appends a query parameter.
	pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.query.push((name.into(), value.into()));

		self
	}

	/// Sets a request header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Attaches a JSON payload.
	pub fn body(mut self, body: serde_json::Value) -> Self {
		self.body = Some(body);

		self
	}

	/// Sends a GET payload as a request body instead of a base64 query parameter.
	pub fn without_base64(mut self) -> Self {
		self.base64_body = false;

		self
	}

	/// Attaches `token` instead of the session's token.
	pub fn token(mut self, token: impl Into<String>) -> Self {
		self.token = Some(token.into());

		self
	}

	/// Always performs a physical call.
	pub fn bypass_cache(mut self) -> Self {
		self.bypass_cache = true;

		self
	}

	fn has_query(&self, name: &str) -> bool {
		self.query.iter().any(|(key, _)| key == name)
	}
}

/// Builds physical requests and sends them, through the cache when the call is a read.
pub struct Dispatcher<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Arc<ClientConfig>,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	cache: Option<Arc<ResponseCache>>,
}
impl<C, M> Dispatcher<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a dispatcher; a cache is built when the config enables one.
	pub fn new(
		config: Arc<ClientConfig>,
		http_client: Arc<C>,
		transport_mapper: Arc<M>,
		clock: Arc<dyn Clock>,
	) -> Self {
		let cache = config.cache.map(|cache| Arc::new(ResponseCache::new(cache, clock)));

		Self { config, http_client, transport_mapper, cache }
	}

	/// Response cache, when enabled.
	pub fn cache(&self) -> Option<&ResponseCache> {
		self.cache.as_deref()
	}

	/// Sends `call`, attaching `bearer` unless the call carries its own token.
	pub async fn dispatch(
		&self,
		call: &CallRequest,
		bearer: Option<&str>,
	) -> Result<CapturedResponse> {
		let (request, key) = self.prepare(call, bearer)?;

		match (key, &self.cache) {
			(Some(key), Some(cache)) => cache.get(key, || self.send(request)).await,
			_ => self.send(request).await,
		}
	}

	/// Builds the physical request and, for cacheable reads, its cache key.
	pub fn prepare(
		&self,
		call: &CallRequest,
		bearer: Option<&str>,
	) -> Result<(HttpRequest, Option<RequestKey>)> {
		let project_id = call.project_id.as_deref().unwrap_or(&self.config.project_id);
		let mut url = self.config.endpoint(project_id, &call.path)?;
		let mut query = call.query.clone();

		if let Some(culture) = &self.config.culture
			&& !call.has_query(CULTURE_PARAM)
		{
			query.push((CULTURE_PARAM.into(), culture.clone()));
		}
		if let Some(platform) = &self.config.platform
			&& !call.has_query(PLATFORM_PARAM)
		{
			query.push((PLATFORM_PARAM.into(), platform.clone()));
		}

		let is_get = call.method == Method::GET;
		let mut raw_body = None;

		if let Some(body) = &call.body {
			let encoded = serde_json::to_vec(&sort_keys(body))
				.map_err(|e| ConfigError::HttpRequest { message: e.to_string() })?;

			if is_get && call.base64_body {
				query.push((DATA_PARAM.into(), URL_SAFE_NO_PAD.encode(encoded)));
				query.push((IS_BASE64_PARAM.into(), "true".into()));
			} else {
				raw_body = Some(encoded);
			}
		}
		if !query.is_empty() {
			url.query_pairs_mut().extend_pairs(&query);
		}

		let key = (is_get && raw_body.is_none() && !call.bypass_cache && self.cache.is_some())
			.then(|| RequestKey::new(&url));
		let has_body = raw_body.is_some();
		let mut request = Request::builder()
			.method(call.method.clone())
			.uri(url.as_str())
			.body(raw_body.unwrap_or_default())
			.map_err(ConfigError::from)?;
		let headers = request.headers_mut();

		headers.extend(call.headers.clone());

		if has_body {
			headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		}
		if let Some(token) = call.token.as_deref().or(bearer) {
			let value = HeaderValue::from_str(&format!("Bearer {token}"))
				.map_err(|e| ConfigError::HttpRequest { message: e.to_string() })?;

			headers.insert(AUTHORIZATION, value);
		}

		Ok((request, key))
	}

	async fn send(&self, request: HttpRequest) -> Result<CapturedResponse> {
		http::execute(
			self.http_client.as_ref(),
			self.transport_mapper.as_ref(),
			self.config.request_timeout,
			request,
		)
		.await
	}
}
impl<C, M> Debug for Dispatcher<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Dispatcher")
			.field("project_id", &self.config.project_id)
			.field("cache", &self.cache)
			.finish()
	}
}

// Equal payloads must encode to equal query strings regardless of field order.
fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
	match value {
		serde_json::Value::Object(map) => {
			let mut fields = map.iter().collect::<Vec<_>>();

			fields.sort_by(|a, b| a.0.cmp(b.0));

			serde_json::Value::Object(
				fields.into_iter().map(|(name, value)| (name.clone(), sort_keys(value))).collect(),
			)
		},
		serde_json::Value::Array(items) =>
			serde_json::Value::Array(items.iter().map(sort_keys).collect()),
		other => other.clone(),
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{
		clock::SystemClock,
		config::MemoryCacheConfig,
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	};

	fn dispatcher(
		config: ClientConfig,
	) -> Dispatcher<ReqwestHttpClient, ReqwestTransportErrorMapper> {
		Dispatcher::new(
			Arc::new(config),
			Arc::new(ReqwestHttpClient::default()),
			Arc::new(ReqwestTransportErrorMapper),
			Arc::new(SystemClock),
		)
	}

	fn query_of(request: &HttpRequest) -> Vec<(String, String)> {
		let url = Url::parse(&request.uri().to_string()).expect("Request URI should parse.");

		url.query_pairs().into_owned().collect()
	}

	#[test]
	fn defaults_are_injected_unless_overridden() {
		let config = ClientConfig::builder("proj")
			.culture("en-US")
			.platform("IOS")
			.build()
			.expect("Config should build.");
		let dispatcher = dispatcher(config);
		let (request, key) = dispatcher
			.prepare(&CallRequest::get("CALL/Cart/get").query("__culture", "tr-TR"), Some("tok"))
			.expect("Request should build.");

		assert_eq!(request.uri().path(), "/proj/CALL/Cart/get");
		assert_eq!(request.uri().host(), Some("proj.api.retter.io"));
		assert_eq!(
			query_of(&request),
			vec![("__culture".into(), "tr-TR".into()), ("__platform".into(), "IOS".into())]
		);
		assert_eq!(
			request.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
			Some("Bearer tok")
		);
		assert!(key.is_none(), "No cache is configured.");
	}

	#[test]
	fn get_bodies_ride_in_the_query_as_base64() {
		let config = ClientConfig::builder("proj")
			.memory_cache(MemoryCacheConfig::default())
			.build()
			.expect("Config should build.");
		let dispatcher = dispatcher(config);
		let call = CallRequest::get("CALL/Search/run")
			.body(serde_json::json!({ "z": 1, "a": { "y": true, "b": null } }));
		let (request, key) = dispatcher.prepare(&call, None).expect("Request should build.");
		let query = query_of(&request);
		let expected = URL_SAFE_NO_PAD.encode(r#"{"a":{"b":null,"y":true},"z":1}"#);

		assert_eq!(
			query,
			vec![("data".into(), expected), ("__isbase64".into(), "true".into())]
		);
		assert!(request.body().is_empty());
		assert!(request.headers().get(AUTHORIZATION).is_none());
		assert!(key.is_some(), "Encoded reads stay cacheable.");

		let (raw, raw_key) = dispatcher
			.prepare(&call.clone().without_base64(), None)
			.expect("Request should build.");

		assert!(query_of(&raw).is_empty());
		assert_eq!(raw.body(), br#"{"a":{"b":null,"y":true},"z":1}"#);
		assert!(raw_key.is_none());
	}

	#[test]
	fn writes_and_bypassed_reads_skip_the_cache() {
		let config = ClientConfig::builder("proj")
			.memory_cache(MemoryCacheConfig::default())
			.build()
			.expect("Config should build.");
		let dispatcher = dispatcher(config);
		let add = CallRequest::post("CALL/Cart/add").body(serde_json::json!({ "id": 1 }));
		let (post, post_key) = dispatcher.prepare(&add, None).expect("Request should build.");

		assert_eq!(post.method(), &Method::POST);
		assert_eq!(
			post.headers().get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
			Some("application/json")
		);
		assert!(post_key.is_none());

		let (_, bypass_key) = dispatcher
			.prepare(&CallRequest::get("CALL/Cart/get").bypass_cache(), None)
			.expect("Request should build.");

		assert!(bypass_key.is_none());

		let routed_call = CallRequest::get("INSTANCE/ProjectUser").project("root").token("own");
		let (routed, _) =
			dispatcher.prepare(&routed_call, Some("t")).expect("Request should build.");

		assert_eq!(routed.uri().host(), Some("root.api.retter.io"));
		assert_eq!(
			routed.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok()),
			Some("Bearer own")
		);
	}
}
