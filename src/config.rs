//! Client configuration: project identity, endpoint resolution, query defaults, cache, timeout,
//! and retry settings.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	retry::RetryPolicy,
	store::{DEFAULT_NAMESPACE, StoreKey},
};

/// Default ceiling applied to every transport call.
pub const DEFAULT_REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);
/// Project that hosts the auth endpoints unless configured otherwise.
pub const DEFAULT_ROOT_PROJECT_ID: &str = "root";

/// Deployment region; each maps to a base API host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Region {
	/// Production, EU West 1.
	#[default]
	EuWest1,
	/// Beta, EU West 1.
	EuWest1Beta,
}
impl Region {
	/// Base API host for the region; projects are addressed as `<project>.<host>`.
	pub const fn host(self) -> &'static str {
		match self {
			Region::EuWest1 => "api.retter.io",
			Region::EuWest1Beta => "test-api.retter.io",
		}
	}
}

/// In-memory response cache settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCacheConfig {
	/// Capacity bound; the least recently touched entry is evicted beyond it.
	pub max_entry_count: usize,
	/// Emits debug events for hits, joins, stores, and evictions.
	pub enable_logs: bool,
}
impl MemoryCacheConfig {
	/// Default capacity bound.
	pub const DEFAULT_MAX_ENTRY_COUNT: usize = 100;
}
impl Default for MemoryCacheConfig {
	fn default() -> Self {
		Self { max_entry_count: Self::DEFAULT_MAX_ENTRY_COUNT, enable_logs: false }
	}
}

/// Validated client configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
	/// Project the client talks to.
	pub project_id: String,
	/// Discriminates several sessions on the same project.
	pub instance_key: Option<String>,
	/// Project hosting the auth endpoints.
	pub root_project_id: String,
	/// Deployment region.
	pub region: Region,
	/// Base URL replacing `https://<project>.<region host>` for every call.
	pub url: Option<Url>,
	/// Injected as `__culture` unless a call sets it.
	pub culture: Option<String>,
	/// Injected as `__platform` unless a call sets it.
	pub platform: Option<String>,
	/// Response cache settings; `None` disables caching.
	pub cache: Option<MemoryCacheConfig>,
	/// Ceiling applied to every transport call.
	pub request_timeout: StdDuration,
	/// Retry policy applied around authenticated calls.
	pub retry: RetryPolicy,
	/// Namespace of the credential storage key.
	pub storage_namespace: String,
}
impl ClientConfig {
	/// Creates a new builder for the provided project.
	pub fn builder(project_id: impl Into<String>) -> ClientConfigBuilder {
		ClientConfigBuilder::new(project_id)
	}

	/// Base URL for calls addressed to `project_id`.
	pub fn base_url(&self, project_id: &str) -> Result<Url, ConfigError> {
		match &self.url {
			Some(url) => Ok(url.clone()),
			None => Ok(Url::parse(&format!("https://{project_id}.{}", self.region.host()))?),
		}
	}

	/// Absolute URL for `path` on `project_id`: `<base>/<project>/<path>`.
	pub fn endpoint(&self, project_id: &str, path: &str) -> Result<Url, ConfigError> {
		let mut url = self.base_url(project_id)?;

		{
			let mut segments = url
				.path_segments_mut()
				.map_err(|_| ConfigError::InvalidOverride { url: self.base_url_label() })?;

			segments.pop_if_empty().push(project_id);

			for segment in path.split('/').filter(|s| !s.is_empty()) {
				segments.push(segment);
			}
		}

		Ok(url)
	}

	/// Credential storage key for this project and instance.
	pub fn store_key(&self) -> StoreKey {
		StoreKey::new(&self.project_id, self.instance_key.clone())
			.with_namespace(&self.storage_namespace)
	}

	fn base_url_label(&self) -> String {
		self.url.as_ref().map(Url::to_string).unwrap_or_default()
	}
}

/// Builder for [`ClientConfig`] values.
#[derive(Debug)]
pub struct ClientConfigBuilder {
	project_id: String,
	instance_key: Option<String>,
	root_project_id: String,
	region: Region,
	url: Option<Url>,
	culture: Option<String>,
	platform: Option<String>,
	cache: Option<MemoryCacheConfig>,
	request_timeout: StdDuration,
	retry: RetryPolicy,
	storage_namespace: String,
}
impl ClientConfigBuilder {
	/// Creates a new builder seeded with the provided project.
	pub fn new(project_id: impl Into<String>) -> Self {
		Self {
			project_id: project_id.into(),
			instance_key: None,
			root_project_id: DEFAULT_ROOT_PROJECT_ID.into(),
			region: Region::default(),
			url: None,
			culture: None,
			platform: None,
			cache: None,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			retry: RetryPolicy::default(),
			storage_namespace: DEFAULT_NAMESPACE.into(),
		}
	}

	/// Sets the instance key.
	pub fn instance_key(mut self, key: impl Into<String>) -> Self {
		self.instance_key = Some(key.into());

		self
	}

	/// Overrides the project hosting the auth endpoints.
	pub fn root_project_id(mut self, id: impl Into<String>) -> Self {
		self.root_project_id = id.into();

		self
	}

	/// Selects the deployment region.
	pub fn region(mut self, region: Region) -> Self {
		self.region = region;

		self
	}

	/// Routes every call to `url` instead of the region host.
	pub fn url(mut self, url: Url) -> Self {
		self.url = Some(url);

		self
	}

	/// Sets the `__culture` default.
	pub fn culture(mut self, culture: impl Into<String>) -> Self {
		self.culture = Some(culture.into());

		self
	}

	/// Sets the `__platform` default.
	pub fn platform(mut self, platform: impl Into<String>) -> Self {
		self.platform = Some(platform.into());

		self
	}

	/// Enables the in-memory response cache.
	pub fn memory_cache(mut self, cache: MemoryCacheConfig) -> Self {
		self.cache = Some(cache);

		self
	}

	/// Overrides the transport timeout.
	pub fn request_timeout(mut self, timeout: StdDuration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Sets the retry policy for authenticated calls.
	pub fn retry(mut self, retry: RetryPolicy) -> Self {
		self.retry = retry;

		self
	}

	/// Overrides the credential storage namespace.
	pub fn storage_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.storage_namespace = namespace.into();

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<ClientConfig, ConfigError> {
		for id in [&self.project_id, &self.root_project_id] {
			if id.is_empty() || id.chars().any(char::is_whitespace) {
				return Err(ConfigError::InvalidProjectId { project_id: id.clone() });
			}
		}
		if let Some(url) = &self.url
			&& url.cannot_be_a_base()
		{
			return Err(ConfigError::InvalidOverride { url: url.to_string() });
		}
		if matches!(self.cache, Some(MemoryCacheConfig { max_entry_count: 0, .. })) {
			return Err(ConfigError::ZeroCacheCapacity);
		}

		Ok(ClientConfig {
			project_id: self.project_id,
			instance_key: self.instance_key,
			root_project_id: self.root_project_id,
			region: self.region,
			url: self.url,
			culture: self.culture,
			platform: self.platform,
			cache: self.cache,
			request_timeout: self.request_timeout,
			retry: self.retry,
			storage_namespace: self.storage_namespace,
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn region_hosts_build_project_urls() {
		let config = ClientConfig::builder("proj").build().expect("Default config should build.");

		assert_eq!(
			config.endpoint("proj", "/CALL/Class/method").expect("Endpoint").as_str(),
			"https://proj.api.retter.io/proj/CALL/Class/method"
		);

		let beta = ClientConfig::builder("proj")
			.region(Region::EuWest1Beta)
			.build()
			.expect("Beta config should build.");

		assert_eq!(
			beta.endpoint("root", "INSTANCE/ProjectUser").expect("Endpoint").as_str(),
			"https://root.test-api.retter.io/root/INSTANCE/ProjectUser"
		);
	}

	#[test]
	fn override_replaces_scheme_and_host() {
		let config = ClientConfig::builder("proj")
			.url(Url::parse("http://127.0.0.1:8080/").expect("Override should parse."))
			.build()
			.expect("Override config should build.");

		assert_eq!(
			config.endpoint("root", "/INSTANCE/ProjectUser").expect("Endpoint").as_str(),
			"http://127.0.0.1:8080/root/INSTANCE/ProjectUser"
		);
	}

	#[test]
	fn builder_rejects_invalid_settings() {
		assert!(matches!(
			ClientConfig::builder("my project").build(),
			Err(ConfigError::InvalidProjectId { .. })
		));
		assert!(matches!(
			ClientConfig::builder("proj")
				.memory_cache(MemoryCacheConfig { max_entry_count: 0, enable_logs: false })
				.build(),
			Err(ConfigError::ZeroCacheCapacity)
		));
		assert!(matches!(
			ClientConfig::builder("proj")
				.url(Url::parse("mailto:ops@example.com").expect("Mailto URL should parse."))
				.build(),
			Err(ConfigError::InvalidOverride { .. })
		));
	}

	#[test]
	fn defaults_match_documented_values() {
		let config = ClientConfig::builder("proj").build().expect("Default config should build.");

		assert_eq!(config.root_project_id, "root");
		assert_eq!(config.request_timeout, StdDuration::from_secs(30));
		assert_eq!(config.retry, RetryPolicy::NONE);
		assert_eq!(config.storage_namespace, "RIO_TOKENS_KEY");
		assert_eq!(config.store_key().to_string(), "RIO_TOKENS_KEY.proj");
		assert_eq!(MemoryCacheConfig::default().max_entry_count, 100);
	}
}
