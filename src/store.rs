//! Credential persistence: a platform key-value capability and the token-record store built on
//! top of it.
//!
//! Platforms differ only in how they persist strings (browser storage, mobile storage, a file,
//! process memory), so the platform seam is the tiny [`KeyValueStore`] contract. The session
//! core talks to a [`CredentialStore`], which owns the namespaced key and the JSON shape of the
//! persisted [`TokenRecord`].

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::TokenRecord};

/// Boxed future returned by [`KeyValueStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Namespace prefixed to every credential key unless configured otherwise.
pub const DEFAULT_NAMESPACE: &str = "RIO_TOKENS_KEY";

// Some platform bindings persist a missing value as this literal.
const UNDEFINED_SENTINEL: &str = "undefined";

/// String key-value persistence implemented per platform.
pub trait KeyValueStore
where
	Self: Send + Sync,
{
	/// Reads the value stored under `key`, if any.
	fn get<'a>(&'a self, key: &'a str) -> StoreFuture<'a, Option<String>>;

	/// Stores `value` under `key`, replacing any previous value.
	fn set<'a>(&'a self, key: &'a str, value: String) -> StoreFuture<'a, ()>;

	/// Removes the value under `key`; removing a missing key is not an error.
	fn remove<'a>(&'a self, key: &'a str) -> StoreFuture<'a, ()>;
}

/// Error type produced by [`KeyValueStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Namespaced key identifying one logical session's credentials.
///
/// Renders as `<namespace>.<projectId>[.<instanceKey>]`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreKey {
	/// Key namespace.
	pub namespace: String,
	/// Project the session belongs to.
	pub project_id: String,
	/// Optional discriminator for several sessions on the same project.
	pub instance_key: Option<String>,
}
impl StoreKey {
	/// Builds a key under the default namespace.
	pub fn new(project_id: impl Into<String>, instance_key: Option<String>) -> Self {
		Self { namespace: DEFAULT_NAMESPACE.into(), project_id: project_id.into(), instance_key }
	}

	/// Overrides the namespace.
	pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
		self.namespace = namespace.into();

		self
	}
}
impl Display for StoreKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}.{}", self.namespace, self.project_id)?;

		if let Some(instance) = &self.instance_key {
			write!(f, ".{instance}")?;
		}

		Ok(())
	}
}

/// Persists a single [`TokenRecord`] under a [`StoreKey`].
#[derive(Clone)]
pub struct CredentialStore {
	backend: Arc<dyn KeyValueStore>,
	key: String,
}
impl CredentialStore {
	/// Binds a backend to the rendered `key`.
	pub fn new(backend: Arc<dyn KeyValueStore>, key: &StoreKey) -> Self {
		Self { backend, key: key.to_string() }
	}

	/// Rendered storage key.
	pub fn key(&self) -> &str {
		&self.key
	}

	/// Loads the stored record.
	///
	/// A value that is not a record (including the `"undefined"` sentinel) reads as absent so
	/// a corrupted entry degrades to "signed out" instead of wedging every call.
	pub async fn load(&self) -> Result<Option<TokenRecord>, StoreError> {
		let Some(raw) = self.backend.get(&self.key).await? else {
			return Ok(None);
		};

		if raw.is_empty() || raw == UNDEFINED_SENTINEL {
			return Ok(None);
		}

		match serde_json::from_str(&raw) {
			Ok(record) => Ok(Some(record)),
			Err(e) => {
				crate::obs::record_discarded_credentials(&self.key, &e);

				Ok(None)
			},
		}
	}

	/// Replaces the stored record.
	pub async fn save(&self, record: &TokenRecord) -> Result<(), StoreError> {
		let raw = serde_json::to_string(record)
			.map_err(|e| StoreError::Serialization { message: e.to_string() })?;

		self.backend.set(&self.key, raw).await
	}

	/// Removes the stored record.
	pub async fn clear(&self) -> Result<(), StoreError> {
		self.backend.remove(&self.key).await
	}
}
impl Debug for CredentialStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialStore").field("key", &self.key).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{ClockSkew, TokenSecret};

	fn record() -> TokenRecord {
		TokenRecord {
			access_token: TokenSecret::new("access.jwt.sig"),
			refresh_token: TokenSecret::new("refresh.jwt.sig"),
			server_clock_diff_seconds: ClockSkew(3),
		}
	}

	#[test]
	fn store_key_renders_namespace_project_and_instance() {
		assert_eq!(StoreKey::new("proj", None).to_string(), "RIO_TOKENS_KEY.proj");
		assert_eq!(
			StoreKey::new("proj", Some("tab-2".into())).with_namespace("NS").to_string(),
			"NS.proj.tab-2"
		);
	}

	#[tokio::test]
	async fn credential_store_round_trips_exact_json() {
		let backend = Arc::new(MemoryStore::default());
		let store = CredentialStore::new(backend.clone(), &StoreKey::new("proj", None));

		store.save(&record()).await.expect("Saving a record should succeed.");

		let raw = backend
			.get("RIO_TOKENS_KEY.proj")
			.await
			.expect("Backend read should succeed.")
			.expect("Record should be stored under the rendered key.");

		assert_eq!(
			raw,
			r#"{"accessToken":"access.jwt.sig","refreshToken":"refresh.jwt.sig","serverClockDiffSeconds":3}"#
		);
		assert_eq!(store.load().await.expect("Load should succeed."), Some(record()));

		store.clear().await.expect("Clearing should succeed.");

		assert_eq!(store.load().await.expect("Load after clear should succeed."), None);
	}

	#[tokio::test]
	async fn corrupted_values_read_as_absent() {
		let backend = Arc::new(MemoryStore::default());
		let store = CredentialStore::new(backend.clone(), &StoreKey::new("proj", None));

		for raw in ["undefined", "", "{not json", r#"{"accessToken":1}"#] {
			backend.set(store.key(), raw.to_owned()).await.expect("Seeding should succeed.");

			assert_eq!(store.load().await.expect("Load should not fail."), None, "raw={raw}");
		}
	}
}
