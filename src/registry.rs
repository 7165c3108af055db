//! Explicit session handles keyed by project id and instance key.
//!
//! The composing application owns the registry. Asking twice for the same key returns the
//! same [`Session`]; different keys never share credentials or cache entries.

// self
use crate::{
	_prelude::*,
	config::ClientConfig,
	http::{HttpTransport, TransportErrorMapper},
	session::Session,
};
#[cfg(feature = "reqwest")]
use crate::{
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
	session::ReqwestSession,
	store::KeyValueStore,
};

/// Identity of one logical session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
	/// Project identifier.
	pub project_id: String,
	/// Optional instance discriminator.
	pub instance_key: Option<String>,
}
impl SessionKey {
	/// Builds a key from its parts.
	pub fn new(project_id: impl Into<String>, instance_key: Option<String>) -> Self {
		Self { project_id: project_id.into(), instance_key }
	}

	/// Key a session built from `config` is registered under.
	pub fn of(config: &ClientConfig) -> Self {
		Self::new(&config.project_id, config.instance_key.clone())
	}
}

/// Map of live sessions, one per [`SessionKey`].
pub struct SessionRegistry<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	sessions: Mutex<HashMap<SessionKey, Arc<Session<C, M>>>>,
}
impl<C, M> SessionRegistry<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self { sessions: Default::default() }
	}

	/// Returns the session for `config`'s key, building it with `make` on first use.
	///
	/// `make` runs at most once per key; later calls ignore their config.
	pub fn get_or_insert_with<F>(&self, config: ClientConfig, make: F) -> Arc<Session<C, M>>
	where
		F: FnOnce(ClientConfig) -> Session<C, M>,
	{
		self.sessions
			.lock()
			.entry(SessionKey::of(&config))
			.or_insert_with(|| Arc::new(make(config)))
			.clone()
	}

	/// Returns the registered session for `key`.
	pub fn get(&self, key: &SessionKey) -> Option<Arc<Session<C, M>>> {
		self.sessions.lock().get(key).cloned()
	}

	/// Unregisters and returns the session for `key`. Live handles keep working.
	pub fn remove(&self, key: &SessionKey) -> Option<Arc<Session<C, M>>> {
		self.sessions.lock().remove(key)
	}

	/// Number of registered sessions.
	pub fn len(&self) -> usize {
		self.sessions.lock().len()
	}

	/// Returns `true` if no session is registered.
	pub fn is_empty(&self) -> bool {
		self.sessions.lock().is_empty()
	}
}
#[cfg(feature = "reqwest")]
impl SessionRegistry<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Returns the reqwest-backed session for `config`, creating it over `store` on first use.
	pub fn get_or_create(
		&self,
		config: ClientConfig,
		store: Arc<dyn KeyValueStore>,
	) -> Arc<ReqwestSession> {
		self.get_or_insert_with(config, |config| ReqwestSession::new(config, store))
	}
}
impl<C, M> Default for SessionRegistry<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<C, M> Debug for SessionRegistry<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let mut keys = self.sessions.lock().keys().cloned().collect::<Vec<_>>();

		keys.sort();

		f.debug_struct("SessionRegistry").field("sessions", &keys).finish()
	}
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{config::MemoryCacheConfig, store::MemoryStore};

	fn config(project_id: &str, instance_key: Option<&str>) -> ClientConfig {
		let mut builder =
			ClientConfig::builder(project_id).memory_cache(MemoryCacheConfig::default());

		if let Some(instance_key) = instance_key {
			builder = builder.instance_key(instance_key);
		}

		builder.build().expect("Config should build.")
	}

	#[test]
	fn same_key_shares_a_handle_and_different_keys_are_isolated() {
		let registry = SessionRegistry::<ReqwestHttpClient, ReqwestTransportErrorMapper>::default();
		let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
		let first = registry.get_or_create(config("proj", None), store.clone());
		let again = registry.get_or_create(config("proj", None), store.clone());
		let tab = registry.get_or_create(config("proj", Some("tab-2")), store.clone());
		let other = registry.get_or_create(config("other", None), store);

		assert!(Arc::ptr_eq(&first, &again));
		assert!(!Arc::ptr_eq(&first, &tab));
		assert_eq!(first.storage_key(), "RIO_TOKENS_KEY.proj");
		assert_eq!(tab.storage_key(), "RIO_TOKENS_KEY.proj.tab-2");
		assert_eq!(other.storage_key(), "RIO_TOKENS_KEY.other");
		assert!(!std::ptr::eq(
			first.cache().expect("Cache is enabled."),
			tab.cache().expect("Cache is enabled.")
		));
		assert_eq!(registry.len(), 3);

		let removed =
			registry.remove(&SessionKey::new("proj", None)).expect("Session is registered.");

		assert!(Arc::ptr_eq(&removed, &first));
		assert!(registry.get(&SessionKey::new("proj", None)).is_none());
	}
}
