//! Token lifecycle manager and the authenticated call path.
//!
//! A [`Session`] owns one credential record (per project and instance key) and decides, for
//! every call, which access token to attach: the stored one while it is valid, a refreshed
//! one once the access token expires, or a freshly minted anonymous one when nothing is
//! stored. Every token-affecting operation runs behind a single auth queue, so two callers
//! never refresh the same pair twice and each one observes the state left by the operation
//! that completed before it.
//!
//! Decoded claims are kept in memory next to the raw record they came from and are
//! discarded as soon as the stored record differs, so a replaced pair never carries stale
//! claims.

mod anonymous;
mod metrics;
mod refresh;
mod sign_in;
mod sign_out;

pub use metrics::{OperationCounters, SessionMetrics};

// self
use crate::{
	_prelude::*,
	auth::{
		AuthSnapshot, AuthStatus, IssuedTokens, SessionTokens, TokenClaims, TokenRecord,
		TokenState,
	},
	cache::ResponseCache,
	clock::{Clock, SystemClock},
	config::ClientConfig,
	dispatch::{CallRequest, Dispatcher},
	http::{CapturedResponse, HttpTransport, TransportErrorMapper},
	obs::{self, Operation, OperationOutcome, OperationSpan},
	store::{CredentialStore, KeyValueStore},
};
#[cfg(feature = "reqwest")]
use crate::http::{ReqwestHttpClient, ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Session specialized for the crate's default reqwest transport stack.
pub type ReqwestSession = Session<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Token lifecycle manager plus dispatcher for one project and instance key.
pub struct Session<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: Arc<ClientConfig>,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	clock: Arc<dyn Clock>,
	dispatcher: Dispatcher<C, M>,
	credentials: CredentialStore,
	auth_queue: AsyncMutex<()>,
	decoded: Mutex<Option<SessionTokens>>,
	metrics: SessionMetrics,
}
impl<C, M> Session<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a session that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		config: ClientConfig,
		store: Arc<dyn KeyValueStore>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		let config = Arc::new(config);
		let http_client = http_client.into();
		let transport_mapper = mapper.into();
		let clock: Arc<dyn Clock> = Arc::new(SystemClock);
		let dispatcher = Dispatcher::new(
			config.clone(),
			http_client.clone(),
			transport_mapper.clone(),
			clock.clone(),
		);
		let credentials = CredentialStore::new(store, &config.store_key());

		Self {
			config,
			http_client,
			transport_mapper,
			clock,
			dispatcher,
			credentials,
			auth_queue: AsyncMutex::new(()),
			decoded: Mutex::new(None),
			metrics: SessionMetrics::default(),
		}
	}

	/// Replaces the clock used for expiry and freshness decisions.
	///
	/// The response cache is rebuilt, so call this before the session serves any reads.
	pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
		self.dispatcher = Dispatcher::new(
			self.config.clone(),
			self.http_client.clone(),
			self.transport_mapper.clone(),
			clock.clone(),
		);
		self.clock = clock;

		self
	}

	/// Validated configuration.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Operation counters.
	pub fn metrics(&self) -> &SessionMetrics {
		&self.metrics
	}

	/// Response cache, when enabled.
	pub fn cache(&self) -> Option<&ResponseCache> {
		self.dispatcher.cache()
	}

	/// Credential storage key.
	pub fn storage_key(&self) -> &str {
		self.credentials.key()
	}

	/// Returns a token pair that is valid for at least the expiry safety margin.
	///
	/// Mints an anonymous session when nothing usable is stored and refreshes an expired
	/// access token. Fails with [`Error::SessionExpired`] once the refresh token itself has
	/// expired; the stored record is then left untouched.
	pub async fn get_valid_token(&self) -> Result<SessionTokens> {
		let _queue = self.auth_queue.lock().await;
		let Some(tokens) = self.load_tokens().await? else {
			return self.mint_anonymous().await;
		};

		match tokens.state_at(self.clock.now()) {
			TokenState::Active => Ok(tokens),
			TokenState::AccessExpired => self.refresh(tokens).await,
			TokenState::RefreshExpired =>
				Err(Error::SessionExpired { expired_at: tokens.refresh_claims.expires_at() }),
		}
	}

	/// Authentication status of the stored record; no network access.
	pub async fn auth_status(&self) -> Result<AuthStatus> {
		Ok(self.auth_snapshot().await?.status)
	}

	/// Status plus user identity of the stored record; no network access.
	///
	/// A record whose refresh token has expired reports [`AuthStatus::SignedOut`].
	pub async fn auth_snapshot(&self) -> Result<AuthSnapshot> {
		let _queue = self.auth_queue.lock().await;

		Ok(match self.load_tokens().await? {
			Some(tokens) if tokens.state_at(self.clock.now()) != TokenState::RefreshExpired =>
				tokens.snapshot(),
			_ => AuthSnapshot::signed_out(),
		})
	}

	/// Decoded access-token claims of the stored record; no network access.
	pub async fn current_user(&self) -> Result<Option<TokenClaims>> {
		let _queue = self.auth_queue.lock().await;

		Ok(self.load_tokens().await?.map(|tokens| tokens.access_claims))
	}

	/// Dispatches `request` with a valid access token attached.
	///
	/// A request that carries its own token skips token acquisition. The configured retry
	/// policy wraps the whole call, token acquisition included.
	pub async fn call(&self, request: CallRequest) -> Result<CapturedResponse> {
		let request = &request;

		self.observe(
			Operation::Call,
			"call",
			self.config.retry.run(Operation::Call.as_str(), move || async move {
				let tokens = match request.token {
					Some(_) => None,
					None => Some(self.get_valid_token().await?),
				};
				let bearer = tokens.as_ref().map(|tokens| tokens.record.access_token.expose());

				self.dispatcher.dispatch(request, bearer).await
			}),
		)
		.await
	}

	// Reads the stored record, reusing decoded claims while the record is unchanged.
	// An undecodable record reads as absent.
	async fn load_tokens(&self) -> Result<Option<SessionTokens>> {
		let Some(record) = self.credentials.load().await? else {
			*self.decoded.lock() = None;

			return Ok(None);
		};

		if let Some(tokens) = self.decoded.lock().as_ref().filter(|tokens| tokens.record == record)
		{
			return Ok(Some(tokens.clone()));
		}

		match record.decode() {
			Ok(tokens) => {
				*self.decoded.lock() = Some(tokens.clone());

				Ok(Some(tokens))
			},
			Err(e) => {
				obs::record_undecodable_credentials(self.credentials.key(), &e);
				*self.decoded.lock() = None;

				Ok(None)
			},
		}
	}

	// Decodes, persists, and caches a freshly issued pair. Nothing is written unless both
	// tokens decode.
	async fn persist(&self, issued: IssuedTokens) -> Result<SessionTokens> {
		let tokens = TokenRecord::issue(issued, self.clock.now())
			.map_err(|source| Error::InvalidToken { source })?;

		self.credentials.save(&tokens.record).await?;
		*self.decoded.lock() = Some(tokens.clone());

		Ok(tokens)
	}

	async fn forget(&self) -> Result<()> {
		self.credentials.clear().await?;
		*self.decoded.lock() = None;

		if let Some(cache) = self.dispatcher.cache() {
			cache.clear();
		}

		Ok(())
	}

	// Sends an auth endpoint call on the root project, bypassing the cache.
	async fn auth_call(
		&self,
		operation: Operation,
		path: String,
		query: (&str, &str),
	) -> Result<CapturedResponse> {
		let call = CallRequest::get(path)
			.project(&self.config.root_project_id)
			.query(query.0, query.1)
			.bypass_cache();

		self.dispatcher
			.dispatch(&call, None)
			.await
			.map_err(|e| Error::auth_network(operation.as_str(), e))
	}

	async fn observe<T, Fut>(
		&self,
		operation: Operation,
		stage: &'static str,
		fut: Fut,
	) -> Result<T>
	where
		Fut: Future<Output = Result<T>>,
	{
		let span = OperationSpan::new(operation, stage);

		self.record(operation, OperationOutcome::Attempt);

		let result = span.instrument(fut).await;

		match &result {
			Ok(_) => self.record(operation, OperationOutcome::Success),
			Err(_) => self.record(operation, OperationOutcome::Failure),
		}

		result
	}

	fn record(&self, operation: Operation, outcome: OperationOutcome) {
		self.metrics.record(operation, outcome);
		obs::record_operation_outcome(operation, outcome);
	}
}
#[cfg(feature = "reqwest")]
impl Session<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a session backed by the crate's default reqwest transport.
	pub fn new(config: ClientConfig, store: Arc<dyn KeyValueStore>) -> Self {
		Self::with_http_client(
			config,
			store,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for Session<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Session")
			.field("project_id", &self.config.project_id)
			.field("instance_key", &self.config.instance_key)
			.field("storage_key", &self.credentials.key())
			.field("dispatcher", &self.dispatcher)
			.finish()
	}
}
