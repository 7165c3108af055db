//! Session core for backend clients.
//!
//! Keeps an access/refresh token pair valid across restarts and clock skew, and serves reads
//! from a coalescing, freshness-aware response cache.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod obs;
pub mod registry;
pub mod retry;
pub mod session;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// crates.io
	use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
	// self
	use crate::{
		clock::{Clock, ManualClock},
		config::ClientConfig,
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
		session::Session,
		store::{KeyValueStore, MemoryStore},
	};

	/// Session type alias used by reqwest-backed integration tests.
	pub type ReqwestTestSession = Session<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Encodes an unsigned JWT carrying the provided JSON claims.
	///
	/// The signature segment is a fixed placeholder because the session core never verifies
	/// signatures; it only reads the payload.
	pub fn mint_jwt(claims: serde_json::Value) -> String {
		let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
		let payload = URL_SAFE_NO_PAD.encode(
			serde_json::to_vec(&claims).expect("Test claims should serialize to JSON."),
		);

		format!("{header}.{payload}.c2lnbmF0dXJl")
	}

	/// Mints a JWT for `user_id` issued at `iat` and expiring at `exp` (unix seconds).
	pub fn mint_user_jwt(user_id: &str, anonymous: bool, iat: i64, exp: i64) -> String {
		mint_jwt(serde_json::json!({
			"userId": user_id,
			"identity": if anonymous { "anonymous" } else { "user" },
			"anonymous": anonymous,
			"iat": iat,
			"exp": exp,
		}))
	}

	/// Builds a config that routes every call to `base_url` (typically an `httpmock` server).
	pub fn test_config(project_id: &str, base_url: &str) -> ClientConfig {
		ClientConfig::builder(project_id)
			.url(Url::parse(base_url).expect("Mock server base URL should parse."))
			.build()
			.expect("Test client config should build.")
	}

	/// Constructs a [`Session`] backed by an in-memory store, a manual clock pinned to the
	/// current instant, and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_session(
		config: ClientConfig,
	) -> (ReqwestTestSession, Arc<MemoryStore>, Arc<ManualClock>) {
		let backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn KeyValueStore> = backend.clone();
		let clock = Arc::new(ManualClock::new(OffsetDateTime::now_utc()));
		let shared_clock: Arc<dyn Clock> = clock.clone();
		let session = Session::with_http_client(
			config,
			store,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_clock(shared_clock);

		(session, backend, clock)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
