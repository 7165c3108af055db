//! Persisted token records and their decoded lifecycle view.

// self
use crate::{
	_prelude::*,
	auth::{AuthSnapshot, ClockSkew, DecodeError, TokenClaims, TokenSecret},
};

/// Lifecycle state of a decoded token pair at a given instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenState {
	/// Both tokens are valid; the record can be used as-is.
	Active,
	/// The access token expired but the refresh token can mint a new pair.
	AccessExpired,
	/// The refresh token expired; only re-authentication can recover.
	RefreshExpired,
}

/// Token pair persisted by the credential store.
///
/// Only raw tokens are stored. Claims are derived on read (see [`SessionTokens`]) so a
/// replaced record can never carry stale decoded data.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
	/// Short-lived credential attached to calls.
	pub access_token: TokenSecret,
	/// Longer-lived credential used only to mint new access tokens.
	pub refresh_token: TokenSecret,
	/// Server-minus-local clock difference captured when the pair was issued.
	#[serde(default)]
	pub server_clock_diff_seconds: ClockSkew,
}
impl TokenRecord {
	/// Builds a record from a freshly issued pair, measuring clock skew from the access
	/// token's `iat`.
	pub fn issue(
		issued: IssuedTokens,
		local_now: OffsetDateTime,
	) -> Result<SessionTokens, DecodeError> {
		let access_claims = issued.access_token.claims()?;
		let refresh_claims = issued.refresh_token.claims()?;
		let record = Self {
			server_clock_diff_seconds: ClockSkew::measure(access_claims.iat, local_now),
			access_token: issued.access_token,
			refresh_token: issued.refresh_token,
		};

		Ok(SessionTokens { record, access_claims, refresh_claims })
	}

	/// Decodes both tokens, failing if either is unusable.
	pub fn decode(self) -> Result<SessionTokens, DecodeError> {
		let access_claims = self.access_token.claims()?;
		let refresh_claims = self.refresh_token.claims()?;

		Ok(SessionTokens { record: self, access_claims, refresh_claims })
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("server_clock_diff_seconds", &self.server_clock_diff_seconds.0)
			.finish()
	}
}

/// Token pair as returned by the auth endpoints. Extra response fields are ignored.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedTokens {
	/// Newly issued access token.
	pub access_token: TokenSecret,
	/// Newly issued refresh token.
	pub refresh_token: TokenSecret,
}

/// A [`TokenRecord`] together with its decoded claims; never persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionTokens {
	/// Raw persisted record.
	pub record: TokenRecord,
	/// Decoded access-token payload.
	pub access_claims: TokenClaims,
	/// Decoded refresh-token payload.
	pub refresh_claims: TokenClaims,
}
impl SessionTokens {
	/// Computes the lifecycle state using the record's skew and the safety margin.
	pub fn state_at(&self, local_now: OffsetDateTime) -> TokenState {
		let now = self.record.server_clock_diff_seconds.corrected_now(local_now);

		if self.refresh_claims.is_expired_at(now) {
			return TokenState::RefreshExpired;
		}
		if self.access_claims.is_expired_at(now) {
			return TokenState::AccessExpired;
		}

		TokenState::Active
	}

	/// User owning the session, read from the refresh token first, then the access token.
	pub fn user_id(&self) -> Option<&str> {
		self.refresh_claims.user_id.as_deref().or(self.access_claims.user_id.as_deref())
	}

	/// Authentication snapshot derived from the access-token claims.
	pub fn snapshot(&self) -> AuthSnapshot {
		AuthSnapshot::of(Some(self))
	}
}
