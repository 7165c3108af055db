//! Redacting wrapper for raw token strings.

// self
use crate::{
	_prelude::*,
	auth::{DecodeError, TokenClaims, decode_claims},
};

/// Raw JWT kept out of `Debug`/`Display` output.
///
/// Serializes as the bare token string so persisted records stay wire-compatible.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a raw token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Decodes the token payload.
	pub fn claims(&self) -> Result<TokenClaims, DecodeError> {
		decode_claims(&self.0)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("TokenSecret").field(&"<redacted>").finish()
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}
