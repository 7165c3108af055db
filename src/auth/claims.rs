//! JWT payload decoding.
//!
//! The session core never verifies signatures: tokens are opaque credentials issued by the
//! backend, and the client only reads their payload to learn who they belong to and when they
//! expire. Decoding is therefore a pure `&str -> TokenClaims` function.

// crates.io
use base64::{
	Engine as _,
	alphabet::URL_SAFE,
	engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
// self
use crate::_prelude::*;

// Issuers disagree on whether JWT segments keep their `=` padding.
const JWT_SEGMENT: GeneralPurpose = GeneralPurpose::new(
	&URL_SAFE,
	GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Errors raised while decoding a token payload.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DecodeError {
	/// The token does not have the `header.payload[.signature]` shape.
	#[error("Token is not a JWT.")]
	Malformed,
	/// The payload segment is not valid base64url.
	#[error("Token payload is not valid base64url.")]
	Base64(#[from] base64::DecodeError),
	/// The payload is not a JSON object with the expected claim types.
	#[error("Token payload is not valid claims JSON: {message}.")]
	Claims {
		/// Parser failure summary.
		message: String,
	},
}

/// Claims carried by access, refresh, and custom tokens.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
	/// Owning user identifier.
	pub user_id: Option<String>,
	/// Identity (role) the user signed in with.
	pub identity: Option<String>,
	/// Whether the session was minted anonymously.
	#[serde(default)]
	pub anonymous: bool,
	/// Project the token was issued for.
	pub project_id: Option<String>,
	/// Issuing service, for service tokens.
	pub service_id: Option<String>,
	/// Client identifier, when present.
	pub client_id: Option<String>,
	/// Issued-at instant (unix seconds, server clock).
	pub iat: Option<i64>,
	/// Expiry instant (unix seconds, server clock).
	pub exp: Option<i64>,
	/// Free-form custom claims.
	#[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
	pub claims: serde_json::Map<String, serde_json::Value>,
}
impl TokenClaims {
	/// Expiry in unix seconds; a token without `exp` is treated as already expired.
	pub fn expires_at(&self) -> i64 {
		self.exp.unwrap_or(0)
	}

	/// Returns `true` if the token is expired relative to `now` (unix seconds).
	pub fn is_expired_at(&self, now: i64) -> bool {
		self.expires_at() <= now
	}
}

/// Decodes the payload of a JWT without verifying its signature.
pub fn decode_claims(token: &str) -> Result<TokenClaims, DecodeError> {
	let mut segments = token.split('.');
	let payload = match (segments.next(), segments.next()) {
		(Some(header), Some(payload)) if !header.is_empty() && !payload.is_empty() => payload,
		_ => return Err(DecodeError::Malformed),
	};
	let bytes = JWT_SEGMENT.decode(payload)?;
	let mut de = serde_json::Deserializer::from_slice(&bytes);

	serde_path_to_error::deserialize(&mut de)
		.map_err(|e| DecodeError::Claims { message: e.to_string() })
}
