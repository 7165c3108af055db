//! Authentication status derived from the current token record.

// self
use crate::{_prelude::*, auth::SessionTokens};

/// Who the caller is, as far as the stored credentials can tell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthStatus {
	/// A non-anonymous user session is stored.
	SignedIn,
	/// An anonymous session is stored.
	SignedInAnonymous,
	/// No usable session is stored.
	SignedOut,
}
impl AuthStatus {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthStatus::SignedIn => "SIGNED_IN",
			AuthStatus::SignedInAnonymous => "SIGNED_IN_ANONYMOUS",
			AuthStatus::SignedOut => "SIGNED_OUT",
		}
	}
}
impl Display for AuthStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Status plus the identity fields callers usually want alongside it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSnapshot {
	/// Derived status.
	pub status: AuthStatus,
	/// User identifier from the access token, when signed in.
	pub user_id: Option<String>,
	/// Identity from the access token, when signed in.
	pub identity: Option<String>,
}
impl AuthSnapshot {
	/// Derives the snapshot from the presence and `anonymous` claim of a record; no I/O.
	pub fn of(tokens: Option<&SessionTokens>) -> Self {
		match tokens {
			Some(tokens) => {
				let claims = &tokens.access_claims;

				Self {
					status: if claims.anonymous {
						AuthStatus::SignedInAnonymous
					} else {
						AuthStatus::SignedIn
					},
					user_id: claims.user_id.clone(),
					identity: claims.identity.clone(),
				}
			},
			None => Self::signed_out(),
		}
	}

	/// Snapshot for an absent or unusable record.
	pub fn signed_out() -> Self {
		Self { status: AuthStatus::SignedOut, user_id: None, identity: None }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::{ClockSkew, TokenClaims, TokenRecord, TokenSecret};

	fn tokens(anonymous: bool) -> SessionTokens {
		let claims = TokenClaims {
			user_id: Some("user-9".into()),
			identity: Some("enduser".into()),
			anonymous,
			..TokenClaims::default()
		};

		SessionTokens {
			record: TokenRecord {
				access_token: TokenSecret::new("a"),
				refresh_token: TokenSecret::new("r"),
				server_clock_diff_seconds: ClockSkew::default(),
			},
			access_claims: claims.clone(),
			refresh_claims: claims,
		}
	}

	#[test]
	fn status_follows_anonymous_claim() {
		assert_eq!(AuthSnapshot::of(None).status, AuthStatus::SignedOut);
		assert_eq!(AuthSnapshot::of(Some(&tokens(true))).status, AuthStatus::SignedInAnonymous);

		let signed_in = AuthSnapshot::of(Some(&tokens(false)));

		assert_eq!(signed_in.status, AuthStatus::SignedIn);
		assert_eq!(signed_in.user_id.as_deref(), Some("user-9"));
		assert_eq!(signed_in.identity.as_deref(), Some("enduser"));
	}

	#[test]
	fn labels_are_stable() {
		assert_eq!(AuthStatus::SignedInAnonymous.to_string(), "SIGNED_IN_ANONYMOUS");
		assert_eq!(
			serde_json::to_string(&AuthStatus::SignedOut).expect("Status should serialize."),
			"\"SIGNED_OUT\""
		);
	}
}
