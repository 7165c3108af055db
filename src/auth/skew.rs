//! Clock-skew correction between the local clock and the token issuer.

// self
use crate::_prelude::*;

/// Seconds added to "now" before comparing against token expiry.
pub const EXPIRY_SAFETY_MARGIN_SECS: i64 = 30;

/// Difference between the server's clock and the local clock, in whole seconds.
///
/// Positive values mean the server runs ahead of the local clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClockSkew(pub i64);
impl ClockSkew {
	/// Measures the skew from a freshly issued token's `iat` claim.
	///
	/// A token without `iat` yields no correction.
	pub fn measure(issued_at: Option<i64>, local_now: OffsetDateTime) -> Self {
		match issued_at {
			Some(iat) => Self(iat - local_now.unix_timestamp()),
			None => Self::default(),
		}
	}

	/// Server-aligned "now" in unix seconds, including the expiry safety margin.
	pub fn corrected_now(self, local_now: OffsetDateTime) -> i64 {
		local_now.unix_timestamp() + self.0 + EXPIRY_SAFETY_MARGIN_SECS
	}
}
