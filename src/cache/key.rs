//! Deterministic request identity used to key cache entries and in-flight fetches.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD_NO_PAD};
use sha2::{Digest, Sha256};
use url::form_urlencoded;
// self
use crate::_prelude::*;

/// Absolute URL plus its query parameters sorted by name, then value.
///
/// Two requests that differ only in query parameter order map to the same key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);
impl RequestKey {
	/// Builds the key for `url`; the fragment is ignored.
	pub fn new(url: &Url) -> Self {
		let mut pairs = url.query_pairs().into_owned().collect::<Vec<_>>();

		pairs.sort();

		let mut base = url.clone();

		base.set_query(None);
		base.set_fragment(None);

		if pairs.is_empty() {
			return Self(base.into());
		}

		let query = form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish();

		Self(format!("{base}?{query}"))
	}

	/// Canonical key text.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Base64 (no padding) SHA-256 digest of the key, safe to log.
	pub fn fingerprint(&self) -> String {
		STANDARD_NO_PAD.encode(Sha256::digest(self.0.as_bytes()))
	}
}
impl Debug for RequestKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("RequestKey").field(&self.fingerprint()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn key(raw: &str) -> RequestKey {
		RequestKey::new(&Url::parse(raw).expect("Fixture URL should parse."))
	}

	#[test]
	fn query_order_does_not_change_identity() {
		assert_eq!(
			key("https://p.api.retter.io/p/CALL/A/b?z=1&a=2&a=1"),
			key("https://p.api.retter.io/p/CALL/A/b?a=1&z=1&a=2#frag")
		);
		assert_eq!(
			key("https://p.api.retter.io/p/CALL/A/b?z=1&a=2").as_str(),
			"https://p.api.retter.io/p/CALL/A/b?a=2&z=1"
		);
		assert_ne!(key("https://p.api.retter.io/p/x?a=1"), key("https://p.api.retter.io/p/y?a=1"));
	}

	#[test]
	fn fingerprint_hides_raw_url() {
		let key = key("https://p.api.retter.io/p/x?accessToken=secret");
		let fingerprint = key.fingerprint();

		assert!(!fingerprint.contains("secret"));
		assert_eq!(fingerprint.len(), 43);
		assert!(!format!("{key:?}").contains("secret"));
	}
}
