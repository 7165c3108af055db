//! Remaining-freshness arithmetic over `Cache-Control`, `Age`, and `Date`.

// crates.io
use oauth2::http::{
	HeaderMap,
	header::{AGE, CACHE_CONTROL, DATE, HeaderName},
};
use time::{PrimitiveDateTime, format_description::well_known::Rfc2822, macros::format_description};
// self
use crate::_prelude::*;

/// How much longer a response may be served, measured from `now`.
///
/// `max-age - Age - (now - Date)`, floored at zero. A missing or unparseable header counts as
/// zero (`Date` falls back to `now`), so a response without `max-age` is never fresh.
pub fn remaining_freshness(headers: &HeaderMap, now: OffsetDateTime) -> Duration {
	let max_age = header(headers, CACHE_CONTROL).and_then(max_age_secs).unwrap_or(0);
	let age = header(headers, AGE).and_then(leading_int).unwrap_or(0);
	let server_time = header(headers, DATE).and_then(parse_http_date).unwrap_or(now);
	let remaining = Duration::seconds(max_age)
		.saturating_sub(Duration::seconds(age))
		.saturating_sub(now - server_time);

	if remaining.is_positive() { remaining } else { Duration::ZERO }
}

fn header(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
	headers.get(name).and_then(|value| value.to_str().ok())
}

fn max_age_secs(cache_control: &str) -> Option<i64> {
	cache_control.match_indices("max-age=").find_map(|(at, directive)| {
		leading_int(&cache_control[at + directive.len()..])
	})
}

// Leading decimal digits, ignoring anything after them.
fn leading_int(raw: &str) -> Option<i64> {
	let raw = raw.trim_start();
	let end = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());

	raw[..end].parse().ok()
}

// IMF-fixdate and RFC 2822 first, then the obsolete RFC 850 and asctime forms.
fn parse_http_date(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();
	let rfc2822 = match raw.strip_suffix(" GMT") {
		Some(prefix) => OffsetDateTime::parse(&format!("{prefix} +0000"), &Rfc2822).ok(),
		None => OffsetDateTime::parse(raw, &Rfc2822).ok(),
	};

	rfc2822.or_else(|| parse_rfc850_date(raw)).or_else(|| parse_asctime_date(raw))
}

// `Sunday, 06-Nov-94 08:49:37 GMT`
fn parse_rfc850_date(raw: &str) -> Option<OffsetDateTime> {
	let (_, rest) = raw.split_once(", ")?;
	let mut parts = rest.split_whitespace();
	let (date, clock) = (parts.next()?, parts.next()?);
	let mut date = date.split('-');
	let (day, month) = (date.next()?, date.next()?);
	let year = match date.next()?.parse::<i32>().ok()? {
		year @ 0..70 => 2000 + year,
		year @ 70..100 => 1900 + year,
		year => year,
	};

	utc_date(day, month, year, clock)
}

// `Sun Nov  6 08:49:37 1994`
fn parse_asctime_date(raw: &str) -> Option<OffsetDateTime> {
	let mut parts = raw.split_whitespace().skip(1);
	let (month, day, clock) = (parts.next()?, parts.next()?, parts.next()?);
	let year = parts.next()?.parse().ok()?;

	utc_date(day, month, year, clock)
}

fn utc_date(day: &str, month: &str, year: i32, clock: &str) -> Option<OffsetDateTime> {
	PrimitiveDateTime::parse(
		&format!("{day:0>2} {month} {year} {clock}"),
		format_description!("[day] [month repr:short] [year] [hour]:[minute]:[second]"),
	)
	.ok()
	.map(PrimitiveDateTime::assume_utc)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
		let mut map = HeaderMap::new();

		for (name, value) in pairs {
			map.insert(*name, value.parse().expect("Fixture header value should be valid."));
		}

		map
	}

	#[test]
	fn max_age_alone_yields_full_lifetime() {
		let now = macros::datetime!(2025-03-01 12:00:00 UTC);

		assert_eq!(
			remaining_freshness(&headers(&[("cache-control", "public, max-age=30")]), now),
			Duration::seconds(30)
		);
	}

	#[test]
	fn age_and_date_shrink_the_lifetime() {
		let now = macros::datetime!(2025-03-01 12:00:10 UTC);
		let map = headers(&[
			("cache-control", "max-age=60"),
			("age", "5"),
			("date", "Sat, 01 Mar 2025 12:00:00 GMT"),
		]);

		assert_eq!(remaining_freshness(&map, now), Duration::seconds(45));

		let offset = headers(&[
			("cache-control", "max-age=60"),
			("date", "Sat, 01 Mar 2025 13:00:00 +0100"),
		]);

		assert_eq!(remaining_freshness(&offset, now), Duration::seconds(50));
	}

	#[test]
	fn obsolete_date_forms_are_understood() {
		let now = macros::datetime!(2025-03-01 12:00:00 UTC);

		for date in ["Saturday, 01-Mar-25 11:59:50 GMT", "Sat Mar  1 11:59:50 2025"] {
			let map = headers(&[("cache-control", "max-age=30"), ("date", date)]);

			assert_eq!(remaining_freshness(&map, now), Duration::seconds(20), "{date}");
		}

		assert_eq!(
			parse_http_date("Sunday, 06-Nov-94 08:49:37 GMT"),
			Some(macros::datetime!(1994-11-06 08:49:37 UTC))
		);
	}

	#[test]
	fn missing_or_garbled_headers_mean_no_freshness() {
		let now = macros::datetime!(2025-03-01 12:00:00 UTC);

		assert_eq!(remaining_freshness(&HeaderMap::new(), now), Duration::ZERO);
		assert_eq!(
			remaining_freshness(&headers(&[("cache-control", "no-store")]), now),
			Duration::ZERO
		);
		assert_eq!(
			remaining_freshness(
				&headers(&[("cache-control", "max-age=30"), ("date", "yesterday-ish")]),
				now
			),
			Duration::seconds(30)
		);
		assert_eq!(
			remaining_freshness(&headers(&[("cache-control", "max-age=10"), ("age", "20")]), now),
			Duration::ZERO
		);
	}
}
