//! Bounded, freshness-aware response cache with request coalescing.
//!
//! Lookups are served from live entries; a stale entry is dropped the moment it is seen.
//! On a miss, callers for the same [`RequestKey`] share one pending fetch through the
//! in-flight ledger, and the settled result (success or error) is delivered to all of them.
//! Only successful responses that carry positive freshness are admitted. When the cache is
//! full, the least recently touched entry is evicted first.

pub mod freshness;
pub mod key;

pub use freshness::remaining_freshness;
pub use key::RequestKey;

// std
use std::sync::atomic::{AtomicU64, Ordering};
// crates.io
use async_lock::OnceCell;
// self
use crate::{
	_prelude::*,
	clock::Clock,
	config::MemoryCacheConfig,
	http::CapturedResponse,
	obs::{self, CacheEvent},
};

type Pending = Arc<OnceCell<Result<CapturedResponse>>>;

/// Thread-safe counters describing cache activity.
#[derive(Debug, Default)]
pub struct CacheStats {
	hits: AtomicU64,
	joins: AtomicU64,
	fetches: AtomicU64,
	stored: AtomicU64,
	evictions: AtomicU64,
	expirations: AtomicU64,
}
impl CacheStats {
	/// Lookups answered from a live entry.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Callers that waited on another caller's fetch.
	pub fn joins(&self) -> u64 {
		self.joins.load(Ordering::Relaxed)
	}

	/// Physical fetches performed.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Responses admitted.
	pub fn stored(&self) -> u64 {
		self.stored.load(Ordering::Relaxed)
	}

	/// Entries evicted for capacity.
	pub fn evictions(&self) -> u64 {
		self.evictions.load(Ordering::Relaxed)
	}

	/// Stale entries dropped on lookup.
	pub fn expirations(&self) -> u64 {
		self.expirations.load(Ordering::Relaxed)
	}

	fn bump(&self, event: CacheEvent) {
		let counter = match event {
			CacheEvent::Hit => &self.hits,
			CacheEvent::Joined => &self.joins,
			CacheEvent::Fetched => &self.fetches,
			CacheEvent::Stored => &self.stored,
			CacheEvent::Evicted => &self.evictions,
			CacheEvent::Expired => &self.expirations,
			CacheEvent::NotStored => return,
		};

		counter.fetch_add(1, Ordering::Relaxed);
	}
}

#[derive(Debug)]
struct Entry {
	payload: CapturedResponse,
	expires_at: OffsetDateTime,
	touched: u64,
}

#[derive(Debug, Default)]
struct CacheState {
	entries: HashMap<RequestKey, Entry>,
	// Recency order: smallest tick is the least recently touched entry.
	recency: BTreeMap<u64, RequestKey>,
	tick: u64,
	// Bumped by `clear`; fetches started under an older generation are not admitted.
	generation: u64,
}
impl CacheState {
	fn next_tick(&mut self) -> u64 {
		self.tick += 1;

		self.tick
	}

	fn remove(&mut self, key: &RequestKey) -> Option<Entry> {
		let entry = self.entries.remove(key)?;

		self.recency.remove(&entry.touched);

		Some(entry)
	}
}

/// In-memory response cache shared by every read dispatched through one session.
pub struct ResponseCache {
	config: MemoryCacheConfig,
	clock: Arc<dyn Clock>,
	state: Mutex<CacheState>,
	in_flight: Mutex<HashMap<RequestKey, Pending>>,
	stats: CacheStats,
}
impl ResponseCache {
	/// Creates an empty cache.
	pub fn new(config: MemoryCacheConfig, clock: Arc<dyn Clock>) -> Self {
		Self {
			config,
			clock,
			state: Default::default(),
			in_flight: Default::default(),
			stats: Default::default(),
		}
	}

	/// Activity counters.
	pub fn stats(&self) -> &CacheStats {
		&self.stats
	}

	/// Number of stored entries, live or not yet noticed as stale.
	pub fn len(&self) -> usize {
		self.state.lock().entries.len()
	}

	/// Returns `true` when nothing is stored.
	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Returns `true` if `key` currently has a stored entry.
	pub fn contains(&self, key: &RequestKey) -> bool {
		self.state.lock().entries.contains_key(key)
	}

	/// Drops every entry and detaches in-flight fetches.
	///
	/// Callers already waiting on a detached fetch still receive its result, but that result
	/// is never stored and later callers start a fetch of their own.
	pub fn clear(&self) {
		{
			let mut state = self.state.lock();
			let generation = state.generation + 1;

			*state = CacheState { generation, ..Default::default() };
		}

		self.in_flight.lock().clear();
	}

	/// Returns the cached response for `key`, or runs `fetch` to obtain it.
	///
	/// Concurrent callers for the same key share one fetch. If the caller running the fetch
	/// is dropped, a waiting caller takes over with its own `fetch`.
	pub async fn get<F, Fut>(&self, key: RequestKey, fetch: F) -> Result<CapturedResponse>
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = Result<CapturedResponse>>,
	{
		if let Some(hit) = self.lookup(&key) {
			return Ok(hit);
		}

		let pending = self
			.in_flight
			.lock()
			.entry(key.clone())
			.or_insert_with(|| Arc::new(OnceCell::new()))
			.clone();
		let mut fetched = false;
		let result = {
			let fetched = &mut fetched;
			let key = &key;
			let pending_ref = &pending;

			pending
				.get_or_init(move || async move {
					*fetched = true;

					self.record(CacheEvent::Fetched, key);

					let generation = self.state.lock().generation;
					let result = fetch().await;

					if let Ok(response) = &result {
						self.admit(key, response, generation);
					}

					self.settle(key, pending_ref);

					result
				})
				.await
				.clone()
		};

		if !fetched {
			self.record(CacheEvent::Joined, &key);
		}

		result
	}

	fn lookup(&self, key: &RequestKey) -> Option<CapturedResponse> {
		let now = self.clock.now();
		let mut state = self.state.lock();
		let expires_at = state.entries.get(key)?.expires_at;

		if expires_at <= now {
			state.remove(key);
			drop(state);
			self.record(CacheEvent::Expired, key);

			return None;
		}

		let tick = state.next_tick();
		let entry = state.entries.get_mut(key)?;
		let previous = std::mem::replace(&mut entry.touched, tick);
		let payload = entry.payload.clone();

		state.recency.remove(&previous);
		state.recency.insert(tick, key.clone());
		drop(state);
		self.record(CacheEvent::Hit, key);

		Some(payload)
	}

	fn admit(&self, key: &RequestKey, response: &CapturedResponse, generation: u64) {
		let now = self.clock.now();
		let remaining = remaining_freshness(&response.headers, now);

		if remaining.is_zero() {
			self.record(CacheEvent::NotStored, key);

			return;
		}

		let mut evicted = Vec::new();

		{
			let mut state = self.state.lock();

			if state.generation != generation {
				drop(state);
				self.record(CacheEvent::NotStored, key);

				return;
			}

			state.remove(key);

			while state.entries.len() >= self.config.max_entry_count {
				let Some((_, oldest)) = state.recency.pop_first() else {
					break;
				};

				state.entries.remove(&oldest);
				evicted.push(oldest);
			}

			let touched = state.next_tick();

			state.recency.insert(touched, key.clone());
			state.entries.insert(
				key.clone(),
				Entry {
					payload: response.clone(),
					expires_at: now.saturating_add(remaining),
					touched,
				},
			);
		}

		for oldest in &evicted {
			self.record(CacheEvent::Evicted, oldest);
		}

		self.record(CacheEvent::Stored, key);
	}

	// Drops the ledger entry only if it still belongs to this fetch.
	fn settle(&self, key: &RequestKey, pending: &Pending) {
		let mut in_flight = self.in_flight.lock();

		if in_flight.get(key).is_some_and(|current| Arc::ptr_eq(current, pending)) {
			in_flight.remove(key);
		}
	}

	fn record(&self, event: CacheEvent, key: &RequestKey) {
		self.stats.bump(event);
		obs::record_cache_event(self.config.enable_logs, event, key);
	}
}
impl Debug for ResponseCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResponseCache")
			.field("config", &self.config)
			.field("len", &self.len())
			.field("in_flight", &self.in_flight.lock().len())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::AtomicU32;
	// crates.io
	use oauth2::http::HeaderMap;
	// self
	use super::*;
	use crate::{clock::ManualClock, error::TransportError};

	fn cache(capacity: usize) -> (ResponseCache, Arc<ManualClock>) {
		let clock =
			Arc::new(ManualClock::new(OffsetDateTime::UNIX_EPOCH + Duration::days(20_000)));
		let config = MemoryCacheConfig { max_entry_count: capacity, enable_logs: true };

		(ResponseCache::new(config, clock.clone()), clock)
	}

	fn key(path: &str) -> RequestKey {
		RequestKey::new(&Url::parse(&format!("https://p.api.retter.io/p/{path}")).expect("URL"))
	}

	fn fresh(body: &str, max_age: u32) -> CapturedResponse {
		let mut headers = HeaderMap::new();

		headers.insert(
			"cache-control",
			format!("max-age={max_age}").parse().expect("Header value should be valid."),
		);

		CapturedResponse {
			status: 200,
			status_text: "OK".into(),
			headers,
			body: body.as_bytes().to_vec(),
		}
	}

	async fn fetch_counted(
		cache: &ResponseCache,
		key: RequestKey,
		calls: &AtomicU32,
		response: CapturedResponse,
	) -> Result<CapturedResponse> {
		cache
			.get(key, || async move {
				calls.fetch_add(1, Ordering::SeqCst);

				Ok(response)
			})
			.await
	}

	#[tokio::test]
	async fn freshness_window_serves_then_refetches() {
		let (cache, clock) = cache(100);
		let calls = AtomicU32::new(0);
		let first = fetch_counted(&cache, key("a"), &calls, fresh("one", 30))
			.await
			.expect("First fetch should succeed.");

		clock.advance(Duration::seconds(10));

		let second = fetch_counted(&cache, key("a"), &calls, fresh("two", 30))
			.await
			.expect("Cached read should succeed.");

		assert_eq!(first, second);
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		clock.advance(Duration::seconds(25));

		let third = fetch_counted(&cache, key("a"), &calls, fresh("three", 30))
			.await
			.expect("Refetch should succeed.");

		assert_eq!(third.body, b"three");
		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert_eq!(cache.stats().expirations(), 1);
		assert_eq!(cache.stats().hits(), 1);
	}

	#[tokio::test]
	async fn responses_without_freshness_are_not_stored() {
		let (cache, _) = cache(100);
		let calls = AtomicU32::new(0);

		for _ in 0..2 {
			fetch_counted(&cache, key("a"), &calls, fresh("x", 0))
				.await
				.expect("Fetch should succeed.");
		}

		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert!(cache.is_empty());
	}

	#[tokio::test]
	async fn eviction_drops_least_recently_touched() {
		let (cache, _) = cache(2);
		let calls = AtomicU32::new(0);

		fetch_counted(&cache, key("a"), &calls, fresh("a", 60)).await.expect("a");
		fetch_counted(&cache, key("b"), &calls, fresh("b", 60)).await.expect("b");
		// Touch `a` so `b` becomes the eviction candidate.
		fetch_counted(&cache, key("a"), &calls, fresh("a", 60)).await.expect("a hit");
		fetch_counted(&cache, key("c"), &calls, fresh("c", 60)).await.expect("c");

		assert_eq!(cache.len(), 2);
		assert!(cache.contains(&key("a")));
		assert!(!cache.contains(&key("b")));
		assert!(cache.contains(&key("c")));
		assert_eq!(cache.stats().evictions(), 1);
		assert_eq!(calls.load(Ordering::SeqCst), 3);
	}

	#[tokio::test]
	async fn concurrent_identical_reads_share_one_fetch() {
		let (cache, _) = cache(100);
		let calls = AtomicU32::new(0);
		let slow = || async {
			calls.fetch_add(1, Ordering::SeqCst);

			for _ in 0..3 {
				tokio::task::yield_now().await;
			}

			Ok(fresh("shared", 0))
		};
		let (a, b, c, d) = tokio::join!(
			cache.get(key("slow"), slow),
			cache.get(key("slow"), slow),
			cache.get(key("slow"), slow),
			cache.get(key("slow"), slow),
		);
		let a = a.expect("Leader should succeed.");

		for other in [b, c, d] {
			assert_eq!(other.expect("Waiter should succeed."), a);
		}

		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(cache.stats().fetches(), 1);
		assert_eq!(cache.stats().joins(), 3);
		assert!(cache.in_flight.lock().is_empty());
	}

	#[tokio::test]
	async fn errors_reach_every_waiter_and_are_not_cached() {
		let (cache, _) = cache(100);
		let calls = AtomicU32::new(0);
		let failing = || async {
			calls.fetch_add(1, Ordering::SeqCst);
			tokio::task::yield_now().await;

			Err(Error::from(TransportError::Timeout))
		};
		let (a, b) = tokio::join!(cache.get(key("e"), failing), cache.get(key("e"), failing));

		assert!(matches!(a, Err(Error::Transport(TransportError::Timeout))));
		assert!(matches!(b, Err(Error::Transport(TransportError::Timeout))));
		assert_eq!(calls.load(Ordering::SeqCst), 1);

		let retried = fetch_counted(&cache, key("e"), &calls, fresh("ok", 30))
			.await
			.expect("A later call should fetch again.");

		assert_eq!(retried.body, b"ok");
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn clear_detaches_fetches_started_before_it() {
		let (cache, _) = cache(100);
		let calls = AtomicU32::new(0);
		let gate = AsyncMutex::new(());
		let held = gate.lock().await;
		let before_clear = cache.get(key("me"), || async {
			calls.fetch_add(1, Ordering::SeqCst);

			let _open = gate.lock().await;

			Ok(fresh("user-A", 60))
		});
		let after_clear = async {
			cache.clear();
			drop(held);

			fetch_counted(&cache, key("me"), &calls, fresh("user-B", 60)).await
		};
		let (old, new) = tokio::join!(before_clear, after_clear);

		assert_eq!(old.expect("Detached fetch still answers its caller.").body, b"user-A");
		assert_eq!(new.expect("Post-clear fetch should succeed.").body, b"user-B");
		assert_eq!(calls.load(Ordering::SeqCst), 2);

		let cached = fetch_counted(&cache, key("me"), &calls, fresh("user-C", 60))
			.await
			.expect("Cached read should succeed.");

		assert_eq!(cached.body, b"user-B");
		assert_eq!(calls.load(Ordering::SeqCst), 2);
		assert!(cache.in_flight.lock().is_empty());
	}
}
