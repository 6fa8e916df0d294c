//! Expiring value cache with single-flight refresh.
//!
//! [`ExpiringCache`] holds one value plus its expiry behind a fair async mutex. The lock is held
//! across the refresh call, so callers that arrive while a refresh is in flight queue behind it
//! and observe the refreshed value instead of stampeding the provider. A failed refresh leaves
//! the previous state untouched and the next call retries.
//!
//! The refresh function must not call back into the same cache: the lock is not reentrant and
//! such a call would never complete.

mod metrics;

pub use metrics::CacheMetrics;

// self
use crate::_prelude::*;

/// Boxed future returned by a cache refresh function.
pub type RefreshFuture<T, E> = Pin<Box<dyn Future<Output = Result<CachedValue<T>, E>> + Send>>;

/// Clock used for expiry comparisons.
pub type Clock = Arc<dyn Fn() -> OffsetDateTime + Send + Sync>;

type RefreshFn<T, E> = Box<dyn Fn(Option<CachedValue<T>>) -> RefreshFuture<T, E> + Send + Sync>;

/// A value together with the instant after which it must no longer be trusted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedValue<T> {
	/// Cached value.
	pub value: T,
	/// Exclusive upper bound of the validity window.
	pub valid_until: OffsetDateTime,
}
impl<T> CachedValue<T> {
	/// Pairs a value with its expiry.
	pub fn new(value: T, valid_until: OffsetDateTime) -> Self {
		Self { value, valid_until }
	}

	/// Returns `true` if the value may still be used at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		self.valid_until > instant
	}
}

/// Thread-safe holder of a value that is refreshed on demand once it expires.
pub struct ExpiringCache<T, E = Error> {
	state: AsyncMutex<Option<CachedValue<T>>>,
	refresh: RefreshFn<T, E>,
	clock: Clock,
	metrics: Arc<CacheMetrics>,
}
impl<T, E> ExpiringCache<T, E>
where
	T: 'static + Clone + Send,
	E: 'static,
{
	/// Creates an empty cache backed by `provider`.
	///
	/// The provider receives the previous cached value (if any) and returns the replacement.
	/// Safety margins belong in the provider: the cache trusts `valid_until` verbatim.
	pub fn new<F, Fut>(provider: F) -> Self
	where
		F: 'static + Send + Sync + Fn(Option<CachedValue<T>>) -> Fut,
		Fut: 'static + Send + Future<Output = Result<CachedValue<T>, E>>,
	{
		let refresh: RefreshFn<T, E> = Box::new(move |previous| {
			let future: RefreshFuture<T, E> = Box::pin(provider(previous));

			future
		});

		Self {
			state: AsyncMutex::new(None),
			refresh,
			clock: Arc::new(OffsetDateTime::now_utc),
			metrics: Default::default(),
		}
	}

	/// Replaces the clock used for expiry comparisons.
	pub fn with_clock(mut self, clock: Clock) -> Self {
		self.clock = clock;

		self
	}

	/// Returns the cached value, refreshing it first when it is missing or expired.
	///
	/// All callers serialize on one lock; while a refresh is in flight every other caller waits
	/// for it and receives the same refreshed value.
	pub async fn value(&self) -> Result<T, E> {
		let mut cached = self.state.lock().await;
		let now = (self.clock)();

		if let Some(current) = cached.as_ref().filter(|entry| entry.is_valid_at(now)) {
			self.metrics.record_hit();

			return Ok(current.value.clone());
		}

		self.metrics.record_refresh();

		let refreshed = (self.refresh)(cached.clone()).await.inspect_err(|_| {
			self.metrics.record_failure();
		})?;
		let value = refreshed.value.clone();

		*cached = Some(refreshed);

		Ok(value)
	}

	/// Returns `true` if a value is cached and still valid.
	pub async fn is_created(&self) -> bool {
		let now = (self.clock)();

		self.state.lock().await.as_ref().is_some_and(|entry| entry.is_valid_at(now))
	}

	/// Drops the cached value so the next [`value`](Self::value) call refreshes.
	pub async fn invalidate(&self) {
		*self.state.lock().await = None;
	}

	/// Hit/refresh/failure counters for this cache.
	pub fn metrics(&self) -> &CacheMetrics {
		&self.metrics
	}
}
impl<T, E> Debug for ExpiringCache<T, E> {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ExpiringCache").field("metrics", &self.metrics).finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn cached_value_expiry_is_exclusive() {
		let until = macros::datetime!(2025-01-01 01:00 UTC);
		let entry = CachedValue::new("token", until);

		assert!(entry.is_valid_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(!entry.is_valid_at(until));
	}

	#[tokio::test]
	async fn failed_refresh_keeps_previous_state() {
		let calls = Arc::new(AtomicUsize::new(0));
		let counter = calls.clone();
		let cache: ExpiringCache<&'static str, &'static str> = ExpiringCache::new(move |previous| {
			let attempt = counter.fetch_add(1, Ordering::SeqCst);

			async move {
				match attempt {
					// Expired immediately so the next call refreshes again.
					0 => Ok(CachedValue::new("first", OffsetDateTime::UNIX_EPOCH)),
					1 => {
						assert_eq!(previous.map(|entry| entry.value), Some("first"));

						Err("issuer down")
					},
					_ => {
						assert_eq!(previous.map(|entry| entry.value), Some("first"));

						Ok(CachedValue::new("second", OffsetDateTime::now_utc() + Duration::hours(1)))
					},
				}
			}
		});

		assert_eq!(cache.value().await, Ok("first"));
		assert_eq!(cache.value().await, Err("issuer down"));
		assert_eq!(cache.value().await, Ok("second"));
		assert_eq!(calls.load(Ordering::SeqCst), 3);
		assert_eq!(cache.metrics().failures(), 1);
		assert!(cache.is_created().await);
	}
}
