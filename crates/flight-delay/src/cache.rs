//! Time-bounded memoization for upstream lookups.
//!
//! [`TtlCache`] is shared across request handlers. The lock is only held while reading or
//! writing the map, never while a `compute` callback runs, so a slow upstream fetch does not
//! block readers of other keys. Two concurrent misses on the same key may both run `compute`;
//! the last completed write wins and readers only ever observe whole entries.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

/// Default lifetime of a cached value.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Time source used for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by [`Utc::now`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    stored_at: DateTime<Utc>,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.stored_at);
        match age.to_std() {
            Ok(age) => age >= self.ttl,
            // stored_at is in the future relative to `now`; treat as fresh
            Err(_) => false,
        }
    }
}

/// Get-or-compute cache with per-entry expiry.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            clock,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Return the live value for `key`, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        {
            let guard = self.entries.read();
            match guard.get(key) {
                Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // expired: evict lazily, re-checking in case a fresh write landed meanwhile
        let mut guard = self.entries.write();
        if guard
            .get(key)
            .map(|entry| entry.is_expired(now))
            .unwrap_or(false)
        {
            guard.remove(key);
        }
        None
    }

    /// Store `value` under `key` with the cache's default lifetime.
    pub fn insert(&self, key: K, value: V) {
        self.insert_with_ttl(key, value, self.default_ttl);
    }

    pub fn insert_with_ttl(&self, key: K, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
            ttl,
        };
        self.entries.write().insert(key, entry);
    }

    pub fn get_or_compute<F, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        self.get_or_compute_with_ttl(key, self.default_ttl, compute)
    }

    /// Return the cached value, or run `compute` and cache its success for `ttl`.
    ///
    /// Errors from `compute` are returned as-is and never cached; an older entry that has not
    /// yet expired stays retrievable.
    pub fn get_or_compute_with_ttl<F, E>(&self, key: K, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = compute()?;
        self.insert_with_ttl(key, value.clone(), ttl);
        Ok(value)
    }

    pub async fn get_or_compute_async<F, Fut, E>(&self, key: K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.get_or_compute_async_with_ttl(key, self.default_ttl, compute)
            .await
    }

    /// Async counterpart of [`TtlCache::get_or_compute_with_ttl`]. No lock is held across the
    /// `.await`, so a cancelled or timed-out future leaves the cache untouched.
    pub async fn get_or_compute_async_with_ttl<F, Fut, E>(
        &self,
        key: K,
        ttl: Duration,
        compute: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }

        let value = compute().await?;
        self.insert_with_ttl(key, value.clone(), ttl);
        Ok(value)
    }

    pub fn invalidate(&self, key: &K) -> Option<V> {
        self.entries.write().remove(key).map(|entry| entry.value)
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut guard = self.entries.write();
        let before = guard.len();
        guard.retain(|_, entry| !entry.is_expired(now));
        before - guard.len()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.entries.read().len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

/// Manually advanced clock for deterministic expiry tests.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        let mut guard = self.now.write();
        *guard += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::cell::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clock() -> Arc<ManualClock> {
        let start = Utc
            .with_ymd_and_hms(2024, 7, 15, 8, 0, 0)
            .single()
            .expect("valid start");
        Arc::new(ManualClock::new(start))
    }

    #[test]
    fn live_entry_skips_compute() {
        let clock = clock();
        let cache: TtlCache<String, u32> = TtlCache::with_clock(DEFAULT_TTL, clock.clone());
        let calls = Cell::new(0);

        let first: Result<u32, ()> = cache.get_or_compute("CA1234".to_string(), || {
            calls.set(calls.get() + 1);
            Ok(12)
        });
        clock.advance(Duration::from_secs(299));
        let second: Result<u32, ()> = cache.get_or_compute("CA1234".to_string(), || {
            calls.set(calls.get() + 1);
            Ok(99)
        });

        assert_eq!(first, Ok(12));
        assert_eq!(second, Ok(12));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn entry_expires_exactly_at_ttl() {
        let clock = clock();
        let cache: TtlCache<&'static str, u32> =
            TtlCache::with_clock(Duration::from_secs(60), clock.clone());
        cache.insert("PEK", 1);

        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get(&"PEK"), Some(1));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"PEK"), None);
        assert!(cache.is_empty(), "expired entry is evicted on lookup");

        let refreshed: Result<u32, ()> = cache.get_or_compute("PEK", || Ok(2));
        assert_eq!(refreshed, Ok(2));
    }

    #[test]
    fn failed_compute_is_not_cached() {
        let cache: TtlCache<String, f64> = TtlCache::with_clock(DEFAULT_TTL, clock());
        let calls = Cell::new(0);

        let failed: Result<f64, &str> = cache.get_or_compute("weather:PVG".to_string(), || {
            calls.set(calls.get() + 1);
            Err("timeout")
        });
        assert_eq!(failed, Err("timeout"));
        assert!(cache.is_empty());

        let retried: Result<f64, &str> = cache.get_or_compute("weather:PVG".to_string(), || {
            calls.set(calls.get() + 1);
            Ok(0.3)
        });
        assert_eq!(retried, Ok(0.3));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn failure_leaves_live_entry_retrievable() {
        let clock = clock();
        let cache: TtlCache<&'static str, u32> =
            TtlCache::with_clock(Duration::from_secs(60), clock.clone());
        cache.insert_with_ttl("CA", 80, Duration::from_secs(60));

        // a short-lived entry for another key expires and its refresh fails
        cache.insert_with_ttl("MU", 70, Duration::from_secs(10));
        clock.advance(Duration::from_secs(10));
        let failed: Result<u32, &str> = cache.get_or_compute("MU", || Err("transport"));

        assert_eq!(failed, Err("transport"));
        assert_eq!(cache.get(&"CA"), Some(80));
        assert_eq!(cache.get(&"MU"), None);
    }

    #[test]
    fn per_entry_ttl_overrides_default() {
        let clock = clock();
        let cache: TtlCache<&'static str, u32> = TtlCache::with_clock(DEFAULT_TTL, clock.clone());
        let _: Result<u32, ()> =
            cache.get_or_compute_with_ttl("status", Duration::from_secs(30), || Ok(1));
        cache.insert("weather", 2);

        clock.advance(Duration::from_secs(31));
        assert_eq!(cache.evict_expired(), 1);
        assert_eq!(cache.get(&"weather"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_forces_recompute() {
        let cache: TtlCache<&'static str, u32> = TtlCache::with_clock(DEFAULT_TTL, clock());
        cache.insert("HU", 25);
        assert_eq!(cache.invalidate(&"HU"), Some(25));

        let value: Result<u32, ()> = cache.get_or_compute("HU", || Ok(26));
        assert_eq!(value, Ok(26));
    }

    #[tokio::test]
    async fn async_compute_caches_success_only() {
        let cache: TtlCache<String, u32> = TtlCache::with_clock(DEFAULT_TTL, clock());
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        let failed: Result<u32, String> = cache
            .get_or_compute_async("history:CA1234".to_string(), move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("malformed".to_string())
            })
            .await;
        assert!(failed.is_err());

        for _ in 0..2 {
            let value: Result<u32, String> = cache
                .get_or_compute_async("history:CA1234".to_string(), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(20)
                })
                .await;
            assert_eq!(value, Ok(20));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_writers_leave_a_whole_entry() {
        let cache: Arc<TtlCache<&'static str, (u32, u32)>> = Arc::new(TtlCache::new(DEFAULT_TTL));
        let handles: Vec<_> = (0..8u32)
            .map(|n| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let _: Result<(u32, u32), ()> = cache.get_or_compute("route", || Ok((n, n)));
                        cache.insert("route", (n, n));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let (left, right) = cache.get(&"route").expect("entry present");
        assert_eq!(left, right);
    }
}
