use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::errors::{CoreError, ErrorKind};
use super::key::{QueryKey, Resource};
use super::value::{CachedValue, Cacheable};

/// Default freshness window of market listings.
pub const MARKET_STALE_AFTER: Duration = Duration::from_secs(5 * 60);

type SharedFetch = Shared<BoxFuture<'static, Result<CachedValue, CoreError>>>;

/// Per-resource stale-after durations.
///
/// Resources without an entry never go stale on their own; they are only
/// refreshed after an explicit invalidation.
#[derive(Debug, Clone, PartialEq)]
pub struct StalePolicy {
    stale_after: HashMap<Resource, Duration>,
}

impl StalePolicy {
    /// Nothing expires; every refresh is driven by invalidation.
    pub fn never() -> Self {
        Self {
            stale_after: HashMap::new(),
        }
    }

    pub fn with_stale_after(mut self, resource: Resource, after: Option<Duration>) -> Self {
        match after {
            Some(after) => self.stale_after.insert(resource, after),
            None => self.stale_after.remove(&resource),
        };
        self
    }

    pub fn stale_after(&self, resource: Resource) -> Option<Duration> {
        self.stale_after.get(&resource).copied()
    }
}

impl Default for StalePolicy {
    fn default() -> Self {
        Self::never().with_stale_after(Resource::Cryptocurrencies, Some(MARKET_STALE_AFTER))
    }
}

/// Result of a non-blocking [`QueryCache::read`].
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub value: T,
    /// The value is past its freshness window or was invalidated.
    pub is_stale: bool,
    /// A refetch for the key is in flight.
    pub is_refreshing: bool,
}

/// Observable state of one cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStatus {
    pub has_value: bool,
    pub is_fresh: bool,
    pub is_fetching: bool,
    pub fetched_at: Option<Instant>,
    /// Last time a query (not a peek) asked for this key.
    pub last_read: Option<Instant>,
}

struct InFlight {
    generation: u64,
    future: SharedFetch,
}

/// One cache slot.
///
/// Generations are handed out from a single counter, so comparing them tells
/// which request was issued last:
/// - `applied_generation`: request whose result `value` holds,
/// - `stale_through`: every result issued up to here predates the latest
///   invalidation and may be shown but not trusted as fresh.
#[derive(Default)]
struct Entry {
    value: Option<CachedValue>,
    fetched_at: Option<Instant>,
    last_read: Option<Instant>,
    applied_generation: u64,
    stale_through: u64,
    in_flight: Option<InFlight>,
}

impl Entry {
    fn is_fresh(&self, stale_after: Option<Duration>, now: Instant) -> bool {
        if self.value.is_none() || self.applied_generation <= self.stale_through {
            return false;
        }
        match (stale_after, self.fetched_at) {
            (Some(after), Some(at)) => now.duration_since(at) < after,
            _ => true,
        }
    }

    fn is_idle(&self, idle_for: Duration, now: Instant) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        if self.value.is_none() {
            return true;
        }
        self.last_read
            .map_or(true, |at| now.duration_since(at) >= idle_for)
    }
}

struct Inner {
    entries: Mutex<HashMap<QueryKey, Entry>>,
    generation: AtomicU64,
    policy: StalePolicy,
}

impl Inner {
    // The lock is never held across an await, so poisoning can only come
    // from a panic in plain bookkeeping; the map is still usable.
    fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Apply a finished request to its slot. Returns what its awaiters see.
    ///
    /// A slot that was cleared or evicted meanwhile is not recreated.
    fn complete(
        &self,
        key: &QueryKey,
        generation: u64,
        result: Result<CachedValue, CoreError>,
    ) -> Result<CachedValue, CoreError> {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(key) else {
            debug!(%key, generation, "Slot gone; response not cached");
            return result;
        };

        if entry
            .in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            entry.in_flight = None;
        }

        match result {
            Ok(value) if generation > entry.applied_generation => {
                debug!(%key, generation, "Cache entry updated");
                entry.value = Some(value.clone());
                entry.fetched_at = Some(Instant::now());
                entry.applied_generation = generation;
                Ok(value)
            }
            Ok(value) => {
                debug!(
                    %key,
                    generation,
                    applied = entry.applied_generation,
                    "Discarding response superseded by a newer request"
                );
                Ok(entry.value.clone().unwrap_or(value))
            }
            Err(e) => {
                match e.kind() {
                    ErrorKind::Server => {
                        error!(%key, generation, error = %e, "Server error; keeping last known value")
                    }
                    _ => warn!(%key, generation, error = %e, "Fetch failed; keeping last known value"),
                }
                if entry.value.is_none() && entry.in_flight.is_none() {
                    entries.remove(key);
                }
                Err(e)
            }
        }
    }
}

/// Session-wide memo of Remote Store responses.
///
/// Cheap to clone: every clone shares the same slots. Construct one per
/// session and hand it to the mutation coordinator and polling refresher;
/// presentation code gets a [`CacheReader`].
///
/// Guarantees:
/// - **De-duplication**: concurrent `get_or_fetch` calls for a key that has
///   no fresh value share one request.
/// - **Stale-while-revalidate**: invalidation keeps the value; `read` serves
///   it while a background refetch runs.
/// - **Last-request-wins**: a response is applied only if no newer request
///   for the key has already been applied.
/// - **Failure retention**: a failed fetch leaves value and freshness as they
///   were and surfaces the error.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.inner.lock().len())
            .field("generation", &self.inner.current_generation())
            .finish()
    }
}

impl QueryCache {
    pub fn new(policy: StalePolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                policy,
            }),
        }
    }

    pub fn policy(&self) -> &StalePolicy {
        &self.inner.policy
    }

    /// Read-only handle for presentation code.
    pub fn reader(&self) -> CacheReader {
        CacheReader {
            cache: self.clone(),
        }
    }

    /// Return the fresh cached value for `key`, or fetch it.
    ///
    /// Joins an in-flight request for the key instead of starting another.
    /// `fetcher` is only invoked if this call starts the request.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, CoreError>
    where
        T: Cacheable,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let pending = {
            let mut entries = self.inner.lock();
            let stale_after = self.inner.policy.stale_after(key.resource());
            let entry = entries.entry(key.clone()).or_default();
            entry.last_read = Some(Instant::now());

            if entry.is_fresh(stale_after, Instant::now()) {
                if let Some(value) = &entry.value {
                    debug!(%key, "Cache hit");
                    return downcast(&key, value);
                }
            }

            match &entry.in_flight {
                Some(in_flight) => {
                    debug!(%key, generation = in_flight.generation, "Joining in-flight request");
                    in_flight.future.clone()
                }
                None => {
                    debug!(%key, "Cache miss");
                    self.begin(&key, entry, fetcher)
                }
            }
        };

        let value = pending.await?;
        downcast(&key, &value)
    }

    /// Fetch `key` unconditionally, superseding any in-flight request.
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, CoreError>
    where
        T: Cacheable,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let pending = {
            let mut entries = self.inner.lock();
            let entry = entries.entry(key.clone()).or_default();
            entry.last_read = Some(Instant::now());
            debug!(%key, "Forced refetch");
            self.begin(&key, entry, fetcher)
        };

        let value = pending.await?;
        downcast(&key, &value)
    }

    /// Stale-while-revalidate read.
    ///
    /// - fresh value: returned as is;
    /// - stale value: returned immediately, a background refetch is started
    ///   unless one is already running;
    /// - no value: waits for the fetch.
    pub async fn read<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Snapshot<T>, CoreError>
    where
        T: Cacheable,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        {
            let mut entries = self.inner.lock();
            let stale_after = self.inner.policy.stale_after(key.resource());
            let entry = entries.entry(key.clone()).or_default();
            entry.last_read = Some(Instant::now());

            if let Some(value) = entry.value.clone() {
                let value: T = downcast(&key, &value)?;
                if entry.is_fresh(stale_after, Instant::now()) {
                    return Ok(Snapshot {
                        value,
                        is_stale: false,
                        is_refreshing: entry.in_flight.is_some(),
                    });
                }
                if entry.in_flight.is_none() {
                    debug!(%key, "Serving stale value while revalidating");
                    let _ = self.begin(&key, entry, fetcher);
                }
                return Ok(Snapshot {
                    value,
                    is_stale: true,
                    is_refreshing: true,
                });
            }
        }

        let value = self.get_or_fetch(key, fetcher).await?;
        Ok(Snapshot {
            value,
            is_stale: false,
            is_refreshing: false,
        })
    }

    /// Start a request for `key` and register it as the slot's in-flight one.
    ///
    /// The request runs on its own task so it completes, and is applied or
    /// discarded by generation, even if every caller stops waiting.
    fn begin<T, F, Fut>(&self, key: &QueryKey, entry: &mut Entry, fetcher: F) -> SharedFetch
    where
        T: Cacheable,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        let generation = self.inner.next_generation();
        let inner = Arc::clone(&self.inner);
        let request_key = key.clone();

        let future: SharedFetch = async move {
            let result = fetcher().await.map(Cacheable::into_cached);
            inner.complete(&request_key, generation, result)
        }
        .boxed()
        .shared();

        entry.in_flight = Some(InFlight {
            generation,
            future: future.clone(),
        });
        tokio::spawn(future.clone());
        future
    }

    /// Mark `key` stale. Returns the number of entries touched (0 or 1).
    pub fn invalidate(&self, key: &QueryKey) -> usize {
        self.invalidate_where(|k| k == key)
    }

    /// Mark every entry of `resource` stale, whatever its parameters.
    pub fn invalidate_resource(&self, resource: Resource) -> usize {
        self.invalidate_where(|k| k.resource() == resource)
    }

    /// Mark every entry matching `predicate` stale.
    ///
    /// Values are kept for display. In-flight requests are detached: they
    /// may still fill an empty slot but cannot make it fresh, and the next
    /// `get_or_fetch` starts a new request instead of joining them.
    pub fn invalidate_where<P>(&self, predicate: P) -> usize
    where
        P: Fn(&QueryKey) -> bool,
    {
        let mut entries = self.inner.lock();
        let through = self.inner.current_generation();
        let mut touched = 0;
        for (key, entry) in entries.iter_mut().filter(|(k, _)| predicate(k)) {
            entry.stale_through = through;
            entry.in_flight = None;
            touched += 1;
            debug!(%key, "Invalidated");
        }
        touched
    }

    /// Drop `resource` entries that hold no value or that no query has
    /// asked for within `idle_for`. Entries with a request in flight stay.
    ///
    /// Returns the number of entries dropped.
    pub fn evict_idle(&self, resource: Resource, idle_for: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.inner.lock();
        let before = entries.len();
        entries.retain(|key, entry| key.resource() != resource || !entry.is_idle(idle_for, now));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(%resource, evicted, "Evicted idle entries");
        }
        evicted
    }

    /// Drop every entry (e.g. on logout).
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Cached value for `key`, fresh or not. Never fetches.
    pub fn peek<T: Cacheable>(&self, key: &QueryKey) -> Option<T> {
        let entries = self.inner.lock();
        entries
            .get(key)
            .and_then(|e| e.value.as_ref())
            .and_then(T::from_cached)
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.status(key).is_fresh
    }

    pub fn status(&self, key: &QueryKey) -> EntryStatus {
        let entries = self.inner.lock();
        let stale_after = self.inner.policy.stale_after(key.resource());
        match entries.get(key) {
            Some(entry) => EntryStatus {
                has_value: entry.value.is_some(),
                is_fresh: entry.is_fresh(stale_after, Instant::now()),
                is_fetching: entry.in_flight.is_some(),
                fetched_at: entry.fetched_at,
                last_read: entry.last_read,
            },
            None => EntryStatus {
                has_value: false,
                is_fresh: false,
                is_fetching: false,
                fetched_at: None,
                last_read: None,
            },
        }
    }

    /// Keys currently held, in no particular order.
    pub fn keys(&self) -> Vec<QueryKey> {
        self.inner.lock().keys().cloned().collect()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(StalePolicy::default())
    }
}

fn downcast<T: Cacheable>(key: &QueryKey, value: &CachedValue) -> Result<T, CoreError> {
    T::from_cached(value).ok_or_else(|| {
        CoreError::Decode(format!("Cached value for {key} has an unexpected type"))
    })
}

/// Read-only view of a [`QueryCache`]. Cannot fetch, invalidate or write.
#[derive(Clone, Debug)]
pub struct CacheReader {
    cache: QueryCache,
}

impl CacheReader {
    pub fn peek<T: Cacheable>(&self, key: &QueryKey) -> Option<T> {
        self.cache.peek(key)
    }

    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.cache.is_fresh(key)
    }

    pub fn status(&self, key: &QueryKey) -> EntryStatus {
        self.cache.status(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_expires_only_market_data() {
        let policy = StalePolicy::default();
        assert_eq!(
            policy.stale_after(Resource::Cryptocurrencies),
            Some(Duration::from_secs(300))
        );
        assert_eq!(policy.stale_after(Resource::Holdings), None);
        assert_eq!(policy.stale_after(Resource::Wallet), None);
    }

    #[test]
    fn empty_entry_is_idle() {
        let entry = Entry::default();
        assert!(entry.is_idle(Duration::from_secs(60), Instant::now()));
    }

    #[test]
    fn empty_entry_is_not_fresh() {
        let entry = Entry::default();
        assert!(!entry.is_fresh(None, Instant::now()));
    }
}
