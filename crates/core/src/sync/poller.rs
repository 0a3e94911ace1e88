use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::cache::key::QueryKey;
use crate::cache::query_cache::QueryCache;
use crate::models::cryptocurrency::{CryptocurrencyPage, MarketQuery};
use crate::remote::traits::RemoteStore;
use super::connectivity::ConnectivityMonitor;

struct ActivePoll {
    query: MarketQuery,
    key: QueryKey,
    task: JoinHandle<()>,
}

/// Periodically refreshes one market listing query while online.
///
/// At most one query is polled at a time. Starting a different query
/// replaces the running one, so only the current query's results keep
/// arriving. Polling pauses while offline and resumes with an immediate
/// fetch when connectivity returns.
pub struct PollingRefresher {
    cache: QueryCache,
    store: Arc<dyn RemoteStore>,
    connectivity: ConnectivityMonitor,
    interval: Duration,
    active: Mutex<Option<ActivePoll>>,
}

impl PollingRefresher {
    pub fn new(
        cache: QueryCache,
        store: Arc<dyn RemoteStore>,
        connectivity: ConnectivityMonitor,
        interval: Duration,
    ) -> Self {
        Self {
            cache,
            store,
            connectivity,
            interval,
            active: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll `query`. Calling again with a query that maps to the same
    /// cache key is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, query: MarketQuery) {
        let key = QueryKey::market(&query);
        let mut active = self.lock();
        if let Some(current) = active.as_ref() {
            if current.key == key && !current.task.is_finished() {
                debug!(%key, "Already polling");
                return;
            }
        }
        if let Some(previous) = active.take() {
            previous.task.abort();
            debug!(key = %previous.key, "Polling target replaced");
        }

        info!(%key, interval_secs = self.interval.as_secs(), "Polling started");
        let task = tokio::spawn(poll_loop(
            self.cache.clone(),
            Arc::clone(&self.store),
            self.connectivity.clone(),
            query.clone(),
            self.interval,
        ));
        *active = Some(ActivePoll { query, key, task });
    }

    /// Stop polling. A request already sent still completes and lands in
    /// the cache.
    pub fn stop(&self) {
        if let Some(previous) = self.lock().take() {
            previous.task.abort();
            info!(key = %previous.key, "Polling stopped");
        }
    }

    pub fn active_query(&self) -> Option<MarketQuery> {
        self.lock().as_ref().map(|poll| poll.query.clone())
    }

    pub fn is_polling(&self) -> bool {
        self.lock()
            .as_ref()
            .map(|poll| !poll.task.is_finished())
            .unwrap_or(false)
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActivePoll>> {
        self.active.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for PollingRefresher {
    fn drop(&mut self) {
        if let Some(previous) = self.lock().take() {
            previous.task.abort();
        }
    }
}

async fn poll_loop(
    cache: QueryCache,
    store: Arc<dyn RemoteStore>,
    connectivity: ConnectivityMonitor,
    query: MarketQuery,
    interval: Duration,
) {
    let key = QueryKey::market(&query);
    // Ticks stay on a fixed period however long each request takes.
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if !connectivity.is_online() {
            debug!(%key, "Offline, polling paused");
            connectivity.wait_until_online().await;
            debug!(%key, "Back online, polling resumed");
            ticker.reset();
        }

        let fetch_store = Arc::clone(&store);
        let fetch_query = query.clone();
        let result = cache
            .refetch::<CryptocurrencyPage, _, _>(key.clone(), move || async move {
                fetch_store.list_cryptocurrencies(&fetch_query).await
            })
            .await;
        match result {
            Ok(page) => debug!(%key, items = page.items.len(), "Market listing refreshed"),
            // Previous listing stays in the cache; next tick tries again.
            Err(e) => warn!(%key, error = %e, "Market refresh failed"),
        }
    }
}
