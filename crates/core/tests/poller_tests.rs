// ═══════════════════════════════════════════════════════════════════
// Polling & Connectivity Tests — interval refresh, target replacement,
// offline gating, manual refresh
// ═══════════════════════════════════════════════════════════════════

mod common;

use std::sync::Arc;
use std::time::Duration;

use trading_sync_core::cache::key::QueryKey;
use trading_sync_core::config::ClientConfig;
use trading_sync_core::errors::CoreError;
use trading_sync_core::models::cryptocurrency::{CryptocurrencyPage, MarketQuery, SortField, SortOrder};
use trading_sync_core::sync::connectivity::{Connectivity, ConnectivityEvent, ConnectivityMonitor};
use trading_sync_core::TradingSync;

use common::SimulatedStore;

const LISTING: &str = "list_cryptocurrencies";
const INTERVAL: Duration = Duration::from_secs(30);

fn setup(initial: Connectivity) -> (Arc<SimulatedStore>, TradingSync) {
    let store = Arc::new(SimulatedStore::funded());
    let config = ClientConfig {
        poll_interval: INTERVAL,
        ..ClientConfig::default()
    };
    let sync = TradingSync::with_connectivity(config, store.clone(), ConnectivityMonitor::new(initial));
    (store, sync)
}

/// Let spawned tasks run without moving past the next poll tick.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// ═══════════════════════════════════════════════════════════════════
// Interval polling
// ═══════════════════════════════════════════════════════════════════

mod polling {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_every_interval() {
        let (store, sync) = setup(Connectivity::Online);

        sync.watch_market(MarketQuery::new());
        settle().await;
        assert_eq!(store.calls(LISTING), 1);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(store.calls(LISTING), 2);

        tokio::time::sleep(INTERVAL * 2).await;
        assert_eq!(store.calls(LISTING), 4);

        let key = QueryKey::market(&MarketQuery::new());
        assert!(sync.reader().peek::<CryptocurrencyPage>(&key).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn same_query_does_not_restart() {
        let (store, sync) = setup(Connectivity::Online);

        sync.watch_market(MarketQuery::new());
        settle().await;
        sync.watch_market(MarketQuery::new());
        settle().await;

        assert_eq!(store.calls(LISTING), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn search_case_does_not_restart() {
        let (store, sync) = setup(Connectivity::Online);

        sync.watch_market(MarketQuery::new().search("BTC"));
        settle().await;
        sync.watch_market(MarketQuery::new().search("btc"));
        settle().await;

        assert_eq!(store.calls(LISTING), 1);
        tokio::time::sleep(INTERVAL).await;
        assert_eq!(store.calls(LISTING), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_responses_do_not_shift_the_schedule() {
        let (store, sync) = setup(Connectivity::Online);
        store.delay_next_listing(Duration::from_secs(10));

        sync.watch_market(MarketQuery::new());
        settle().await;
        tokio::time::sleep(INTERVAL).await;

        // Second poll fires 30s after the first started, not after it ended.
        assert_eq!(store.calls(LISTING), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn new_query_replaces_previous_target() {
        let (store, sync) = setup(Connectivity::Online);
        let first = MarketQuery::new();
        let second = MarketQuery::new().sorted_by(SortField::Volume, SortOrder::Desc);

        sync.watch_market(first.clone());
        settle().await;
        sync.watch_market(second.clone());
        settle().await;
        assert_eq!(sync.watched_market(), Some(second.clone()));

        let first_fetched = sync.reader().status(&QueryKey::market(&first)).fetched_at;
        tokio::time::sleep(INTERVAL * 3).await;

        // Only the second target keeps polling.
        assert_eq!(store.calls(LISTING), 2 + 3);
        assert_eq!(sync.reader().status(&QueryKey::market(&first)).fetched_at, first_fetched);
        assert!(sync.reader().is_fresh(&QueryKey::market(&second)));
    }

    #[tokio::test(start_paused = true)]
    async fn watching_drops_abandoned_searches() {
        let (_store, sync) = setup(Connectivity::Online);
        let abandoned = MarketQuery::new().search("sol");
        sync.load_cryptocurrencies(abandoned.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(6 * 60)).await;
        sync.watch_market(MarketQuery::new());
        settle().await;

        assert!(!sync.reader().status(&QueryKey::market(&abandoned)).has_value);
        assert!(sync.reader().status(&QueryKey::market(&MarketQuery::new())).has_value);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_polling() {
        let (store, sync) = setup(Connectivity::Online);

        sync.watch_market(MarketQuery::new());
        settle().await;
        sync.stop_watching();
        tokio::time::sleep(INTERVAL * 3).await;

        assert_eq!(store.calls(LISTING), 1);
        assert_eq!(sync.watched_market(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_polling() {
        let (store, sync) = setup(Connectivity::Online);
        store.fail_next(LISTING, CoreError::Network("timed out".into()));

        sync.watch_market(MarketQuery::new());
        settle().await;
        let key = QueryKey::market(&MarketQuery::new());
        assert!(!sync.reader().status(&key).has_value);

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(store.calls(LISTING), 2);
        assert!(sync.reader().is_fresh(&key));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_older_poll_does_not_overwrite_newer_refresh() {
        let (store, sync) = setup(Connectivity::Online);
        let query = MarketQuery::new();
        store.delay_next_listing(Duration::from_secs(5));

        sync.watch_market(query.clone());
        settle().await;
        store.set_price("BTC", 70_000.0);
        let manual = sync.refresh_market(query.clone()).await.unwrap();
        assert_eq!(manual.find("BTC").unwrap().current_price, 70_000.0);

        store.set_price("BTC", 1.0);
        tokio::time::sleep(Duration::from_secs(6)).await;

        let cached: CryptocurrencyPage = sync.reader().peek(&QueryKey::market(&query)).unwrap();
        assert_eq!(cached.find("BTC").unwrap().current_price, 70_000.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Connectivity gating
// ═══════════════════════════════════════════════════════════════════

mod connectivity {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn no_fetches_while_offline() {
        let (store, sync) = setup(Connectivity::Offline);

        sync.watch_market(MarketQuery::new());
        tokio::time::sleep(INTERVAL * 4).await;

        assert_eq!(store.calls(LISTING), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_fetches_immediately() {
        let (store, sync) = setup(Connectivity::Offline);
        sync.watch_market(MarketQuery::new());
        settle().await;

        assert!(sync.handle_connectivity(ConnectivityEvent::WentOnline));
        settle().await;

        assert_eq!(store.calls(LISTING), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn going_offline_pauses_polling() {
        let (store, sync) = setup(Connectivity::Online);
        sync.watch_market(MarketQuery::new());
        settle().await;
        assert_eq!(store.calls(LISTING), 1);

        sync.handle_connectivity(ConnectivityEvent::WentOffline);
        tokio::time::sleep(INTERVAL * 3).await;
        assert_eq!(store.calls(LISTING), 1);

        sync.handle_connectivity(ConnectivityEvent::WentOnline);
        settle().await;
        assert_eq!(store.calls(LISTING), 2);
    }

    #[tokio::test]
    async fn repeated_events_are_not_transitions() {
        let (_store, sync) = setup(Connectivity::Online);
        assert!(!sync.handle_connectivity(ConnectivityEvent::WentOnline));
        assert!(sync.handle_connectivity(ConnectivityEvent::WentOffline));
        assert!(!sync.handle_connectivity(ConnectivityEvent::WentOffline));
        assert_eq!(sync.connectivity().state(), Connectivity::Offline);
    }

    #[tokio::test]
    async fn manual_refresh_is_refused_offline() {
        let (store, sync) = setup(Connectivity::Offline);

        let err = sync.refresh_market(MarketQuery::new()).await.unwrap_err();

        assert_eq!(err, CoreError::Offline);
        assert_eq!(store.calls(LISTING), 0);
    }

    #[tokio::test]
    async fn manual_refresh_bypasses_freshness() {
        let (store, sync) = setup(Connectivity::Online);
        sync.load_cryptocurrencies(MarketQuery::new()).await.unwrap();
        sync.refresh_market(MarketQuery::new()).await.unwrap();
        assert_eq!(store.calls(LISTING), 2);
    }
}
