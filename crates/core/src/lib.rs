pub mod cache;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod remote;
pub mod services;
pub mod sync;

use std::sync::Arc;

use cache::{
    key::{QueryKey, Resource},
    query_cache::{CacheReader, QueryCache, Snapshot, StalePolicy},
};
use config::ClientConfig;
use errors::CoreError;
use models::{
    analytics::{AllocationSlice, PortfolioTotals},
    cryptocurrency::{CryptocurrencyPage, MarketQuery},
    holding::Holding,
    portfolio::{PortfolioSummary, PortfolioValuation},
    trade::{TradeOrder, TradeReceipt},
    transaction::{Transaction, TransactionFilter},
    wallet::Wallet,
};
use remote::{
    http::HttpRemoteStore,
    traits::{RemoteStore, SessionProvider},
};
use services::analytics_service::AnalyticsService;
use sync::{
    connectivity::{ConnectivityEvent, ConnectivityMonitor},
    mutation::MutationCoordinator,
    poller::PollingRefresher,
};

/// Main entry point for the trading sync core.
///
/// Owns one query cache shared by every view, the mutation coordinator that
/// invalidates it, the market poller and the connectivity monitor. Views
/// read through the `*` query methods (stale-while-revalidate) or the
/// `load_*` methods (wait for a fresh value).
#[must_use]
pub struct TradingSync {
    config: ClientConfig,
    store: Arc<dyn RemoteStore>,
    cache: QueryCache,
    connectivity: ConnectivityMonitor,
    mutations: MutationCoordinator,
    poller: PollingRefresher,
    analytics: AnalyticsService,
}

impl std::fmt::Debug for TradingSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradingSync")
            .field("store", &self.store.name())
            .field("api_base_url", &self.config.api_base_url)
            .field("cached_queries", &self.cache.keys().len())
            .field("connectivity", &self.connectivity.state())
            .field("polling", &self.poller.active_query())
            .finish()
    }
}

impl TradingSync {
    /// Wire the core around an existing Remote Store, starting online.
    pub fn new(config: ClientConfig, store: Arc<dyn RemoteStore>) -> Self {
        Self::with_connectivity(config, store, ConnectivityMonitor::default())
    }

    /// Like [`TradingSync::new`] with an explicit connectivity monitor,
    /// e.g. one built from the environment's probe.
    pub fn with_connectivity(
        config: ClientConfig,
        store: Arc<dyn RemoteStore>,
        connectivity: ConnectivityMonitor,
    ) -> Self {
        let policy = StalePolicy::default()
            .with_stale_after(Resource::Cryptocurrencies, Some(config.market_stale_after));
        let cache = QueryCache::new(policy);
        let mutations = MutationCoordinator::new(Arc::clone(&store), cache.clone());
        let poller = PollingRefresher::new(
            cache.clone(),
            Arc::clone(&store),
            connectivity.clone(),
            config.poll_interval,
        );
        Self {
            config,
            store,
            cache,
            connectivity,
            mutations,
            poller,
            analytics: AnalyticsService::new(),
        }
    }

    /// Talk to the REST backend at `config.api_base_url`.
    pub fn connect(
        config: ClientConfig,
        session: Arc<dyn SessionProvider>,
    ) -> Result<Self, CoreError> {
        let store = HttpRemoteStore::new(&config, session)?;
        Ok(Self::new(config, Arc::new(store)))
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Read-only cache handle for presentation code.
    pub fn reader(&self) -> CacheReader {
        self.cache.reader()
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Transactions filter using the configured page size.
    #[must_use]
    pub fn default_transaction_filter(&self) -> TransactionFilter {
        TransactionFilter::new(self.config.transactions_limit)
    }

    // ── Queries (stale-while-revalidate) ────────────────────────────

    pub async fn wallet(&self) -> Result<Snapshot<Wallet>, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .read(Resource::Wallet.into(), move || async move { store.get_wallet().await })
            .await
    }

    pub async fn holdings(&self) -> Result<Snapshot<Vec<Holding>>, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .read(Resource::Holdings.into(), move || async move { store.get_holdings().await })
            .await
    }

    pub async fn transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Snapshot<Vec<Transaction>>, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .read(QueryKey::transactions(&filter), move || async move {
                store.get_transactions(&filter).await
            })
            .await
    }

    pub async fn portfolio(&self) -> Result<Snapshot<PortfolioSummary>, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .read(Resource::Portfolio.into(), move || async move { store.get_portfolio().await })
            .await
    }

    pub async fn cryptocurrencies(
        &self,
        query: MarketQuery,
    ) -> Result<Snapshot<CryptocurrencyPage>, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .read(QueryKey::market(&query), move || async move {
                store.list_cryptocurrencies(&query).await
            })
            .await
    }

    // ── Queries (fresh) ─────────────────────────────────────────────

    pub async fn load_wallet(&self) -> Result<Wallet, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_fetch(Resource::Wallet.into(), move || async move { store.get_wallet().await })
            .await
    }

    pub async fn load_holdings(&self) -> Result<Vec<Holding>, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_fetch(Resource::Holdings.into(), move || async move {
                store.get_holdings().await
            })
            .await
    }

    pub async fn load_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_fetch(QueryKey::transactions(&filter), move || async move {
                store.get_transactions(&filter).await
            })
            .await
    }

    pub async fn load_portfolio(&self) -> Result<PortfolioSummary, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_fetch(Resource::Portfolio.into(), move || async move {
                store.get_portfolio().await
            })
            .await
    }

    pub async fn load_cryptocurrencies(
        &self,
        query: MarketQuery,
    ) -> Result<CryptocurrencyPage, CoreError> {
        let store = Arc::clone(&self.store);
        self.cache
            .get_or_fetch(QueryKey::market(&query), move || async move {
                store.list_cryptocurrencies(&query).await
            })
            .await
    }

    // ── Mutations ───────────────────────────────────────────────────

    pub async fn buy(&self, symbol: &str, usd_notional: f64) -> Result<TradeReceipt, CoreError> {
        self.mutations.buy(symbol, usd_notional).await
    }

    pub async fn sell(&self, symbol: &str, quantity: f64) -> Result<TradeReceipt, CoreError> {
        self.mutations.sell(symbol, quantity).await
    }

    pub async fn place(&self, order: TradeOrder) -> Result<TradeReceipt, CoreError> {
        self.mutations.place(order).await
    }

    pub async fn create_wallet(&self) -> Result<Wallet, CoreError> {
        self.mutations.create_wallet().await
    }

    pub async fn update_portfolio(&self) -> Result<PortfolioValuation, CoreError> {
        self.mutations.update_portfolio().await
    }

    // ── Market refresh ──────────────────────────────────────────────

    /// Manual refresh of a market listing. Refused while offline.
    pub async fn refresh_market(&self, query: MarketQuery) -> Result<CryptocurrencyPage, CoreError> {
        if !self.connectivity.is_online() {
            return Err(CoreError::Offline);
        }
        let store = Arc::clone(&self.store);
        self.cache
            .refetch(QueryKey::market(&query), move || async move {
                store.list_cryptocurrencies(&query).await
            })
            .await
    }

    /// Keep `query` refreshed in the background, replacing any previous target.
    ///
    /// Market pages nobody has asked for within the freshness window are
    /// dropped, so abandoned searches do not pile up over a session.
    pub fn watch_market(&self, query: MarketQuery) {
        self.poller.start(query);
        self.cache
            .evict_idle(Resource::Cryptocurrencies, self.config.market_stale_after);
    }

    pub fn stop_watching(&self) {
        self.poller.stop();
    }

    #[must_use]
    pub fn watched_market(&self) -> Option<MarketQuery> {
        self.poller.active_query()
    }

    /// Forward an online/offline signal from the environment.
    pub fn handle_connectivity(&self, event: ConnectivityEvent) -> bool {
        self.connectivity.handle_event(event)
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Totals and best/worst performer over the current holdings.
    pub async fn totals(&self) -> Result<PortfolioTotals, CoreError> {
        let holdings = self.load_holdings().await?;
        Ok(self.analytics.totals(&holdings))
    }

    /// Cash and per-holding share of the portfolio value.
    pub async fn allocation(&self) -> Result<Vec<AllocationSlice>, CoreError> {
        let wallet = self.load_wallet().await?;
        let holdings = self.load_holdings().await?;
        Ok(self.analytics.allocation(&wallet, &holdings))
    }
}
