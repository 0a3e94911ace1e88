use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::cache::key::Resource;
use crate::cache::query_cache::QueryCache;
use crate::errors::{CoreError, ErrorKind};
use crate::models::portfolio::PortfolioValuation;
use crate::models::trade::{TradeOrder, TradeReceipt, TradeSide};
use crate::models::wallet::Wallet;
use crate::remote::traits::RemoteStore;

/// A state-changing operation against the Remote Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    Buy,
    Sell,
    CreateWallet,
    UpdatePortfolio,
}

impl Mutation {
    /// Cache resources whose entries are invalidated once the mutation succeeds.
    pub fn invalidates(&self) -> &'static [Resource] {
        match self {
            Mutation::Buy | Mutation::Sell => &[
                Resource::Wallet,
                Resource::Holdings,
                Resource::Transactions,
                Resource::Portfolio,
            ],
            Mutation::CreateWallet => &[Resource::Wallet, Resource::Holdings, Resource::Portfolio],
            Mutation::UpdatePortfolio => &[Resource::Portfolio, Resource::Holdings],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mutation::Buy => "buy",
            Mutation::Sell => "sell",
            Mutation::CreateWallet => "create_wallet",
            Mutation::UpdatePortfolio => "update_portfolio",
        }
    }
}

impl From<TradeSide> for Mutation {
    fn from(side: TradeSide) -> Self {
        match side {
            TradeSide::Buy => Mutation::Buy,
            TradeSide::Sell => Mutation::Sell,
        }
    }
}

/// Runs mutations and brings the query cache in line afterwards.
///
/// Invalidation happens strictly after the Remote Store confirmed the
/// mutation; a failed mutation leaves every cache entry untouched. Nothing is
/// patched locally ahead of confirmation. Concurrent mutations are allowed
/// and are not ordered against each other.
pub struct MutationCoordinator {
    store: Arc<dyn RemoteStore>,
    cache: QueryCache,
}

impl MutationCoordinator {
    pub fn new(store: Arc<dyn RemoteStore>, cache: QueryCache) -> Self {
        Self { store, cache }
    }

    /// Buy `usd_notional` dollars' worth of `symbol` (fee included).
    pub async fn buy(&self, symbol: &str, usd_notional: f64) -> Result<TradeReceipt, CoreError> {
        self.place(TradeOrder::buy(symbol, usd_notional)).await
    }

    /// Sell `quantity` units of `symbol`.
    pub async fn sell(&self, symbol: &str, quantity: f64) -> Result<TradeReceipt, CoreError> {
        self.place(TradeOrder::sell(symbol, quantity)).await
    }

    /// Execute a market order. Malformed orders fail before any request.
    pub async fn place(&self, order: TradeOrder) -> Result<TradeReceipt, CoreError> {
        let mutation = Mutation::from(order.side());
        if let Err(e) = order.validate() {
            warn!(mutation = mutation.name(), error = %e, "Order rejected locally");
            return Err(e);
        }
        self.run(mutation, self.store.execute_trade(&order)).await
    }

    /// Create the user's wallet (returns the existing one if already created).
    pub async fn create_wallet(&self) -> Result<Wallet, CoreError> {
        self.run(Mutation::CreateWallet, self.store.create_wallet())
            .await
    }

    /// Revalue all holdings at the latest market prices.
    pub async fn update_portfolio(&self) -> Result<PortfolioValuation, CoreError> {
        self.run(Mutation::UpdatePortfolio, self.store.update_portfolio())
            .await
    }

    async fn run<T, Fut>(&self, mutation: Mutation, request: Fut) -> Result<T, CoreError>
    where
        Fut: Future<Output = Result<T, CoreError>>,
    {
        match request.await {
            Ok(value) => {
                let touched: usize = mutation
                    .invalidates()
                    .iter()
                    .map(|resource| self.cache.invalidate_resource(*resource))
                    .sum();
                info!(mutation = mutation.name(), invalidated = touched, "Mutation confirmed");
                Ok(value)
            }
            Err(e) => {
                match e.kind() {
                    ErrorKind::Server => {
                        error!(mutation = mutation.name(), store = self.store.name(), error = %e, "Mutation failed on the server")
                    }
                    _ => warn!(mutation = mutation.name(), error = %e, "Mutation rejected"),
                }
                Err(e)
            }
        }
    }
}
