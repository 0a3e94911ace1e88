use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::cryptocurrency::{CryptocurrencyPage, MarketQuery};
use crate::models::holding::Holding;
use crate::models::portfolio::{PortfolioSummary, PortfolioValuation};
use crate::models::trade::{TradeOrder, TradeReceipt};
use crate::models::transaction::{Transaction, TransactionFilter};
use crate::models::wallet::Wallet;

/// The authoritative trading backend, as seen by the sync core.
///
/// [`crate::remote::http::HttpRemoteStore`] talks to the REST service; tests
/// plug in in-memory doubles. Every value handed back has already been
/// translated by [`crate::remote::adapter`], so holdings satisfy the
/// value/P&L invariant.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Human-readable name of this store (for logs/errors).
    fn name(&self) -> &str;

    /// `GET /cryptocurrencies/`: one page of market listings.
    async fn list_cryptocurrencies(
        &self,
        query: &MarketQuery,
    ) -> Result<CryptocurrencyPage, CoreError>;

    /// `GET /trading/wallet`
    async fn get_wallet(&self) -> Result<Wallet, CoreError>;

    /// `POST /trading/wallet/create`: returns the existing wallet if one exists.
    async fn create_wallet(&self) -> Result<Wallet, CoreError>;

    /// `GET /trading/holdings`
    async fn get_holdings(&self) -> Result<Vec<Holding>, CoreError>;

    /// `GET /trading/portfolio`
    async fn get_portfolio(&self) -> Result<PortfolioSummary, CoreError>;

    /// `POST /trading/buy` or `POST /trading/sell`, depending on the order side.
    async fn execute_trade(&self, order: &TradeOrder) -> Result<TradeReceipt, CoreError>;

    /// `GET /trading/transactions`: newest first.
    async fn get_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, CoreError>;

    /// `POST /trading/update-portfolio`: revalue holdings at the latest prices.
    async fn update_portfolio(&self) -> Result<PortfolioValuation, CoreError>;
}

/// Credential storage owned by the host application's auth layer.
///
/// The sync core only reads the token and reports an expired session; it
/// never issues, refreshes or clears credentials itself.
pub trait SessionProvider: Send + Sync {
    /// Bearer token to attach to the next request, if logged in.
    fn bearer_token(&self) -> Option<String>;

    /// Called once per 401 response. Implementations clear credentials and
    /// send the user back to the login screen.
    fn session_expired(&self);
}

/// A fixed token, for scripts and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticSession {
    token: Option<String>,
}

impl StaticSession {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

impl SessionProvider for StaticSession {
    fn bearer_token(&self) -> Option<String> {
        self.token.clone()
    }

    fn session_expired(&self) {
        tracing::warn!("Session rejected by the Remote Store; static token cannot be refreshed");
    }
}
