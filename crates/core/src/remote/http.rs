use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn, Instrument};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::errors::CoreError;
use crate::models::cryptocurrency::{CryptocurrencyPage, MarketQuery};
use crate::models::holding::Holding;
use crate::models::portfolio::{PortfolioSummary, PortfolioValuation};
use crate::models::trade::{TradeOrder, TradeReceipt};
use crate::models::transaction::{Transaction, TransactionFilter};
use crate::models::wallet::Wallet;
use super::adapter;
use super::traits::{RemoteStore, SessionProvider};

/// Header carrying the per-request correlation id, matched in server logs.
pub const CORRELATION_HEADER: &str = "X-Correlation-ID";

/// REST client for the trading backend.
///
/// - **Auth**: bearer token from the [`SessionProvider`] on every request.
/// - **Timeouts**: one fixed timeout per request (`ClientConfig::request_timeout`);
///   elapsed requests surface as `CoreError::Network`. No retries.
/// - **Decoding**: payloads go through [`adapter`], never decoded here.
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionProvider>,
}

impl HttpRemoteStore {
    pub fn new(config: &ClientConfig, session: Arc<dyn SessionProvider>) -> Result<Self, CoreError> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| CoreError::Configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str, query: &[(&'static str, String)]) -> Result<String, CoreError> {
        let request = self.client.get(self.url(path)).query(query);
        self.send(Method::GET, path, request).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, CoreError> {
        let mut request = self.client.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(Method::POST, path, request).await
    }

    /// Attach auth + correlation headers, send, and classify the response.
    /// Returns the raw body of a 2xx response.
    async fn send(
        &self,
        method: Method,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<String, CoreError> {
        let correlation_id = Uuid::new_v4();
        let span = tracing::debug_span!("remote", %method, path, %correlation_id);

        async move {
            let mut request = request.header(CORRELATION_HEADER, correlation_id.to_string());
            if let Some(token) = self.session.bearer_token() {
                request = request.bearer_auth(token);
            }

            let started = Instant::now();
            let response = request.send().await.map_err(|e| {
                warn!(error = %e, "Request did not complete");
                CoreError::from(e)
            })?;
            let status = response.status();
            debug!(
                status = status.as_u16(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Response received"
            );

            if status.is_success() {
                return Ok(response.text().await?);
            }

            if status == StatusCode::UNAUTHORIZED {
                self.session.session_expired();
            }
            let body = response.text().await.unwrap_or_default();
            Err(adapter::error_from_status(status.as_u16(), &body))
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn list_cryptocurrencies(
        &self,
        query: &MarketQuery,
    ) -> Result<CryptocurrencyPage, CoreError> {
        let body = self
            .get("/cryptocurrencies/", &adapter::market_query_params(query))
            .await?;
        adapter::decode_listing(&body, query)
    }

    async fn get_wallet(&self) -> Result<Wallet, CoreError> {
        let body = self.get("/trading/wallet", &[]).await?;
        adapter::decode_wallet(&body)
    }

    async fn create_wallet(&self) -> Result<Wallet, CoreError> {
        let body = self.post::<()>("/trading/wallet/create", None).await?;
        adapter::decode_wallet(&body)
    }

    async fn get_holdings(&self) -> Result<Vec<Holding>, CoreError> {
        let body = self.get("/trading/holdings", &[]).await?;
        adapter::decode_holdings(&body)
    }

    async fn get_portfolio(&self) -> Result<PortfolioSummary, CoreError> {
        let body = self.get("/trading/portfolio", &[]).await?;
        adapter::decode_portfolio(&body)
    }

    async fn execute_trade(&self, order: &TradeOrder) -> Result<TradeReceipt, CoreError> {
        order.validate()?;
        let body = self
            .post(adapter::trade_path(order), Some(&adapter::trade_body(order)))
            .await?;
        adapter::decode_trade_receipt(&body)
    }

    async fn get_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, CoreError> {
        let body = self
            .get("/trading/transactions", &adapter::transaction_params(filter))
            .await?;
        adapter::decode_transactions(&body)
    }

    async fn update_portfolio(&self) -> Result<PortfolioValuation, CoreError> {
        let body = self.post::<()>("/trading/update-portfolio", None).await?;
        adapter::decode_valuation(&body)
    }
}
