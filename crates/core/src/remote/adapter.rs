//! Translation between the Remote Store's JSON payloads and the typed models.
//!
//! This is the only module that knows the wire shapes. The backend has served
//! more than one revision of several resources:
//!
//! - decimals arrive as JSON numbers or as strings,
//! - timestamps arrive with or without a UTC offset,
//! - ledger entries name their kind `transaction_type` or `type`,
//! - holdings may carry a null `current_price` / `current_value`,
//! - the market listing is either a paged object or a bare array.
//!
//! All of that is absorbed here so call sites only ever see one shape.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::CoreError;
use crate::models::cryptocurrency::{Cryptocurrency, CryptocurrencyPage, MarketQuery};
use crate::models::holding::Holding;
use crate::models::portfolio::{PortfolioSummary, PortfolioValuation};
use crate::models::trade::{TradeOrder, TradeReceipt};
use crate::models::transaction::{Transaction, TransactionFilter, TransactionType};
use crate::models::wallet::Wallet;

// ── Lenient scalar decoding ─────────────────────────────────────────

fn number_from_value(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("number out of range: {n}")),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| format!("invalid decimal {s:?}: {e}")),
        other => Err(format!("expected a number, got {other}")),
    }
}

fn de_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    number_from_value(&value)
        .map(|n| n.unwrap_or(0.0))
        .map_err(serde::de::Error::custom)
}

fn de_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(d)?;
    number_from_value(&value).map_err(serde::de::Error::custom)
}

/// Parse an RFC 3339 timestamp, or a naive one which is taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!("invalid timestamp: {raw:?}"))
}

fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(d)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

// ── Wire shapes ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct WireWallet {
    id: i64,
    user_id: i64,
    #[serde(deserialize_with = "de_f64")]
    usd_balance: f64,
    #[serde(deserialize_with = "de_f64")]
    total_portfolio_value: f64,
    #[serde(default, deserialize_with = "de_f64")]
    total_profit_loss: f64,
    #[serde(default)]
    total_trades: u32,
    #[serde(default, deserialize_with = "de_f64")]
    win_rate: f64,
    #[serde(deserialize_with = "de_timestamp")]
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub(crate) struct WireHolding {
    #[serde(default)]
    id: i64,
    symbol: String,
    #[serde(deserialize_with = "de_f64")]
    quantity: f64,
    #[serde(deserialize_with = "de_f64")]
    average_buy_price: f64,
    #[serde(default, deserialize_with = "de_opt_f64")]
    current_price: Option<f64>,
    #[serde(deserialize_with = "de_f64")]
    total_cost: f64,
    #[serde(default, deserialize_with = "de_opt_f64")]
    current_value: Option<f64>,
    #[serde(deserialize_with = "de_timestamp")]
    first_purchase_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub(crate) struct WireTransaction {
    id: i64,
    #[serde(alias = "type")]
    transaction_type: String,
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default, deserialize_with = "de_f64")]
    quantity: f64,
    #[serde(default, deserialize_with = "de_f64")]
    price: f64,
    #[serde(deserialize_with = "de_f64")]
    total_amount: f64,
    #[serde(default, deserialize_with = "de_f64")]
    fee: f64,
    #[serde(default, deserialize_with = "de_f64")]
    realized_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    realized_pnl_percentage: f64,
    #[serde(deserialize_with = "de_timestamp")]
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
pub(crate) struct WirePortfolioSummary {
    #[serde(deserialize_with = "de_f64")]
    total_portfolio_value: f64,
    #[serde(deserialize_with = "de_f64")]
    usd_balance: f64,
    #[serde(default, deserialize_with = "de_f64")]
    total_unrealized_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    total_realized_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    daily_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    total_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    total_pnl_percentage: f64,
    #[serde(default, deserialize_with = "de_f64")]
    max_drawdown: f64,
    #[serde(default, deserialize_with = "de_f64")]
    win_rate: f64,
    #[serde(default)]
    total_trades: u32,
    #[serde(default)]
    winning_trades: u32,
    #[serde(default)]
    losing_trades: u32,
    #[serde(default)]
    holdings: Vec<WireHolding>,
    #[serde(default)]
    recent_transactions: Vec<WireTransaction>,
}

#[derive(Deserialize)]
pub(crate) struct WireCryptocurrency {
    symbol: String,
    name: String,
    #[serde(default, deserialize_with = "de_opt_f64")]
    current_price: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    market_cap: Option<f64>,
    #[serde(default)]
    market_cap_rank: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    total_volume: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    price_change_percentage_24h: Option<f64>,
    #[serde(deserialize_with = "de_timestamp")]
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
pub(crate) struct WireCryptocurrencyPage {
    items: Vec<WireCryptocurrency>,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    per_page: Option<u32>,
    #[serde(default)]
    has_next: bool,
    #[serde(default)]
    has_prev: bool,
}

/// Current listing responses are paged; older ones were a bare array.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum WireListing {
    Paged(WireCryptocurrencyPage),
    Bare(Vec<WireCryptocurrency>),
}

#[derive(Deserialize)]
pub(crate) struct WireValuation {
    #[serde(default, deserialize_with = "de_f64")]
    total_portfolio_value: f64,
    #[serde(default, deserialize_with = "de_f64")]
    usd_balance: f64,
    #[serde(default, deserialize_with = "de_f64")]
    total_unrealized_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    total_realized_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    daily_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    total_pnl: f64,
    #[serde(default, deserialize_with = "de_f64")]
    total_pnl_percentage: f64,
    #[serde(default, deserialize_with = "de_f64")]
    max_drawdown: f64,
    #[serde(default, deserialize_with = "de_f64")]
    win_rate: f64,
}

#[derive(Deserialize)]
pub(crate) struct WireTradeReceipt {
    #[serde(default)]
    status: String,
    transaction_id: i64,
    symbol: String,
    #[serde(deserialize_with = "de_f64")]
    quantity: f64,
    #[serde(deserialize_with = "de_f64")]
    price: f64,
    #[serde(deserialize_with = "de_f64")]
    total_amount: f64,
    #[serde(default, deserialize_with = "de_f64")]
    fee: f64,
    #[serde(default, deserialize_with = "de_opt_f64")]
    realized_pnl: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    realized_pnl_percentage: Option<f64>,
    #[serde(default, deserialize_with = "de_f64")]
    remaining_balance: f64,
}

/// Body of `POST /trading/buy` and `POST /trading/sell`.
#[derive(Debug, Serialize, PartialEq)]
pub struct TradeRequestBody<'a> {
    pub symbol: &'a str,
    pub amount: f64,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Value,
}

// ── Wire → model ────────────────────────────────────────────────────

impl From<WireWallet> for Wallet {
    fn from(w: WireWallet) -> Self {
        Wallet {
            id: w.id,
            user_id: w.user_id,
            usd_balance: w.usd_balance,
            total_portfolio_value: w.total_portfolio_value,
            total_profit_loss: w.total_profit_loss,
            total_trades: w.total_trades,
            win_rate: w.win_rate,
            created_at: w.created_at,
        }
    }
}

/// Rebuild a holding from its primary fields. Closed positions yield `None`.
///
/// Price resolution: a positive `current_price` wins; otherwise it is
/// back-derived from `current_value`; a position that was never marked is
/// valued at its average buy price.
pub(crate) fn holding_from_wire(w: WireHolding) -> Option<Holding> {
    if !w.quantity.is_finite() || w.quantity <= 0.0 {
        return None;
    }
    let current_price = match (w.current_price, w.current_value) {
        (Some(price), _) if price > 0.0 => price,
        (_, Some(value)) if value > 0.0 => value / w.quantity,
        _ => w.average_buy_price,
    };
    Some(Holding::reconciled(
        w.id,
        w.symbol,
        w.quantity,
        w.average_buy_price,
        current_price,
        w.total_cost,
        w.first_purchase_at,
    ))
}

pub(crate) fn holdings_from_wire(wire: Vec<WireHolding>) -> Vec<Holding> {
    wire.into_iter().filter_map(holding_from_wire).collect()
}

impl TryFrom<WireTransaction> for Transaction {
    type Error = CoreError;

    fn try_from(w: WireTransaction) -> Result<Self, Self::Error> {
        let transaction_type: TransactionType =
            w.transaction_type.parse().map_err(CoreError::Decode)?;
        Ok(Transaction {
            id: w.id,
            transaction_type,
            symbol: w.symbol.map(|s| s.to_uppercase()),
            quantity: w.quantity,
            price: w.price,
            total_amount: w.total_amount,
            fee: w.fee,
            realized_pnl: w.realized_pnl,
            realized_pnl_percentage: w.realized_pnl_percentage,
            created_at: w.created_at,
        })
    }
}

pub(crate) fn transactions_from_wire(
    wire: Vec<WireTransaction>,
) -> Result<Vec<Transaction>, CoreError> {
    wire.into_iter().map(Transaction::try_from).collect()
}

impl TryFrom<WirePortfolioSummary> for PortfolioSummary {
    type Error = CoreError;

    fn try_from(w: WirePortfolioSummary) -> Result<Self, Self::Error> {
        Ok(PortfolioSummary {
            valuation: PortfolioValuation {
                total_portfolio_value: w.total_portfolio_value,
                usd_balance: w.usd_balance,
                total_unrealized_pnl: w.total_unrealized_pnl,
                total_realized_pnl: w.total_realized_pnl,
                daily_pnl: w.daily_pnl,
                total_pnl: w.total_pnl,
                total_pnl_percentage: w.total_pnl_percentage,
                max_drawdown: w.max_drawdown,
                win_rate: w.win_rate,
            },
            total_trades: w.total_trades,
            winning_trades: w.winning_trades,
            losing_trades: w.losing_trades,
            holdings: holdings_from_wire(w.holdings),
            recent_transactions: transactions_from_wire(w.recent_transactions)?,
        })
    }
}

impl From<WireValuation> for PortfolioValuation {
    fn from(w: WireValuation) -> Self {
        PortfolioValuation {
            total_portfolio_value: w.total_portfolio_value,
            usd_balance: w.usd_balance,
            total_unrealized_pnl: w.total_unrealized_pnl,
            total_realized_pnl: w.total_realized_pnl,
            daily_pnl: w.daily_pnl,
            total_pnl: w.total_pnl,
            total_pnl_percentage: w.total_pnl_percentage,
            max_drawdown: w.max_drawdown,
            win_rate: w.win_rate,
        }
    }
}

impl From<WireTradeReceipt> for TradeReceipt {
    fn from(w: WireTradeReceipt) -> Self {
        TradeReceipt {
            status: w.status,
            transaction_id: w.transaction_id,
            symbol: w.symbol.to_uppercase(),
            quantity: w.quantity,
            price: w.price,
            total_amount: w.total_amount,
            fee: w.fee,
            realized_pnl: w.realized_pnl,
            realized_pnl_percentage: w.realized_pnl_percentage,
            remaining_balance: w.remaining_balance,
        }
    }
}

impl From<WireCryptocurrency> for Cryptocurrency {
    fn from(w: WireCryptocurrency) -> Self {
        Cryptocurrency {
            symbol: w.symbol.to_uppercase(),
            name: w.name,
            current_price: w.current_price.unwrap_or(0.0),
            market_cap: w.market_cap.unwrap_or(0.0),
            rank: w.market_cap_rank,
            volume_24h: w.total_volume.unwrap_or(0.0),
            change_24h_pct: w.price_change_percentage_24h.unwrap_or(0.0),
            last_updated: w.last_updated,
        }
    }
}

pub(crate) fn listing_from_wire(wire: WireListing, query: &MarketQuery) -> CryptocurrencyPage {
    match wire {
        WireListing::Paged(p) => {
            let items: Vec<Cryptocurrency> = p.items.into_iter().map(Into::into).collect();
            CryptocurrencyPage {
                total: p.total.unwrap_or(items.len() as u64),
                page: p.page.unwrap_or(query.skip / query.limit.max(1) + 1),
                per_page: p.per_page.unwrap_or(query.limit),
                has_next: p.has_next,
                has_prev: p.has_prev,
                items,
            }
        }
        WireListing::Bare(list) => {
            let items: Vec<Cryptocurrency> = list.into_iter().map(Into::into).collect();
            CryptocurrencyPage {
                total: u64::from(query.skip) + items.len() as u64,
                page: query.skip / query.limit.max(1) + 1,
                per_page: query.limit,
                has_next: items.len() as u32 >= query.limit,
                has_prev: query.skip > 0,
                items,
            }
        }
    }
}

// ── Payload-level decoding ──────────────────────────────────────────

pub fn decode_wallet(body: &str) -> Result<Wallet, CoreError> {
    let wire: WireWallet = serde_json::from_str(body)?;
    Ok(wire.into())
}

pub fn decode_holdings(body: &str) -> Result<Vec<Holding>, CoreError> {
    let wire: Vec<WireHolding> = serde_json::from_str(body)?;
    Ok(holdings_from_wire(wire))
}

pub fn decode_transactions(body: &str) -> Result<Vec<Transaction>, CoreError> {
    let wire: Vec<WireTransaction> = serde_json::from_str(body)?;
    transactions_from_wire(wire)
}

pub fn decode_portfolio(body: &str) -> Result<PortfolioSummary, CoreError> {
    let wire: WirePortfolioSummary = serde_json::from_str(body)?;
    wire.try_into()
}

pub fn decode_valuation(body: &str) -> Result<PortfolioValuation, CoreError> {
    let wire: WireValuation = serde_json::from_str(body)?;
    Ok(wire.into())
}

pub fn decode_trade_receipt(body: &str) -> Result<TradeReceipt, CoreError> {
    let wire: WireTradeReceipt = serde_json::from_str(body)?;
    Ok(wire.into())
}

pub fn decode_listing(body: &str, query: &MarketQuery) -> Result<CryptocurrencyPage, CoreError> {
    let wire: WireListing = serde_json::from_str(body)?;
    Ok(listing_from_wire(wire, query))
}

// ── Model → wire ────────────────────────────────────────────────────

pub fn trade_path(order: &TradeOrder) -> &'static str {
    match order {
        TradeOrder::Buy { .. } => "/trading/buy",
        TradeOrder::Sell { .. } => "/trading/sell",
    }
}

pub fn trade_body(order: &TradeOrder) -> TradeRequestBody<'_> {
    TradeRequestBody {
        symbol: order.symbol(),
        amount: order.wire_amount(),
    }
}

pub fn market_query_params(query: &MarketQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("skip", query.skip.to_string()),
        ("limit", query.limit.to_string()),
        ("sort_by", query.sort_by.as_param().to_string()),
        ("order", query.order.as_param().to_string()),
    ];
    if let Some(search) = &query.search {
        params.push(("symbol_filter", search.clone()));
    }
    let bounds = [
        ("min_market_cap", query.min_market_cap),
        ("max_market_cap", query.max_market_cap),
        ("min_volume", query.min_volume),
    ];
    params.extend(
        bounds
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v.to_string()))),
    );
    params
}

pub fn transaction_params(filter: &TransactionFilter) -> Vec<(&'static str, String)> {
    let mut params = vec![("limit", filter.limit.to_string())];
    if let Some(kind) = filter.transaction_type {
        params.push(("transaction_type", kind.as_str().to_string()));
    }
    params
}

// ── Error responses ─────────────────────────────────────────────────

/// Map a non-success HTTP status and its body onto the error taxonomy.
///
/// The server's `detail` text is passed through verbatim for 4xx responses;
/// request validation failures (a list of `{msg}` objects) are joined.
pub fn error_from_status(status: u16, body: &str) -> CoreError {
    let message = detail_message(body).unwrap_or_else(|| {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            format!("HTTP {status}")
        } else {
            trimmed.chars().take(200).collect()
        }
    });

    match status {
        401 => CoreError::Authentication(message),
        400..=499 => CoreError::Validation { status, message },
        _ => CoreError::Server { status, message },
    }
}

fn detail_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail {
        Value::String(s) => Some(s),
        Value::Array(items) => {
            let messages: Vec<String> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .map(str::to_string)
                .collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        _ => None,
    }
}
