// ═══════════════════════════════════════════════════════════════════
// Shared test doubles: a simulated Remote Store with a $10,000 wallet,
// the 0.1% trading fee, per-operation call counters and failure injection.
// ═══════════════════════════════════════════════════════════════════

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use trading_sync_core::errors::CoreError;
use trading_sync_core::models::cryptocurrency::{Cryptocurrency, CryptocurrencyPage, MarketQuery};
use trading_sync_core::models::holding::Holding;
use trading_sync_core::models::portfolio::{PortfolioSummary, PortfolioValuation};
use trading_sync_core::models::trade::{TradeOrder, TradeReceipt, DEFAULT_FEE_RATE};
use trading_sync_core::models::transaction::{Transaction, TransactionFilter, TransactionType};
use trading_sync_core::models::wallet::Wallet;
use trading_sync_core::remote::traits::RemoteStore;

pub const STARTING_BALANCE: f64 = 10_000.0;

pub fn ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 12, 0, 0).unwrap()
}

pub fn wallet(usd_balance: f64) -> Wallet {
    Wallet {
        id: 1,
        user_id: 1,
        usd_balance,
        total_portfolio_value: usd_balance,
        total_profit_loss: 0.0,
        total_trades: 0,
        win_rate: 0.0,
        created_at: ts(),
    }
}

pub fn holding(symbol: &str, quantity: f64, avg: f64, price: f64) -> Holding {
    Holding::reconciled(1, symbol, quantity, avg, price, quantity * avg, ts())
}

pub fn listing(symbols: &[(&str, f64)]) -> CryptocurrencyPage {
    let items: Vec<Cryptocurrency> = symbols
        .iter()
        .enumerate()
        .map(|(i, (symbol, price))| coin(symbol, *price, i as u32 + 1))
        .collect();
    CryptocurrencyPage {
        total: items.len() as u64,
        page: 1,
        per_page: 100,
        has_next: false,
        has_prev: false,
        items,
    }
}

fn coin(symbol: &str, price: f64, rank: u32) -> Cryptocurrency {
    Cryptocurrency {
        symbol: symbol.to_string(),
        name: symbol.to_lowercase(),
        current_price: price,
        market_cap: price * 1_000_000.0,
        rank: Some(rank),
        volume_24h: price * 10_000.0,
        change_24h_pct: 0.0,
        last_updated: ts(),
    }
}

// ── Simulated Remote Store ──────────────────────────────────────────

#[derive(Debug, Clone)]
struct Position {
    id: i64,
    quantity: f64,
    total_cost: f64,
    first_purchase_at: DateTime<Utc>,
}

struct SimState {
    wallet: Option<Wallet>,
    positions: BTreeMap<String, Position>,
    ledger: Vec<Transaction>,
    prices: BTreeMap<String, f64>,
    realized_pnl: f64,
    winning_sells: u32,
    losing_sells: u32,
    next_id: i64,
}

/// In-memory stand-in for the trading backend.
pub struct SimulatedStore {
    state: Mutex<SimState>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failures: Mutex<HashMap<&'static str, VecDeque<CoreError>>>,
    listing_delays: Mutex<VecDeque<Duration>>,
    trade_delay: Mutex<Option<Duration>>,
}

impl SimulatedStore {
    /// No wallet yet; prices BTC 50,000 / ETH 2,500 / SOL 100.
    pub fn new() -> Self {
        let prices = [("BTC", 50_000.0), ("ETH", 2_500.0), ("SOL", 100.0)]
            .into_iter()
            .map(|(s, p)| (s.to_string(), p))
            .collect();
        Self {
            state: Mutex::new(SimState {
                wallet: None,
                positions: BTreeMap::new(),
                ledger: Vec::new(),
                prices,
                realized_pnl: 0.0,
                winning_sells: 0,
                losing_sells: 0,
                next_id: 1,
            }),
            calls: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            listing_delays: Mutex::new(VecDeque::new()),
            trade_delay: Mutex::new(None),
        }
    }

    /// Store with a freshly created $10,000 wallet.
    pub fn funded() -> Self {
        let store = Self::new();
        store.state.lock().unwrap().wallet = Some(wallet(STARTING_BALANCE));
        store
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: &'static str, error: CoreError) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Delay the next market listing response by `delay`.
    pub fn delay_next_listing(&self, delay: Duration) {
        self.listing_delays.lock().unwrap().push_back(delay);
    }

    /// Delay the next trade confirmation by `delay`.
    pub fn delay_next_trade(&self, delay: Duration) {
        *self.trade_delay.lock().unwrap() = Some(delay);
    }

    pub fn set_price(&self, symbol: &str, price: f64) {
        self.state
            .lock()
            .unwrap()
            .prices
            .insert(symbol.to_string(), price);
    }

    pub fn usd_balance(&self) -> Option<f64> {
        self.state.lock().unwrap().wallet.as_ref().map(|w| w.usd_balance)
    }

    fn enter(&self, op: &'static str) -> Result<(), CoreError> {
        *self.calls.lock().unwrap().entry(op).or_insert(0) += 1;
        match self.failures.lock().unwrap().get_mut(op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn not_found(message: impl Into<String>) -> CoreError {
    CoreError::Validation {
        status: 404,
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> CoreError {
    CoreError::Validation {
        status: 400,
        message: message.into(),
    }
}

impl SimState {
    fn next_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn price(&self, symbol: &str) -> Result<f64, CoreError> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| not_found(format!("Cryptocurrency {symbol} not found")))
    }

    fn holdings(&self) -> Vec<Holding> {
        self.positions
            .iter()
            .map(|(symbol, p)| {
                let price = self.prices.get(symbol).copied().unwrap_or(0.0);
                Holding::reconciled(
                    p.id,
                    symbol.clone(),
                    p.quantity,
                    p.total_cost / p.quantity,
                    price,
                    p.total_cost,
                    p.first_purchase_at,
                )
            })
            .collect()
    }

    fn valuation(&self) -> Result<PortfolioValuation, CoreError> {
        let wallet = self.wallet.as_ref().ok_or_else(|| not_found("Wallet not found"))?;
        let holdings = self.holdings();
        let unrealized: f64 = holdings.iter().map(|h| h.unrealized_pnl).sum();
        let value: f64 = holdings.iter().map(|h| h.current_value).sum();
        let total_pnl = unrealized + self.realized_pnl;
        let sells = self.winning_sells + self.losing_sells;
        Ok(PortfolioValuation {
            total_portfolio_value: wallet.usd_balance + value,
            usd_balance: wallet.usd_balance,
            total_unrealized_pnl: unrealized,
            total_realized_pnl: self.realized_pnl,
            daily_pnl: 0.0,
            total_pnl,
            total_pnl_percentage: total_pnl / STARTING_BALANCE * 100.0,
            max_drawdown: 0.0,
            win_rate: if sells > 0 {
                self.winning_sells as f64 / sells as f64 * 100.0
            } else {
                0.0
            },
        })
    }

    fn refresh_wallet(&mut self) -> Result<(), CoreError> {
        let valuation = self.valuation()?;
        let realized = self.realized_pnl;
        let trades = (self
            .ledger
            .iter()
            .filter(|t| matches!(t.transaction_type, TransactionType::Buy | TransactionType::Sell))
            .count()) as u32;
        if let Some(wallet) = self.wallet.as_mut() {
            wallet.total_portfolio_value = valuation.total_portfolio_value;
            wallet.total_profit_loss = realized;
            wallet.total_trades = trades;
            wallet.win_rate = valuation.win_rate;
        }
        Ok(())
    }

    fn buy(&mut self, symbol: &str, usd_amount: f64) -> Result<TradeReceipt, CoreError> {
        let balance = self
            .wallet
            .as_ref()
            .map(|w| w.usd_balance)
            .ok_or_else(|| not_found("Wallet not found"))?;
        let price = self.price(symbol)?;
        if usd_amount > balance {
            return Err(bad_request(format!(
                "Insufficient balance. Available: ${balance}, Required: ${usd_amount}"
            )));
        }

        let fee = usd_amount * DEFAULT_FEE_RATE;
        let net = usd_amount - fee;
        let quantity = net / price;
        let position_id = self.next_id();
        let position = self
            .positions
            .entry(symbol.to_string())
            .or_insert(Position {
                id: position_id,
                quantity: 0.0,
                total_cost: 0.0,
                first_purchase_at: ts(),
            });
        position.quantity += quantity;
        position.total_cost += net;

        let remaining = balance - usd_amount;
        if let Some(wallet) = self.wallet.as_mut() {
            wallet.usd_balance = remaining;
        }
        let id = self.next_id();
        self.ledger.push(Transaction {
            id,
            transaction_type: TransactionType::Buy,
            symbol: Some(symbol.to_string()),
            quantity,
            price,
            total_amount: usd_amount,
            fee,
            realized_pnl: 0.0,
            realized_pnl_percentage: 0.0,
            created_at: ts(),
        });
        self.refresh_wallet()?;

        Ok(TradeReceipt {
            status: "success".into(),
            transaction_id: id,
            symbol: symbol.to_string(),
            quantity,
            price,
            total_amount: usd_amount,
            fee,
            realized_pnl: None,
            realized_pnl_percentage: None,
            remaining_balance: remaining,
        })
    }

    fn sell(&mut self, symbol: &str, quantity: f64) -> Result<TradeReceipt, CoreError> {
        if self.wallet.is_none() {
            return Err(not_found("Wallet not found"));
        }
        let price = self.price(symbol)?;
        let available = self.positions.get(symbol).map(|p| p.quantity).unwrap_or(0.0);
        if quantity > available {
            return Err(bad_request(format!(
                "Insufficient {symbol}. Available: {available}, Required: {quantity}"
            )));
        }

        let gross = quantity * price;
        let fee = gross * DEFAULT_FEE_RATE;
        let net = gross - fee;
        let mut cost_portion = 0.0;
        let mut emptied = false;
        if let Some(position) = self.positions.get_mut(symbol) {
            cost_portion = position.total_cost / position.quantity * quantity;
            position.quantity -= quantity;
            position.total_cost -= cost_portion;
            emptied = position.quantity <= 1e-12;
        }
        if emptied {
            self.positions.remove(symbol);
        }

        let realized = net - cost_portion;
        let realized_pct = if cost_portion > 0.0 {
            realized / cost_portion * 100.0
        } else {
            0.0
        };
        self.realized_pnl += realized;
        if realized > 0.0 {
            self.winning_sells += 1;
        } else {
            self.losing_sells += 1;
        }

        let mut remaining = 0.0;
        if let Some(wallet) = self.wallet.as_mut() {
            wallet.usd_balance += net;
            remaining = wallet.usd_balance;
        }
        let id = self.next_id();
        self.ledger.push(Transaction {
            id,
            transaction_type: TransactionType::Sell,
            symbol: Some(symbol.to_string()),
            quantity,
            price,
            total_amount: gross,
            fee,
            realized_pnl: realized,
            realized_pnl_percentage: realized_pct,
            created_at: ts(),
        });
        self.refresh_wallet()?;

        Ok(TradeReceipt {
            status: "success".into(),
            transaction_id: id,
            symbol: symbol.to_string(),
            quantity,
            price,
            total_amount: gross,
            fee,
            realized_pnl: Some(realized),
            realized_pnl_percentage: Some(realized_pct),
            remaining_balance: remaining,
        })
    }
}

#[async_trait]
impl RemoteStore for SimulatedStore {
    fn name(&self) -> &str {
        "Simulated"
    }

    async fn list_cryptocurrencies(
        &self,
        query: &MarketQuery,
    ) -> Result<CryptocurrencyPage, CoreError> {
        self.enter("list_cryptocurrencies")?;
        let delay = self.listing_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock().unwrap();
        let needle = query.search.as_deref().map(str::to_uppercase);
        let matching: Vec<Cryptocurrency> = state
            .prices
            .iter()
            .filter(|(symbol, _)| needle.as_deref().map_or(true, |n| symbol.contains(n)))
            .enumerate()
            .map(|(i, (symbol, price))| coin(symbol, *price, i as u32 + 1))
            .collect();
        let total = matching.len() as u64;
        let items: Vec<Cryptocurrency> = matching
            .into_iter()
            .skip(query.skip as usize)
            .take(query.limit as usize)
            .collect();
        Ok(CryptocurrencyPage {
            has_next: (query.skip as u64 + items.len() as u64) < total,
            has_prev: query.skip > 0,
            page: query.skip / query.limit.max(1) + 1,
            per_page: query.limit,
            total,
            items,
        })
    }

    async fn get_wallet(&self) -> Result<Wallet, CoreError> {
        self.enter("get_wallet")?;
        self.state
            .lock()
            .unwrap()
            .wallet
            .clone()
            .ok_or_else(|| not_found("Wallet not found"))
    }

    async fn create_wallet(&self) -> Result<Wallet, CoreError> {
        self.enter("create_wallet")?;
        let mut state = self.state.lock().unwrap();
        Ok(state.wallet.get_or_insert_with(|| wallet(STARTING_BALANCE)).clone())
    }

    async fn get_holdings(&self) -> Result<Vec<Holding>, CoreError> {
        self.enter("get_holdings")?;
        Ok(self.state.lock().unwrap().holdings())
    }

    async fn get_portfolio(&self) -> Result<PortfolioSummary, CoreError> {
        self.enter("get_portfolio")?;
        let state = self.state.lock().unwrap();
        Ok(PortfolioSummary {
            valuation: state.valuation()?,
            total_trades: state.ledger.len() as u32,
            winning_trades: state.winning_sells,
            losing_trades: state.losing_sells,
            holdings: state.holdings(),
            recent_transactions: state.ledger.iter().rev().take(10).cloned().collect(),
        })
    }

    async fn execute_trade(&self, order: &TradeOrder) -> Result<TradeReceipt, CoreError> {
        self.enter("execute_trade")?;
        let delay = self.trade_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        match order {
            TradeOrder::Buy { symbol, usd_notional } => state.buy(symbol, *usd_notional),
            TradeOrder::Sell { symbol, quantity } => state.sell(symbol, *quantity),
        }
    }

    async fn get_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, CoreError> {
        self.enter("get_transactions")?;
        let state = self.state.lock().unwrap();
        Ok(state
            .ledger
            .iter()
            .rev()
            .filter(|t| filter.transaction_type.map_or(true, |k| t.transaction_type == k))
            .take(filter.limit as usize)
            .cloned()
            .collect())
    }

    async fn update_portfolio(&self) -> Result<PortfolioValuation, CoreError> {
        self.enter("update_portfolio")?;
        let mut state = self.state.lock().unwrap();
        state.refresh_wallet()?;
        state.valuation()
    }
}
