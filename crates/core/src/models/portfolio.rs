use serde::{Deserialize, Serialize};

use super::holding::Holding;
use super::transaction::Transaction;

/// Wallet-level valuation as of the last server-side revaluation.
///
/// Returned on its own by `update portfolio values`, and embedded in the
/// portfolio summary.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioValuation {
    /// Cash plus the market value of all holdings
    pub total_portfolio_value: f64,
    pub usd_balance: f64,
    pub total_unrealized_pnl: f64,
    pub total_realized_pnl: f64,
    /// Change in portfolio value since the previous revaluation
    pub daily_pnl: f64,
    /// Realized plus unrealized
    pub total_pnl: f64,
    /// `total_pnl` relative to the initial wallet funding, in percent
    pub total_pnl_percentage: f64,
    /// Largest drop below the initial funding seen so far, in percent
    pub max_drawdown: f64,
    pub win_rate: f64,
}

/// Everything the portfolio page shows, fetched in one call.
///
/// Derived by the Remote Store on demand; never stored on its own. Client-side
/// totals live in [`crate::models::analytics::PortfolioTotals`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub valuation: PortfolioValuation,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub holdings: Vec<Holding>,
    /// Latest ledger entries, newest first
    pub recent_transactions: Vec<Transaction>,
}

impl PortfolioSummary {
    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings
            .iter()
            .find(|h| h.symbol.eq_ignore_ascii_case(symbol))
    }
}
