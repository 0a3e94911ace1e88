use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The user's simulated trading account. One per user.
///
/// Created by the first `create wallet` call, mutated server-side by every
/// buy/sell and by portfolio revaluation. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: i64,

    /// Cash available for buys, in USD
    pub usd_balance: f64,

    /// Cash plus the market value of every holding at the last revaluation
    pub total_portfolio_value: f64,

    /// Realized profit/loss accumulated over all sells
    pub total_profit_loss: f64,

    pub total_trades: u32,

    /// Percentage of sells closed at a profit (0–100)
    pub win_rate: f64,

    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Portion of the portfolio value held in crypto rather than cash.
    pub fn invested_value(&self) -> f64 {
        (self.total_portfolio_value - self.usd_balance).max(0.0)
    }
}
