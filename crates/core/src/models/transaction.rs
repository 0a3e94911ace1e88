use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Type of wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Buy,
    Sell,
    /// Cash added to the wallet (e.g., initial funding)
    Deposit,
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Buy => "buy",
            TransactionType::Sell => "sell",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(TransactionType::Buy),
            "sell" => Ok(TransactionType::Sell),
            "deposit" => Ok(TransactionType::Deposit),
            "withdrawal" => Ok(TransactionType::Withdrawal),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

/// A single entry in the wallet's append-only ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub transaction_type: TransactionType,

    /// Traded symbol; `None` for cash deposits and withdrawals
    pub symbol: Option<String>,

    pub quantity: f64,
    pub price: f64,

    /// USD value of the trade (notional for buys, gross proceeds for sells)
    pub total_amount: f64,

    pub fee: f64,

    /// Non-zero only for sells
    pub realized_pnl: f64,
    pub realized_pnl_percentage: f64,

    pub created_at: DateTime<Utc>,
}

/// Query parameters for the transaction history endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionFilter {
    /// Maximum number of entries, newest first (1..=1000)
    pub limit: u32,
    pub transaction_type: Option<TransactionType>,
}

impl TransactionFilter {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            transaction_type: None,
        }
    }

    pub fn of_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }
}

impl Default for TransactionFilter {
    fn default() -> Self {
        Self::new(50)
    }
}
