use serde::{Deserialize, Serialize};

/// Aggregates over a set of holdings, recomputed on every read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PortfolioTotals {
    /// Sum of cost bases
    pub invested: f64,

    /// Sum of current market values
    pub current_value: f64,

    /// `current_value - invested`
    pub unrealized_pnl: f64,

    /// `unrealized_pnl / invested * 100`, or 0 with nothing invested
    pub unrealized_pnl_percentage: f64,

    /// Holding with the highest unrealized return, if any
    pub best_performer: Option<Performer>,

    /// Holding with the lowest unrealized return, if any
    pub worst_performer: Option<Performer>,

    pub holdings_count: usize,
}

/// A holding singled out by its unrealized return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performer {
    pub symbol: String,
    pub unrealized_pnl: f64,
    pub unrealized_pnl_percentage: f64,
}

/// One slice of the allocation chart: cash or a single holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    /// Symbol, or "USD" for the cash slice
    pub label: String,
    pub value: f64,
    /// Share of the total portfolio value, in percent
    pub percentage: f64,
}
