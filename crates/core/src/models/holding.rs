use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open position in a single cryptocurrency.
///
/// Created on the first buy of a symbol, re-averaged on later buys, reduced
/// on sells and removed once the quantity reaches zero.
///
/// **Invariant**: `current_value == quantity * current_price` and
/// `unrealized_pnl == current_value - total_cost`. Construct through
/// [`Holding::reconciled`] (the wire adapter does) so the derived fields are
/// always recomputed from the primary ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: i64,

    /// Ticker symbol, uppercased (e.g., "BTC")
    pub symbol: String,

    /// Amount of the asset held (always positive)
    pub quantity: f64,

    /// Weighted average price paid per unit
    pub average_buy_price: f64,

    /// Market price at the last server-side refresh
    pub current_price: f64,

    /// Cost basis: total paid for the current quantity, net of fees
    pub total_cost: f64,

    /// `quantity * current_price`
    pub current_value: f64,

    /// `current_value - total_cost`
    pub unrealized_pnl: f64,

    /// `unrealized_pnl / total_cost * 100`, or 0 when the cost basis is 0
    pub unrealized_pnl_percentage: f64,

    pub first_purchase_at: DateTime<Utc>,
}

impl Holding {
    /// Build a holding from its primary fields, deriving value and P&L.
    pub fn reconciled(
        id: i64,
        symbol: impl Into<String>,
        quantity: f64,
        average_buy_price: f64,
        current_price: f64,
        total_cost: f64,
        first_purchase_at: DateTime<Utc>,
    ) -> Self {
        let mut holding = Self {
            id,
            symbol: symbol.into().to_uppercase(),
            quantity,
            average_buy_price,
            current_price,
            total_cost,
            current_value: 0.0,
            unrealized_pnl: 0.0,
            unrealized_pnl_percentage: 0.0,
            first_purchase_at,
        };
        holding.reconcile();
        holding
    }

    /// Recompute the derived fields from quantity, price and cost basis.
    pub fn reconcile(&mut self) {
        self.current_value = self.quantity * self.current_price;
        self.unrealized_pnl = self.current_value - self.total_cost;
        self.unrealized_pnl_percentage = if self.total_cost > 0.0 {
            (self.unrealized_pnl / self.total_cost) * 100.0
        } else {
            0.0
        };
    }

    /// Check the value/P&L invariant within `tolerance` (relative to magnitude).
    pub fn is_consistent(&self, tolerance: f64) -> bool {
        let expected_value = self.quantity * self.current_price;
        let expected_pnl = self.current_value - self.total_cost;
        approx_eq(self.current_value, expected_value, tolerance)
            && approx_eq(self.unrealized_pnl, expected_pnl, tolerance)
    }
}

fn approx_eq(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tolerance * scale
}
