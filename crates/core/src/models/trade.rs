use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Fee the Remote Store charges on every market order (0.1%).
pub const DEFAULT_FEE_RATE: f64 = 0.001;

/// Side of a market order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// A market order, executed immediately at the Remote Store's current price.
///
/// **Units differ by side.** The trade endpoints take a single `amount`
/// field: for a buy it is the USD notional to spend, for a sell it is the
/// quantity of the asset to dispose of. The variants carry the unit in their
/// field name so callers cannot mix them up; both serialize to the same
/// `{symbol, amount}` body.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOrder {
    /// Spend `usd_notional` dollars (fee included) on `symbol`
    Buy { symbol: String, usd_notional: f64 },
    /// Sell `quantity` units of `symbol`
    Sell { symbol: String, quantity: f64 },
}

impl TradeOrder {
    pub fn buy(symbol: impl Into<String>, usd_notional: f64) -> Self {
        TradeOrder::Buy {
            symbol: symbol.into().trim().to_uppercase(),
            usd_notional,
        }
    }

    pub fn sell(symbol: impl Into<String>, quantity: f64) -> Self {
        TradeOrder::Sell {
            symbol: symbol.into().trim().to_uppercase(),
            quantity,
        }
    }

    pub fn side(&self) -> TradeSide {
        match self {
            TradeOrder::Buy { .. } => TradeSide::Buy,
            TradeOrder::Sell { .. } => TradeSide::Sell,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            TradeOrder::Buy { symbol, .. } | TradeOrder::Sell { symbol, .. } => symbol,
        }
    }

    /// The raw `amount` sent on the wire (USD for buys, quantity for sells).
    pub fn wire_amount(&self) -> f64 {
        match self {
            TradeOrder::Buy { usd_notional, .. } => *usd_notional,
            TradeOrder::Sell { quantity, .. } => *quantity,
        }
    }

    /// Reject orders the Remote Store would refuse anyway.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.symbol().is_empty() {
            return Err(CoreError::invalid_input("Symbol must not be empty"));
        }
        let amount = self.wire_amount();
        if !amount.is_finite() || amount <= 0.0 {
            let what = match self.side() {
                TradeSide::Buy => "USD amount",
                TradeSide::Sell => "Quantity",
            };
            return Err(CoreError::invalid_input(format!(
                "{what} must be a positive number, got {amount}"
            )));
        }
        Ok(())
    }

    /// Estimate the fill of this order at `price` with the given fee rate.
    pub fn preview(&self, price: f64, fee_rate: f64) -> Result<TradePreview, CoreError> {
        self.validate()?;
        if !price.is_finite() || price <= 0.0 {
            return Err(CoreError::invalid_input(format!(
                "Cannot preview {} at price {price}",
                self.symbol()
            )));
        }

        let preview = match self {
            TradeOrder::Buy { symbol, usd_notional } => {
                let fee = usd_notional * fee_rate;
                let net = usd_notional - fee;
                TradePreview {
                    side: TradeSide::Buy,
                    symbol: symbol.clone(),
                    price,
                    quantity: net / price,
                    gross_amount: *usd_notional,
                    fee,
                    net_amount: net,
                }
            }
            TradeOrder::Sell { symbol, quantity } => {
                let gross = quantity * price;
                let fee = gross * fee_rate;
                TradePreview {
                    side: TradeSide::Sell,
                    symbol: symbol.clone(),
                    price,
                    quantity: *quantity,
                    gross_amount: gross,
                    fee,
                    net_amount: gross - fee,
                }
            }
        };
        Ok(preview)
    }
}

/// Local estimate of a market order. Display only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradePreview {
    pub side: TradeSide,
    pub symbol: String,
    pub price: f64,
    /// Units received (buy) or sold (sell)
    pub quantity: f64,
    /// Notional spent (buy) or gross proceeds (sell)
    pub gross_amount: f64,
    pub fee: f64,
    /// Cost basis added (buy) or cash credited (sell)
    pub net_amount: f64,
}

/// Confirmation returned by the buy/sell endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub status: String,
    pub transaction_id: i64,
    pub symbol: String,
    pub quantity: f64,
    pub price: f64,
    pub total_amount: f64,
    pub fee: f64,
    /// Present on sells only
    pub realized_pnl: Option<f64>,
    pub realized_pnl_percentage: Option<f64>,
    /// Wallet cash after the trade
    pub remaining_balance: f64,
}
