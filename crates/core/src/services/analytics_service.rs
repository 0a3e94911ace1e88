use std::cmp::Ordering;

use crate::models::analytics::{AllocationSlice, PortfolioTotals, Performer};
use crate::models::holding::Holding;
use crate::models::wallet::Wallet;

/// Label of the cash slice in [`AnalyticsService::allocation`].
pub const CASH_LABEL: &str = "USD";

/// Computes portfolio analytics from reconciled holdings: totals,
/// best/worst performer and allocation breakdown.
///
/// Pure and synchronous. Prices are whatever the holdings carry, so the
/// figures are exactly as fresh as the cached holdings they came from.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate invested amount, market value and unrealized P&L.
    pub fn totals(&self, holdings: &[Holding]) -> PortfolioTotals {
        let invested: f64 = holdings.iter().map(|h| h.total_cost).sum();
        let current_value: f64 = holdings.iter().map(|h| h.current_value).sum();
        let unrealized_pnl = current_value - invested;
        let unrealized_pnl_percentage = if invested > 0.0 {
            (unrealized_pnl / invested) * 100.0
        } else {
            0.0
        };

        PortfolioTotals {
            invested,
            current_value,
            unrealized_pnl,
            unrealized_pnl_percentage,
            best_performer: holdings.iter().max_by(by_return).map(performer),
            worst_performer: holdings.iter().min_by(by_return).map(performer),
            holdings_count: holdings.len(),
        }
    }

    /// Cash followed by every holding, largest first, each as a share of
    /// the total portfolio value.
    pub fn allocation(&self, wallet: &Wallet, holdings: &[Holding]) -> Vec<AllocationSlice> {
        let holdings_value: f64 = holdings.iter().map(|h| h.current_value).sum();
        let total = wallet.usd_balance + holdings_value;
        let share = |value: f64| if total > 0.0 { (value / total) * 100.0 } else { 0.0 };

        let mut positions: Vec<AllocationSlice> = holdings
            .iter()
            .map(|h| AllocationSlice {
                label: h.symbol.clone(),
                value: h.current_value,
                percentage: share(h.current_value),
            })
            .collect();
        positions.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));

        let mut slices = Vec::with_capacity(positions.len() + 1);
        slices.push(AllocationSlice {
            label: CASH_LABEL.to_string(),
            value: wallet.usd_balance,
            percentage: share(wallet.usd_balance),
        });
        slices.extend(positions);
        slices
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}

fn by_return(a: &&Holding, b: &&Holding) -> Ordering {
    a.unrealized_pnl_percentage
        .partial_cmp(&b.unrealized_pnl_percentage)
        .unwrap_or(Ordering::Equal)
}

fn performer(holding: &Holding) -> Performer {
    Performer {
        symbol: holding.symbol.clone(),
        unrealized_pnl: holding.unrealized_pnl,
        unrealized_pnl_percentage: holding.unrealized_pnl_percentage,
    }
}
