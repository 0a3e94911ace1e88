use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Market data for a single listed cryptocurrency.
///
/// Read-mostly reference data, kept fresh by the polling refresher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cryptocurrency {
    /// Ticker symbol, uppercased (e.g., "BTC")
    pub symbol: String,
    pub name: String,

    /// Last price in USD; 0 when the listing has no price yet
    pub current_price: f64,
    pub market_cap: f64,

    /// Market-cap rank, 1 = largest
    pub rank: Option<u32>,

    pub volume_24h: f64,

    /// 24h price change in percent
    pub change_24h_pct: f64,

    pub last_updated: DateTime<Utc>,
}

/// One page of the market listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CryptocurrencyPage {
    pub items: Vec<Cryptocurrency>,
    pub total: u64,
    pub page: u32,
    pub per_page: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl CryptocurrencyPage {
    /// Find a listing by symbol (case-insensitive).
    pub fn find(&self, symbol: &str) -> Option<&Cryptocurrency> {
        self.items
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
    }
}

/// Field the market listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortField {
    #[default]
    MarketCapRank,
    MarketCap,
    Volume,
    Price,
    Change24h,
    Name,
    Symbol,
}

impl SortField {
    /// Column name understood by the listing endpoint.
    pub fn as_param(&self) -> &'static str {
        match self {
            SortField::MarketCapRank => "market_cap_rank",
            SortField::MarketCap => "market_cap",
            SortField::Volume => "total_volume",
            SortField::Price => "current_price",
            SortField::Change24h => "price_change_percentage_24h",
            SortField::Name => "name",
            SortField::Symbol => "symbol",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Filter/sort/paging parameters of the market listing.
///
/// Each distinct query is its own cache key and its own polling target.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketQuery {
    pub skip: u32,
    /// Page size (1..=1000)
    pub limit: u32,
    pub sort_by: SortField,
    pub order: SortOrder,
    /// Partial symbol match; blank searches are treated as no search
    pub search: Option<String>,
    /// Lower market-cap bound in USD
    pub min_market_cap: Option<f64>,
    /// Upper market-cap bound in USD
    pub max_market_cap: Option<f64>,
    /// Lower 24h volume bound in USD
    pub min_volume: Option<f64>,
}

impl MarketQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sorted_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.order = order;
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into().trim().to_string();
        self.search = if term.is_empty() { None } else { Some(term) };
        self
    }

    pub fn page(mut self, skip: u32, limit: u32) -> Self {
        self.skip = skip;
        self.limit = limit.clamp(1, 1000);
        self
    }

    /// Market-cap range; either side may be open.
    pub fn market_cap_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_market_cap = min.and_then(bound);
        self.max_market_cap = max.and_then(bound);
        self
    }

    pub fn min_volume(mut self, volume: f64) -> Self {
        self.min_volume = bound(volume);
        self
    }
}

// The listing endpoint rejects negative bounds.
fn bound(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

impl Default for MarketQuery {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            sort_by: SortField::default(),
            order: SortOrder::default(),
            search: None,
            min_market_cap: None,
            max_market_cap: None,
            min_volume: None,
        }
    }
}
