use crate::models::cryptocurrency::CryptocurrencyPage;
use crate::models::holding::Holding;
use crate::models::portfolio::PortfolioSummary;
use crate::models::transaction::Transaction;
use crate::models::wallet::Wallet;

/// A cached server response.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Cryptocurrencies(CryptocurrencyPage),
    Wallet(Wallet),
    Holdings(Vec<Holding>),
    Transactions(Vec<Transaction>),
    Portfolio(PortfolioSummary),
}

/// Types that can be stored in the query cache.
pub trait Cacheable: Clone + Send + Sync + 'static {
    fn into_cached(self) -> CachedValue;

    /// `None` if the cached value holds a different type.
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

impl Cacheable for CryptocurrencyPage {
    fn into_cached(self) -> CachedValue {
        CachedValue::Cryptocurrencies(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Cryptocurrencies(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl Cacheable for Wallet {
    fn into_cached(self) -> CachedValue {
        CachedValue::Wallet(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Wallet(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl Cacheable for Vec<Holding> {
    fn into_cached(self) -> CachedValue {
        CachedValue::Holdings(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Holdings(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl Cacheable for Vec<Transaction> {
    fn into_cached(self) -> CachedValue {
        CachedValue::Transactions(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Transactions(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl Cacheable for PortfolioSummary {
    fn into_cached(self) -> CachedValue {
        CachedValue::Portfolio(self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Portfolio(v) => Some(v.clone()),
            _ => None,
        }
    }
}
