use std::collections::BTreeMap;

use crate::models::cryptocurrency::MarketQuery;
use crate::models::transaction::TransactionFilter;

/// Logical server resource a cache entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    /// Market listings (`GET /cryptocurrencies/`)
    Cryptocurrencies,
    Wallet,
    Holdings,
    Transactions,
    /// Portfolio summary (`GET /trading/portfolio`)
    Portfolio,
}

impl Resource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Cryptocurrencies => "cryptocurrencies",
            Resource::Wallet => "wallet",
            Resource::Holdings => "holdings",
            Resource::Transactions => "transactions",
            Resource::Portfolio => "portfolio",
        }
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cache key: resource name plus serialized request parameters,
/// e.g. `("cryptocurrencies", {order: asc, search: btc, ...})`.
///
/// Parameters are kept sorted so equal parameter sets always hash equally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    resource: Resource,
    params: BTreeMap<String, String>,
}

impl QueryKey {
    pub fn new(resource: Resource) -> Self {
        Self {
            resource,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Key of one market listing page.
    pub fn market(query: &MarketQuery) -> Self {
        let mut key = Self::new(Resource::Cryptocurrencies)
            .with_param("sortBy", query.sort_by.as_param())
            .with_param("order", query.order.as_param())
            .with_param("skip", query.skip)
            .with_param("limit", query.limit);
        if let Some(term) = &query.search {
            key = key.with_param("search", term.to_lowercase());
        }
        let bounds = [
            ("minMarketCap", query.min_market_cap),
            ("maxMarketCap", query.max_market_cap),
            ("minVolume", query.min_volume),
        ];
        for (name, value) in bounds {
            if let Some(value) = value {
                key = key.with_param(name, value);
            }
        }
        key
    }

    /// Key of one transaction history view.
    pub fn transactions(filter: &TransactionFilter) -> Self {
        let key = Self::new(Resource::Transactions).with_param("limit", filter.limit);
        match filter.transaction_type {
            Some(kind) => key.with_param("type", kind),
            None => key,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

impl From<Resource> for QueryKey {
    fn from(resource: Resource) -> Self {
        QueryKey::new(resource)
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.params.is_empty() {
            return write!(f, "(\"{}\")", self.resource);
        }
        write!(f, "(\"{}\", {{", self.resource)?;
        for (i, (name, value)) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("})")
    }
}
