//! Entity validation against live market data and the country table
//!
//! Every check is a plain boolean. Lookup failures are logged and count as
//! invalid.

use crate::api::MarketLookup;
use crate::countries;
use std::sync::Arc;
use tracing::{debug, warn};

/// Validates tickers, companies and countries
#[derive(Clone)]
pub struct EntityValidator {
    lookup: Arc<dyn MarketLookup>,
}

impl EntityValidator {
    /// Create a validator over a market lookup
    pub fn new(lookup: Arc<dyn MarketLookup>) -> Self {
        Self { lookup }
    }

    /// A ticker is valid when it has a short name, a current price and at
    /// least one recent price row
    pub async fn is_valid_ticker(&self, symbol: &str) -> bool {
        let info = match self.lookup.ticker_info(symbol).await {
            Ok(Some(info)) => info,
            Ok(None) => {
                debug!(symbol, "no info record");
                return false;
            }
            Err(e) => {
                warn!(symbol, error = %e, "ticker info lookup failed");
                return false;
            }
        };

        if info.short_name.is_none() || info.regular_market_price.is_none() {
            debug!(symbol, "info record lacks name or price");
            return false;
        }

        match self.lookup.recent_prices(symbol).await {
            Ok(rows) => !rows.is_empty(),
            Err(e) => {
                warn!(symbol, error = %e, "recent price lookup failed");
                false
            }
        }
    }

    /// A company is valid when its info record names a country
    pub async fn is_valid_company(&self, candidate: &str) -> bool {
        match self.lookup.ticker_info(candidate).await {
            Ok(Some(info)) => info.country.is_some(),
            Ok(None) => false,
            Err(e) => {
                warn!(candidate, error = %e, "company lookup failed");
                false
            }
        }
    }

    /// Whether the text names a country in the reference table
    pub fn is_valid_country(&self, candidate: &str) -> bool {
        countries::is_known_country(candidate)
    }

    /// Macro subjects may be a country or a company
    pub async fn is_valid_macro_input(&self, candidate: &str) -> bool {
        self.is_valid_country(candidate) || self.is_valid_company(candidate).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{MockMarketLookup, Quote, TickerInfo};
    use crate::error::FinanceError;
    use chrono::Utc;

    fn info(symbol: &str) -> TickerInfo {
        TickerInfo {
            symbol: symbol.to_string(),
            short_name: Some("Apple Inc.".to_string()),
            regular_market_price: Some(190.0),
            country: Some("United States".to_string()),
            ..Default::default()
        }
    }

    fn quote(symbol: &str) -> Quote {
        Quote {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 100,
            adjclose: 1.0,
        }
    }

    fn validator(lookup: MockMarketLookup) -> EntityValidator {
        EntityValidator::new(Arc::new(lookup))
    }

    #[tokio::test]
    async fn test_valid_ticker() {
        let mut lookup = MockMarketLookup::new();
        lookup
            .expect_ticker_info()
            .returning(|s| Ok(Some(info(s))));
        lookup
            .expect_recent_prices()
            .returning(|s| Ok(vec![quote(s)]));

        assert!(validator(lookup).is_valid_ticker("AAPL").await);
    }

    #[tokio::test]
    async fn test_null_price_is_invalid() {
        let mut lookup = MockMarketLookup::new();
        lookup.expect_ticker_info().returning(|s| {
            Ok(Some(TickerInfo {
                regular_market_price: None,
                ..info(s)
            }))
        });
        lookup.expect_recent_prices().never();

        assert!(!validator(lookup).is_valid_ticker("AAPL").await);
    }

    #[tokio::test]
    async fn test_empty_history_is_invalid() {
        let mut lookup = MockMarketLookup::new();
        lookup
            .expect_ticker_info()
            .returning(|s| Ok(Some(info(s))));
        lookup.expect_recent_prices().returning(|_| Ok(vec![]));

        assert!(!validator(lookup).is_valid_ticker("AAPL").await);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_invalid() {
        let mut lookup = MockMarketLookup::new();
        lookup
            .expect_ticker_info()
            .returning(|_| Err(FinanceError::ApiError("timeout".to_string())));

        let validator = validator(lookup);
        assert!(!validator.is_valid_ticker("AAPL").await);
        assert!(!validator.is_valid_company("AAPL").await);
    }

    #[tokio::test]
    async fn test_macro_input_accepts_country_without_lookup() {
        let mut lookup = MockMarketLookup::new();
        lookup.expect_ticker_info().never();

        assert!(validator(lookup).is_valid_macro_input("indonesia").await);
    }

    #[tokio::test]
    async fn test_macro_input_falls_back_to_company_country() {
        let mut lookup = MockMarketLookup::new();
        lookup
            .expect_ticker_info()
            .returning(|s| Ok(Some(info(s))));

        assert!(validator(lookup).is_valid_macro_input("AAPL").await);
    }

    #[tokio::test]
    async fn test_company_without_country_is_invalid() {
        let mut lookup = MockMarketLookup::new();
        lookup.expect_ticker_info().returning(|s| {
            Ok(Some(TickerInfo {
                country: None,
                ..info(s)
            }))
        });

        assert!(!validator(lookup).is_valid_macro_input("XYZ").await);
    }
}
