//! Market and macroeconomic data clients

pub mod econdb;
pub mod yahoo;

pub use econdb::{EconDbClient, SeriesPoint};
pub use yahoo::{Quote, StatementPeriod, StatementRow, TickerInfo, YahooFinanceClient};

use crate::error::Result;
use async_trait::async_trait;

/// Read-only ticker lookups used for entity validation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketLookup: Send + Sync {
    /// Info record for a ticker, `None` when the symbol is unknown
    async fn ticker_info(&self, symbol: &str) -> Result<Option<TickerInfo>>;

    /// Most recent trading-period price rows
    async fn recent_prices(&self, symbol: &str) -> Result<Vec<Quote>>;
}
