//! Yahoo Finance API client
//!
//! Prices, chart metadata and the quote-summary modules go through
//! `yahoo_finance_api`, which owns the cookie and crumb handshake. Financial
//! statement history is read from the fundamentals timeseries endpoint,
//! which the connector does not cover.

use super::MarketLookup;
use crate::cache::{CacheKey, LookupCache};
use crate::config::FinanceConfig;
use crate::error::{FinanceError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::num::NonZeroU32;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use yahoo_finance_api as yahoo;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const TIMESERIES_URL: &str =
    "https://query2.finance.yahoo.com/ws/fundamentals-timeseries/v1/finance/timeseries";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) finance-agent/0.1";
const STATEMENT_YEARS: i64 = 6;

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    pub adjclose: f64,
}

/// Ticker metadata used for validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickerInfo {
    pub symbol: String,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    pub country: Option<String>,
}

impl From<yahoo::YMetaData> for TickerInfo {
    fn from(meta: yahoo::YMetaData) -> Self {
        let exchange = [meta.full_exchange_name, meta.exchange_name]
            .into_iter()
            .find(|name| !name.is_empty());
        Self {
            symbol: meta.symbol,
            short_name: meta.short_name,
            long_name: meta.long_name,
            regular_market_price: meta.regular_market_price,
            currency: meta.currency,
            exchange,
            country: None,
        }
    }
}

/// Reporting granularity of financial statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementPeriod {
    Annual,
    Quarterly,
}

impl StatementPeriod {
    /// Prefix of the timeseries type names
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
        }
    }
}

/// Statement line items reported for one period end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementRow {
    pub as_of: NaiveDate,
    /// Line item (`TotalRevenue`, `NetIncome`, ...) to reported value
    pub items: BTreeMap<String, f64>,
}

impl StatementRow {
    pub fn get(&self, item: &str) -> Option<f64> {
        self.items.get(item).copied()
    }
}

/// Upper-cased symbol, `None` unless it only uses characters Yahoo symbols use
///
/// Symbols end up in request paths and queries, so anything else is rejected
/// before a request is built.
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    let symbol = symbol.trim().to_uppercase();
    let valid = !symbol.is_empty()
        && symbol.len() <= 32
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '=' | '^'));
    valid.then_some(symbol)
}

fn checked_symbol(symbol: &str) -> Result<String> {
    normalize_symbol(symbol).ok_or_else(|| FinanceError::InvalidSymbol(symbol.trim().to_string()))
}

fn yahoo_error(e: yahoo::YahooError) -> FinanceError {
    FinanceError::YahooFinanceError(e.to_string())
}

fn is_not_found(error: &yahoo::YahooError) -> bool {
    matches!(
        error,
        yahoo::YahooError::ApiError(message) if message.code.as_deref() == Some("Not Found")
    )
}

/// First quote-summary result as JSON keyed by module name
fn summary_value(symbol: &str, summary: yahoo::YQuoteSummary) -> Result<Value> {
    let unavailable = |reason: String| FinanceError::DataUnavailable {
        symbol: symbol.to_string(),
        reason,
    };

    let Some(quote_summary) = summary.quote_summary else {
        return Err(unavailable("empty quote summary".to_string()));
    };
    if let Some(error) = quote_summary.error {
        return Err(unavailable(
            error
                .description
                .or(error.code)
                .unwrap_or_else(|| "quote summary error".to_string()),
        ));
    }

    let data = quote_summary
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| unavailable("empty quote summary".to_string()))?;
    Ok(serde_json::to_value(data)?)
}

/// Group timeseries entries by period end, most recent first
pub fn parse_timeseries(body: &Value, period: StatementPeriod) -> Vec<StatementRow> {
    let mut rows: BTreeMap<NaiveDate, BTreeMap<String, f64>> = BTreeMap::new();

    let results = body
        .pointer("/timeseries/result")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    for result in results {
        let Some(series) = result.pointer("/meta/type/0").and_then(Value::as_str) else {
            continue;
        };
        let item = series.strip_prefix(period.prefix()).unwrap_or(series);
        let entries = result
            .get(series)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        for entry in entries {
            let as_of = entry
                .get("asOfDate")
                .and_then(Value::as_str)
                .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok());
            let value = entry.pointer("/reportedValue/raw").and_then(Value::as_f64);
            if let (Some(as_of), Some(value)) = (as_of, value) {
                rows.entry(as_of).or_default().insert(item.to_string(), value);
            }
        }
    }

    rows.into_iter()
        .rev()
        .map(|(as_of, items)| StatementRow { as_of, items })
        .collect()
}

/// Yahoo Finance API client
#[derive(Clone)]
pub struct YahooFinanceClient {
    connector: Arc<Mutex<yahoo::YahooConnector>>,
    http: Client,
    cache: LookupCache,
    rate_limiter: SharedRateLimiter,
}

impl YahooFinanceClient {
    /// Create a new client from the finance configuration
    pub fn new(config: &FinanceConfig) -> Result<Self> {
        let connector = yahoo::YahooConnector::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(yahoo_error)?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()?;

        let quota = Quota::per_minute(
            NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            connector: Arc::new(Mutex::new(connector)),
            http,
            cache: LookupCache::new(config.info_cache_ttl),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    fn convert_quotes(symbol: &str, quotes: &[yahoo::Quote]) -> Vec<Quote> {
        quotes
            .iter()
            .map(|q| Quote {
                symbol: symbol.to_string(),
                timestamp: DateTime::from_timestamp(q.timestamp, 0).unwrap_or_else(Utc::now),
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                volume: q.volume,
                adjclose: q.adjclose,
            })
            .collect()
    }

    /// Latest daily quotes for a symbol
    pub async fn latest_quotes(&self, symbol: &str) -> Result<Vec<Quote>> {
        let symbol = checked_symbol(symbol)?;
        self.rate_limiter.until_ready().await;

        let response = self
            .connector
            .lock()
            .await
            .get_latest_quotes(&symbol, "1d")
            .await
            .map_err(yahoo_error)?;

        let quotes = response.quotes().map_err(yahoo_error)?;
        Ok(Self::convert_quotes(&symbol, &quotes))
    }

    /// Historical daily quotes between two instants
    pub async fn historical_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Quote>> {
        let symbol = checked_symbol(symbol)?;
        let start_odt = OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| FinanceError::YahooFinanceError(format!("Invalid start timestamp: {e}")))?;
        let end_odt = OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| FinanceError::YahooFinanceError(format!("Invalid end timestamp: {e}")))?;

        self.rate_limiter.until_ready().await;
        let response = self
            .connector
            .lock()
            .await
            .get_quote_history(&symbol, start_odt, end_odt)
            .await
            .map_err(yahoo_error)?;

        let quotes = response.quotes().map_err(yahoo_error)?;
        Ok(Self::convert_quotes(&symbol, &quotes))
    }

    /// Historical quotes for a named period (`1mo`, `1y`, `ytd`, ...)
    pub async fn historical_range(&self, symbol: &str, range: &str) -> Result<Vec<Quote>> {
        let end = Utc::now();
        let start = range_start(range, end)?;
        self.historical_quotes(symbol, start, end).await
    }

    /// Historical quotes for an explicit `[start, end)` date range
    pub async fn historical_between(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Quote>> {
        let start = start.and_time(chrono::NaiveTime::MIN).and_utc();
        let end = end.and_time(chrono::NaiveTime::MIN).and_utc();
        if start >= end {
            return Err(FinanceError::InvalidPeriod(format!(
                "start date {} is not before end date {}",
                start.date_naive(),
                end.date_naive()
            )));
        }
        self.historical_quotes(symbol, start, end).await
    }

    /// Chart metadata, `None` when Yahoo does not know the symbol
    async fn chart_meta(&self, symbol: &str) -> Result<Option<yahoo::YMetaData>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .connector
            .lock()
            .await
            .get_quote_range(symbol, "1d", "1d")
            .await;

        match response {
            Ok(response) => response.metadata().map(Some).map_err(yahoo_error),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(yahoo_error(e)),
        }
    }

    /// Quote-summary modules for a symbol
    ///
    /// The object holds `financialData`, `quoteType`, `defaultKeyStatistics`,
    /// `assetProfile` and `summaryDetail`, with plain numeric values.
    pub async fn ticker_summary(&self, symbol: &str) -> Result<Value> {
        let symbol = checked_symbol(symbol)?;
        let key = CacheKey::new(&symbol, "quoteSummary", "");

        self.cache
            .get_or_fetch(key, || async {
                self.rate_limiter.until_ready().await;
                let summary = self
                    .connector
                    .lock()
                    .await
                    .get_ticker_info(&symbol)
                    .await
                    .map_err(yahoo_error)?;
                summary_value(&symbol, summary)
            })
            .await
    }

    /// Statement line items per period end, most recent first
    ///
    /// `items` are timeseries names without the period prefix, such as
    /// `TotalRevenue`.
    pub async fn statements(
        &self,
        symbol: &str,
        period: StatementPeriod,
        items: &[&str],
    ) -> Result<Vec<StatementRow>> {
        let symbol = checked_symbol(symbol)?;
        let types = items
            .iter()
            .map(|item| format!("{}{item}", period.prefix()))
            .collect::<Vec<_>>()
            .join(",");
        let key = CacheKey::new(&symbol, "timeseries", &types);

        let body = self
            .cache
            .get_or_fetch(key, || async {
                let mut url =
                    Url::parse(TIMESERIES_URL).map_err(|e| FinanceError::ApiError(e.to_string()))?;
                url.path_segments_mut()
                    .map_err(|()| FinanceError::ApiError("timeseries URL has no path".to_string()))?
                    .push(&symbol);

                let now = Utc::now();
                let period1 = (now - chrono::Duration::days(365 * STATEMENT_YEARS))
                    .timestamp()
                    .to_string();
                let period2 = now.timestamp().to_string();

                self.rate_limiter.until_ready().await;
                let response = self
                    .http
                    .get(url)
                    .query(&[
                        ("type", types.as_str()),
                        ("period1", period1.as_str()),
                        ("period2", period2.as_str()),
                    ])
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(FinanceError::DataUnavailable {
                        symbol: symbol.clone(),
                        reason: format!("statement request failed: {}", response.status()),
                    });
                }
                Ok(response.json::<Value>().await?)
            })
            .await?;

        Ok(parse_timeseries(&body, period))
    }

    /// Country from the asset profile, if Yahoo returns one
    async fn profile_country(&self, symbol: &str) -> Option<String> {
        match self.ticker_summary(symbol).await {
            Ok(summary) => summary
                .pointer("/assetProfile/country")
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                debug!(symbol, error = %e, "asset profile unavailable");
                None
            }
        }
    }
}

#[async_trait]
impl MarketLookup for YahooFinanceClient {
    async fn ticker_info(&self, symbol: &str) -> Result<Option<TickerInfo>> {
        let Some(symbol) = normalize_symbol(symbol) else {
            return Ok(None);
        };

        let key = CacheKey::new(&symbol, "info", "");
        let cached = self
            .cache
            .get_or_fetch(key, || async {
                let Some(meta) = self.chart_meta(&symbol).await? else {
                    return Ok::<_, FinanceError>(Value::Null);
                };
                let mut info = TickerInfo::from(meta);
                info.country = self.profile_country(&symbol).await;
                Ok(serde_json::to_value(info)?)
            })
            .await?;

        if cached.is_null() {
            warn!(symbol = %symbol, "ticker unknown to Yahoo Finance");
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(cached)?))
    }

    async fn recent_prices(&self, symbol: &str) -> Result<Vec<Quote>> {
        self.latest_quotes(symbol).await
    }
}

/// Start instant for a named period ending at `end`
fn range_start(range: &str, end: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let days = |n: i64| Ok(end - chrono::Duration::days(n));
    match range.trim().to_lowercase().as_str() {
        "1d" => days(1),
        "5d" => days(5),
        "1mo" => days(30),
        "3mo" => days(90),
        "6mo" => days(180),
        "1y" => days(365),
        "2y" => days(730),
        "5y" => days(1825),
        "10y" => days(3650),
        "ytd" => NaiveDate::from_ymd_opt(end.year(), 1, 1)
            .map(|d| d.and_time(chrono::NaiveTime::MIN).and_utc())
            .ok_or_else(|| FinanceError::InvalidPeriod(range.to_string())),
        "max" => days(36500),
        _ => Err(FinanceError::InvalidPeriod(range.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_range_start() {
        let end = DateTime::parse_from_rfc3339("2025-06-15T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!((end - range_start("1y", end).unwrap()).num_days(), 365);
        assert_eq!((end - range_start(" 3MO ", end).unwrap()).num_days(), 90);
        assert_eq!(
            range_start("ytd", end).unwrap().date_naive(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
        );
        assert!(matches!(
            range_start("7w", end),
            Err(FinanceError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_ticker_info_from_chart_meta() {
        let meta = yahoo::YMetaData {
            symbol: "AAPL".to_string(),
            short_name: Some("Apple Inc.".to_string()),
            long_name: Some("Apple Inc.".to_string()),
            regular_market_price: Some(196.45),
            currency: Some("USD".to_string()),
            exchange_name: "NMS".to_string(),
            full_exchange_name: "NasdaqGS".to_string(),
            ..Default::default()
        };
        let info = TickerInfo::from(meta);
        assert_eq!(info.symbol, "AAPL");
        assert_eq!(info.short_name.as_deref(), Some("Apple Inc."));
        assert_eq!(info.regular_market_price, Some(196.45));
        assert_eq!(info.exchange.as_deref(), Some("NasdaqGS"));
        assert!(info.country.is_none());
    }

    #[test]
    fn test_ticker_info_missing_fields() {
        let info = TickerInfo::from(yahoo::YMetaData {
            symbol: "XYZ".to_string(),
            ..Default::default()
        });
        assert_eq!(info.symbol, "XYZ");
        assert!(info.short_name.is_none());
        assert!(info.regular_market_price.is_none());
        assert!(info.exchange.is_none());
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" bbca.jk ").as_deref(), Some("BBCA.JK"));
        assert_eq!(normalize_symbol("^GSPC").as_deref(), Some("^GSPC"));
        assert_eq!(normalize_symbol("EURUSD=X").as_deref(), Some("EURUSD=X"));
        assert_eq!(normalize_symbol("BRK-B").as_deref(), Some("BRK-B"));
        assert_eq!(normalize_symbol("AAPL/../v7"), None);
        assert_eq!(normalize_symbol("AAPL?crumb=x"), None);
        assert_eq!(normalize_symbol("AAPL#frag"), None);
        assert_eq!(normalize_symbol("macro outlook for japan"), None);
        assert_eq!(normalize_symbol("   "), None);
    }

    #[test]
    fn test_summary_value_keeps_module_names() {
        let summary = yahoo::YQuoteSummary::from_json(json!({
            "quoteSummary": {
                "result": [{
                    "assetProfile": {"country": "United States", "sector": "Technology", "companyOfficers": []},
                    "summaryDetail": {"trailingPE": 31.2, "marketCap": 3_000_000_000_000u64},
                    "financialData": {"debtToEquity": 1.5, "returnOnEquity": 1.47},
                    "quoteType": {"longName": "Apple Inc."}
                }],
                "error": null
            }
        }))
        .unwrap();

        let value = summary_value("AAPL", summary).unwrap();
        assert_eq!(value["assetProfile"]["country"], "United States");
        assert_eq!(value["summaryDetail"]["trailingPE"], 31.2);
        assert_eq!(value["quoteType"]["longName"], "Apple Inc.");
        assert_eq!(value["financialData"]["returnOnEquity"], 1.47);
    }

    #[test]
    fn test_summary_value_reports_errors() {
        let summary = yahoo::YQuoteSummary::from_json(json!({
            "quoteSummary": {
                "result": null,
                "error": {"code": "Not Found", "description": "Quote not found for symbol: NOPE"}
            }
        }))
        .unwrap();
        assert!(matches!(
            summary_value("NOPE", summary),
            Err(FinanceError::DataUnavailable { reason, .. }) if reason.contains("Quote not found")
        ));

        let empty = yahoo::YQuoteSummary::from_json(json!({})).unwrap();
        assert!(matches!(
            summary_value("NOPE", empty),
            Err(FinanceError::DataUnavailable { .. })
        ));
    }

    #[test]
    fn test_parse_timeseries_groups_by_period_end() {
        let body = json!({
            "timeseries": {
                "result": [
                    {
                        "meta": {"symbol": ["AAPL"], "type": ["quarterlyTotalRevenue"]},
                        "quarterlyTotalRevenue": [
                            {"asOfDate": "2024-06-30", "reportedValue": {"raw": 85.0, "fmt": "85"}},
                            null,
                            {"asOfDate": "2024-09-30", "reportedValue": {"raw": 94.9, "fmt": "94.9"}}
                        ]
                    },
                    {
                        "meta": {"symbol": ["AAPL"], "type": ["quarterlyNetIncome"]},
                        "quarterlyNetIncome": [
                            {"asOfDate": "2024-09-30", "reportedValue": {"raw": 14.7}}
                        ]
                    },
                    {"meta": {"symbol": ["AAPL"], "type": ["quarterlyFreeCashFlow"]}}
                ],
                "error": null
            }
        });

        let rows = parse_timeseries(&body, StatementPeriod::Quarterly);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].as_of, NaiveDate::from_ymd_opt(2024, 9, 30).unwrap());
        assert_eq!(rows[0].get("TotalRevenue"), Some(94.9));
        assert_eq!(rows[0].get("NetIncome"), Some(14.7));
        assert_eq!(rows[1].get("NetIncome"), None);
        assert!(parse_timeseries(&json!({}), StatementPeriod::Annual).is_empty());
    }

    #[tokio::test]
    async fn test_empty_symbol_has_no_info() {
        let client = YahooFinanceClient::new(&FinanceConfig::default()).unwrap();
        assert!(client.ticker_info("  ").await.unwrap().is_none());
        assert!(client.ticker_info("AAPL/quote?x=1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_symbol_is_rejected_before_request() {
        let client = YahooFinanceClient::new(&FinanceConfig::default()).unwrap();
        assert!(matches!(
            client.ticker_summary("AAPL#x").await,
            Err(FinanceError::InvalidSymbol(_))
        ));
        assert!(matches!(
            client.latest_quotes("a b").await,
            Err(FinanceError::InvalidSymbol(_))
        ));
    }

    #[tokio::test]
    async fn test_inverted_date_range_rejected() {
        let client = YahooFinanceClient::new(&FinanceConfig::default()).unwrap();
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(matches!(
            client.historical_between("AAPL", start, end).await,
            Err(FinanceError::InvalidPeriod(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_ticker_info_live() {
        let client = YahooFinanceClient::new(&FinanceConfig::default()).unwrap();
        let info = client.ticker_info("AAPL").await.unwrap().unwrap();
        assert!(info.short_name.is_some());
        assert!(info.regular_market_price.is_some());
        assert_eq!(info.country.as_deref(), Some("United States"));
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_ticker_summary_live() {
        let client = YahooFinanceClient::new(&FinanceConfig::default()).unwrap();
        let summary = client.ticker_summary("AAPL").await.unwrap();
        assert!(summary["financialData"].is_object());
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_historical_range_live() {
        let client = YahooFinanceClient::new(&FinanceConfig::default()).unwrap();
        let quotes = client.historical_range("AAPL", "3mo").await.unwrap();
        assert!(!quotes.is_empty());
        assert_eq!(quotes[0].symbol, "AAPL");
    }
}
