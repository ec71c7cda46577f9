//! EconDB API client
//!
//! Country series are addressed as `<INDICATOR><COUNTRY CODE>`, for example
//! `GDPUS`, `CPIJP` or `URATEID`.
//!
//! Rate Limit: anonymous access is heavily throttled; set `ECONDB_API_TOKEN`.

use crate::config::FinanceConfig;
use crate::error::{FinanceError, Result};
use chrono::{Duration, NaiveDate, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const ECONDB_BASE_URL: &str = "https://www.econdb.com/api/series";

/// Years of history kept per series
pub const HISTORY_YEARS: i64 = 5;

/// Country-level series prefixes
pub mod series {
    /// Real gross domestic product
    pub const GDP: &str = "GDP";
    /// Consumer price index
    pub const CPI: &str = "CPI";
    /// Unemployment rate
    pub const UNEMPLOYMENT: &str = "URATE";
}

/// One dated observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Observation date (`YYYY-MM-DD`)
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    data: SeriesData,
}

#[derive(Debug, Deserialize)]
struct SeriesData {
    #[serde(default)]
    dates: Vec<String>,
    #[serde(default)]
    values: Vec<Option<f64>>,
}

/// EconDB API client
#[derive(Clone)]
pub struct EconDbClient {
    client: Client,
    api_token: Option<String>,
    rate_limiter: SharedRateLimiter,
}

impl EconDbClient {
    /// Create a new client from the finance configuration
    pub fn new(config: &FinanceConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let quota = Quota::per_minute(
            NonZeroU32::new(config.rate_limit_per_minute).unwrap_or(NonZeroU32::MIN),
        );

        Ok(Self {
            client,
            api_token: config.econdb_api_token.clone(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    /// Full series, oldest first
    pub async fn get_series(&self, code: &str) -> Result<Vec<SeriesPoint>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{ECONDB_BASE_URL}/{code}/");
        let mut request = self.client.get(&url).query(&[("format", "json")]);
        if let Some(token) = &self.api_token {
            request = request.query(&[("token", token.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FinanceError::ApiError(format!("EconDB request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FinanceError::DataUnavailable {
                symbol: code.to_string(),
                reason: format!("EconDB API error: {}", response.status()),
            });
        }

        let body: SeriesResponse = response
            .json()
            .await
            .map_err(|e| FinanceError::ApiError(format!("Failed to parse EconDB response: {e}")))?;

        let points = to_points(body.data);
        debug!(code, points = points.len(), "fetched EconDB series");
        Ok(points)
    }

    /// Series restricted to the last [`HISTORY_YEARS`] years
    pub async fn get_recent_series(&self, code: &str) -> Result<Vec<SeriesPoint>> {
        let points = self.get_series(code).await?;
        let cutoff = (Utc::now() - Duration::days(365 * HISTORY_YEARS)).date_naive();
        Ok(since(points, cutoff))
    }
}

fn to_points(data: SeriesData) -> Vec<SeriesPoint> {
    data.dates
        .into_iter()
        .zip(data.values)
        .filter_map(|(date, value)| value.map(|value| SeriesPoint { date, value }))
        .collect()
}

/// Keep points dated on or after `cutoff`; unparseable dates are dropped
fn since(points: Vec<SeriesPoint>, cutoff: NaiveDate) -> Vec<SeriesPoint> {
    points
        .into_iter()
        .filter(|p| {
            NaiveDate::parse_from_str(&p.date, "%Y-%m-%d").is_ok_and(|date| date >= cutoff)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_series_response() {
        let raw = r#"{
            "ticker": "GDPID",
            "data": {
                "dates": ["2019-01-01", "2019-04-01", "2019-07-01"],
                "values": [100.5, null, 102.25],
                "status": ["F", "F", "F"]
            }
        }"#;
        let parsed: SeriesResponse = serde_json::from_str(raw).unwrap();
        let points = to_points(parsed.data);
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].date, "2019-07-01");
        assert_eq!(points[1].value, 102.25);
    }

    #[test]
    fn test_since_filters_old_points() {
        let points = vec![
            SeriesPoint { date: "2015-01-01".into(), value: 1.0 },
            SeriesPoint { date: "2021-01-01".into(), value: 2.0 },
            SeriesPoint { date: "garbage".into(), value: 3.0 },
        ];
        let cutoff = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let kept = since(points, cutoff);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].value, 2.0);
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_get_recent_series_live() {
        let client = EconDbClient::new(&FinanceConfig::default()).unwrap();
        let points = client.get_recent_series("GDPUS").await.unwrap();
        assert!(!points.is_empty());
    }
}
