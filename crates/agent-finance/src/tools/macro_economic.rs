//! Tool for country-level macroeconomic series
//!
//! Accepts either a country name or a stock ticker; a ticker is mapped to the
//! country in its company profile.

use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::econdb::{SeriesPoint, series};
use crate::api::{EconDbClient, MarketLookup};
use crate::countries;
use crate::error::{FinanceError, Result};

/// Fetches GDP, inflation and unemployment for a country
#[derive(Clone)]
pub struct MacroEconomicTool {
    lookup: Arc<dyn MarketLookup>,
    econdb: EconDbClient,
}

impl MacroEconomicTool {
    /// Create a new macro tool
    pub fn new(lookup: Arc<dyn MarketLookup>, econdb: EconDbClient) -> Self {
        Self { lookup, econdb }
    }

    /// Resolve free text to a country code
    ///
    /// The reference table is tried first; only then is the text looked up
    /// as a ticker whose profile country is resolved in turn.
    pub async fn resolve_country_code(&self, input: &str) -> Result<&'static str> {
        let input = input.trim();
        if let Some(code) = countries::country_code(input) {
            return Ok(code);
        }

        let country = self
            .lookup
            .ticker_info(input)
            .await?
            .and_then(|info| info.country)
            .ok_or_else(|| FinanceError::UnresolvedCountry(input.to_string()))?;

        debug!(input, country = country.as_str(), "resolved ticker to country");
        countries::country_code(&country)
            .ok_or_else(|| FinanceError::UnresolvedCountry(format!("unrecognized country: {country}")))
    }

    /// Last five years of the three headline series
    pub async fn analyze(&self, input: &str) -> Result<Value> {
        let code = self.resolve_country_code(input).await?;
        info!(input, code, "fetching macroeconomic series");

        let gdp = self
            .econdb
            .get_recent_series(&format!("{}{code}", series::GDP))
            .await?;
        let inflation = self
            .econdb
            .get_recent_series(&format!("{}{code}", series::CPI))
            .await?;
        let unemployment = self
            .econdb
            .get_recent_series(&format!("{}{code}", series::UNEMPLOYMENT))
            .await?;

        Ok(macro_record(input.trim(), code, &gdp, &inflation, &unemployment))
    }
}

/// Series as a `date -> value` object
fn by_date(points: &[SeriesPoint]) -> Value {
    let map: Map<String, Value> = points
        .iter()
        .map(|p| (p.date.clone(), json!(p.value)))
        .collect();
    Value::Object(map)
}

fn macro_record(
    subject: &str,
    code: &str,
    gdp: &[SeriesPoint],
    inflation: &[SeriesPoint],
    unemployment: &[SeriesPoint],
) -> Value {
    json!({
        "Subject": subject,
        "Country Code": code,
        "GDP": by_date(gdp),
        "Inflation": by_date(inflation),
        "Unemployment": by_date(unemployment),
    })
}
