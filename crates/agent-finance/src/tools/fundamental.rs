//! Tool for fundamental company data
//!
//! Ratios and company facts come from the Yahoo quote summary. Growth rates
//! and the quarterly view come from reported statements, which are fetched
//! best-effort. Anything Yahoo does not report stays `null` in the output
//! rather than failing the analysis.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::api::{StatementPeriod, StatementRow, YahooFinanceClient};
use crate::error::{FinanceError, Result};

const ANNUAL_ITEMS: [&str; 3] = ["TotalRevenue", "NetIncome", "FreeCashFlow"];

const QUARTERLY_ITEMS: [&str; 15] = [
    "TotalRevenue",
    "GrossProfit",
    "OperatingIncome",
    "NetIncome",
    "DilutedEPS",
    "OperatingCashFlow",
    "FreeCashFlow",
    "RepurchaseOfCapitalStock",
    "CashDividendsPaid",
    "CashAndCashEquivalents",
    "TotalDebt",
    "CurrentAssets",
    "CurrentLiabilities",
    "StockholdersEquity",
    "TotalAssets",
];

/// Discount rate used by the DCF model
pub const DISCOUNT_RATE: f64 = 0.1;

/// Long-term growth assumed by the DCF model
pub const DEFAULT_GROWTH_RATE: f64 = 0.03;

const DCF_YEARS: i32 = 5;
const GROWTH_YEARS: usize = 3;

/// Calendar quarter such as `2024Q3`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalQuarter {
    pub year: i32,
    pub quarter: u32,
}

impl FiscalQuarter {
    pub fn new(year: i32, quarter: u32) -> Result<Self> {
        if !(1..=4).contains(&quarter) {
            return Err(FinanceError::InvalidPeriod(format!(
                "quarter must be between 1 and 4, got {quarter}"
            )));
        }
        Ok(Self { year, quarter })
    }

    /// Last calendar day of the quarter
    pub fn end_date(&self) -> Option<NaiveDate> {
        let (month, day) = match self.quarter {
            1 => (3, 31),
            2 => (6, 30),
            3 => (9, 30),
            _ => (12, 31),
        };
        NaiveDate::from_ymd_opt(self.year, month, day)
    }

    fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month0() / 3 + 1 == self.quarter
    }
}

impl fmt::Display for FiscalQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Q{}", self.year, self.quarter)
    }
}

impl FromStr for FiscalQuarter {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || FinanceError::InvalidPeriod(format!("expected YYYYQn, got {s:?}"));
        let upper = s.trim().to_uppercase();
        let (year, quarter) = upper.split_once('Q').ok_or_else(invalid)?;
        let year = year.parse().map_err(|_| invalid())?;
        let quarter = quarter.parse().map_err(|_| invalid())?;
        Self::new(year, quarter)
    }
}

/// Fetches and interprets fundamental data
#[derive(Clone)]
pub struct FundamentalAnalysisTool {
    yahoo_client: YahooFinanceClient,
}

impl FundamentalAnalysisTool {
    /// Create a new fundamental analysis tool
    pub fn new(yahoo_client: YahooFinanceClient) -> Self {
        Self { yahoo_client }
    }

    /// Fundamental snapshot for a company ticker
    pub async fn analyze(&self, company_ticker: &str) -> Result<Value> {
        let summary = self.yahoo_client.ticker_summary(company_ticker).await?;

        if summary["financialData"].is_null() && summary["summaryDetail"].is_null() {
            return Err(FinanceError::DataUnavailable {
                symbol: company_ticker.to_string(),
                reason: "no fundamental data returned".to_string(),
            });
        }

        let annual = self
            .yahoo_client
            .statements(company_ticker, StatementPeriod::Annual, &ANNUAL_ITEMS)
            .await
            .unwrap_or_else(|e| {
                warn!(symbol = company_ticker, error = %e, "annual statements unavailable");
                Vec::new()
            });

        Ok(build_fundamentals(&summary, &annual, Utc::now().date_naive()))
    }

    /// Quarter-over-quarter view of one reported quarter
    pub async fn analyze_quarter(
        &self,
        company_ticker: &str,
        quarter: FiscalQuarter,
    ) -> Result<Value> {
        let rows = self
            .yahoo_client
            .statements(company_ticker, StatementPeriod::Quarterly, &QUARTERLY_ITEMS)
            .await?;

        build_quarterly(&rows, quarter).ok_or_else(|| FinanceError::DataUnavailable {
            symbol: company_ticker.to_string(),
            reason: format!("no statements reported for {quarter}"),
        })
    }
}

fn number(summary: &Value, pointer: &str) -> Option<f64> {
    summary.pointer(pointer).and_then(Value::as_f64)
}

fn text<'a>(summary: &'a Value, pointer: &str) -> Option<&'a str> {
    summary.pointer(pointer).and_then(Value::as_str)
}

/// Compound annual growth in percent over the first `years` values
///
/// `values` is most recent first.
pub fn compound_growth(values: &[f64], years: usize) -> Option<f64> {
    if years < 2 || values.len() < years {
        return None;
    }
    let latest = values[0];
    let earliest = values[years - 1];
    if earliest <= 0.0 || latest <= 0.0 {
        return None;
    }
    let periods = (years - 1) as f64;
    Some(((latest / earliest).powf(1.0 / periods) - 1.0) * 100.0)
}

/// Five-year discounted cash flow with a Gordon terminal value
pub fn discounted_cash_flow(free_cash_flow: f64, growth_rate: f64) -> Option<f64> {
    if !free_cash_flow.is_finite() || growth_rate >= DISCOUNT_RATE {
        return None;
    }
    let projected: f64 = (1..=DCF_YEARS)
        .map(|year| {
            free_cash_flow * (1.0 + growth_rate).powi(year) / (1.0 + DISCOUNT_RATE).powi(year)
        })
        .sum();
    let terminal = free_cash_flow * (1.0 + growth_rate) / (DISCOUNT_RATE - growth_rate);
    Some(projected + terminal / (1.0 + DISCOUNT_RATE).powi(DCF_YEARS))
}

fn level(
    value: Option<f64>,
    threshold: f64,
    above: &'static str,
    otherwise: &'static str,
) -> &'static str {
    match value {
        Some(v) if v > threshold => above,
        Some(_) => otherwise,
        None => "Unknown",
    }
}

fn column(rows: &[StatementRow], item: &str) -> Vec<f64> {
    rows.iter().filter_map(|row| row.get(item)).collect()
}

fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => Some(n / d),
        _ => None,
    }
}

fn percent_change(current: Option<f64>, previous: Option<f64>) -> Option<f64> {
    match (current, previous) {
        (Some(c), Some(p)) if p != 0.0 => Some((c - p) / p.abs() * 100.0),
        _ => None,
    }
}

/// Shape the quote summary and annual statements into the analysis record
///
/// `annual` is most recent first.
pub fn build_fundamentals(summary: &Value, annual: &[StatementRow], today: NaiveDate) -> Value {
    let n = |pointer: &str| number(summary, pointer);

    let revenue_growth = compound_growth(&column(annual, "TotalRevenue"), GROWTH_YEARS);
    let earnings_growth = compound_growth(&column(annual, "NetIncome"), GROWTH_YEARS);

    let free_cash_flow = annual
        .first()
        .and_then(|row| row.get("FreeCashFlow"))
        .or_else(|| n("/financialData/freeCashflow"));
    let dcf = free_cash_flow.and_then(|fcf| discounted_cash_flow(fcf, DEFAULT_GROWTH_RATE));

    let pe = n("/summaryDetail/trailingPE");
    let debt_to_equity = n("/financialData/debtToEquity");
    let roe = n("/financialData/returnOnEquity");

    let last_updated = n("/defaultKeyStatistics/lastFiscalYearEnd")
        .and_then(|ts| DateTime::from_timestamp(ts as i64, 0))
        .map(|dt| dt.format("%Y-%m-%d").to_string());

    json!({
        "Company Name": text(summary, "/quoteType/longName")
            .or_else(|| text(summary, "/quoteType/shortName")),
        "Sector": text(summary, "/assetProfile/sector"),
        "Industry": text(summary, "/assetProfile/industry"),
        "Financial Ratios": {
            "P/E Ratio": pe,
            "Forward P/E": n("/summaryDetail/forwardPE").or_else(|| n("/defaultKeyStatistics/forwardPE")),
            "P/B Ratio": n("/defaultKeyStatistics/priceToBook"),
            "P/S Ratio": n("/summaryDetail/priceToSalesTrailing12Months"),
            "Debt to Equity": debt_to_equity,
            "Current Ratio": n("/financialData/currentRatio"),
            "Quick Ratio": n("/financialData/quickRatio"),
            "ROE": roe,
            "ROA": n("/financialData/returnOnAssets"),
            "Gross Margin": n("/financialData/grossMargins"),
            "Operating Margin": n("/financialData/operatingMargins"),
            "Net Profit Margin": n("/financialData/profitMargins"),
            "Dividend Yield": n("/summaryDetail/dividendYield"),
            "Payout Ratio": n("/summaryDetail/payoutRatio"),
        },
        "Valuation": {
            "Market Cap": n("/summaryDetail/marketCap"),
            "Enterprise Value": n("/defaultKeyStatistics/enterpriseValue"),
            "EV/EBITDA": n("/defaultKeyStatistics/enterpriseToEbitda"),
            "EV/Revenue": n("/defaultKeyStatistics/enterpriseToRevenue"),
        },
        "Growth Rates": {
            "Revenue Growth (3Y)": revenue_growth,
            "Net Income Growth (3Y)": earnings_growth,
            "Revenue Growth (YoY)": n("/financialData/revenueGrowth"),
            "Earnings Growth (YoY)": n("/financialData/earningsGrowth"),
        },
        "DCF Valuation": dcf,
        "Future Estimation": {
            "Next Year EPS Estimate": n("/defaultKeyStatistics/forwardEps"),
            "Analyst Target Price": n("/financialData/targetMeanPrice"),
            "Analyst Recommendation": text(summary, "/financialData/recommendationKey"),
        },
        "Interpretations": {
            "P/E Ratio": level(pe, 25.0, "High", "Moderate"),
            "Debt to Equity": level(debt_to_equity, 2.0, "High Leverage", "Healthy Leverage"),
            "ROE": level(roe, 0.2, "Strong", "Average"),
            "Revenue Growth": level(revenue_growth, 15.0, "High Growth", "Moderate Growth"),
        },
        "Last Updated": last_updated,
        "Data Retrieval Date": today.format("%Y-%m-%d").to_string(),
    })
}

/// Quarterly record for `quarter`, `None` when it was not reported
///
/// `rows` is most recent first; the row after the target quarter is the
/// comparison quarter.
pub fn build_quarterly(rows: &[StatementRow], quarter: FiscalQuarter) -> Option<Value> {
    let position = rows.iter().position(|row| quarter.contains(row.as_of))?;
    let current = &rows[position];
    let previous = rows.get(position + 1);

    let get = |item: &str| current.get(item);
    let prev = |item: &str| previous.and_then(|row| row.get(item));

    let revenue = get("TotalRevenue");
    let net_income = get("NetIncome");
    let cash = get("CashAndCashEquivalents");
    let total_debt = get("TotalDebt");
    let equity = get("StockholdersEquity");

    Some(json!({
        "Quarter": quarter.to_string(),
        "Period End": current.as_of.format("%Y-%m-%d").to_string(),
        "Comparison Period End": previous.map(|row| row.as_of.format("%Y-%m-%d").to_string()),
        "Revenue": revenue,
        "Net Income": net_income,
        "Growth (QoQ)": {
            "Revenue": percent_change(revenue, prev("TotalRevenue")),
            "Net Income": percent_change(net_income, prev("NetIncome")),
        },
        "Margins": {
            "Gross Margin": ratio(get("GrossProfit"), revenue),
            "Operating Margin": ratio(get("OperatingIncome"), revenue),
            "Net Margin": ratio(net_income, revenue),
        },
        "Cash Flow": {
            "Operating Cash Flow": get("OperatingCashFlow"),
            "Free Cash Flow": get("FreeCashFlow"),
            "Share Buyback": get("RepurchaseOfCapitalStock").map(f64::abs),
            "Dividends Paid": get("CashDividendsPaid").map(f64::abs),
        },
        "Balance Sheet": {
            "Cash": cash,
            "Total Debt": total_debt,
            "Net Debt": total_debt.zip(cash).map(|(debt, cash)| debt - cash),
        },
        "EPS": get("DilutedEPS"),
        "Ratios": {
            "Current Ratio": ratio(get("CurrentAssets"), get("CurrentLiabilities")),
            "Debt to Equity": ratio(total_debt, equity),
            "ROE": ratio(net_income, equity),
            "ROA": ratio(net_income, get("TotalAssets")),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn row(date: (i32, u32, u32), items: &[(&str, f64)]) -> StatementRow {
        StatementRow {
            as_of: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            items: items
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn sample_summary() -> Value {
        json!({
            "quoteType": {"longName": "Apple Inc.", "shortName": "Apple"},
            "summaryDetail": {"trailingPE": 31.2, "dividendYield": 0.005, "marketCap": 3.0e12},
            "financialData": {
                "debtToEquity": 1.5,
                "returnOnEquity": 1.47,
                "quickRatio": null,
                "freeCashflow": 90.0,
                "recommendationKey": "buy"
            },
            "assetProfile": {"sector": "Technology", "industry": "Consumer Electronics"},
            "defaultKeyStatistics": {"lastFiscalYearEnd": 1_727_481_600}
        })
    }

    fn sample_annual() -> Vec<StatementRow> {
        vec![
            row((2024, 9, 30), &[("TotalRevenue", 121.0), ("NetIncome", 10.0), ("FreeCashFlow", 100.0)]),
            row((2023, 9, 30), &[("TotalRevenue", 110.0), ("NetIncome", 12.0)]),
            row((2022, 9, 30), &[("TotalRevenue", 100.0), ("NetIncome", 11.0)]),
        ]
    }

    #[test]
    fn test_build_fundamentals() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let record = build_fundamentals(&sample_summary(), &sample_annual(), today);

        assert_eq!(record["Company Name"], "Apple Inc.");
        assert_eq!(record["Financial Ratios"]["P/E Ratio"], 31.2);
        assert!(record["Financial Ratios"]["Quick Ratio"].is_null());
        assert_eq!(record["Valuation"]["Market Cap"], 3.0e12);
        assert_eq!(record["Future Estimation"]["Analyst Recommendation"], "buy");
        assert_eq!(record["Interpretations"]["P/E Ratio"], "High");
        assert_eq!(record["Interpretations"]["Debt to Equity"], "Healthy Leverage");
        assert_eq!(record["Interpretations"]["ROE"], "Strong");
        assert_eq!(record["Interpretations"]["Revenue Growth"], "Moderate Growth");
        assert_eq!(record["Last Updated"], "2024-09-28");
        assert_eq!(record["Data Retrieval Date"], "2025-01-02");

        let dcf = record["DCF Valuation"].as_f64().unwrap();
        assert!((dcf - discounted_cash_flow(100.0, DEFAULT_GROWTH_RATE).unwrap()).abs() < 1e-9);
    }

    #[test]
    fn test_free_cash_flow_falls_back_to_summary() {
        let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let record = build_fundamentals(&sample_summary(), &[], today);

        let dcf = record["DCF Valuation"].as_f64().unwrap();
        assert!((dcf - discounted_cash_flow(90.0, DEFAULT_GROWTH_RATE).unwrap()).abs() < 1e-9);
        assert!(record["Growth Rates"]["Revenue Growth (3Y)"].is_null());
        assert_eq!(record["Interpretations"]["Revenue Growth"], "Unknown");
    }

    #[test]
    fn test_missing_data_is_unknown() {
        let record = build_fundamentals(&json!({}), &[], NaiveDate::from_ymd_opt(2025, 1, 2).unwrap());
        assert_eq!(record["Interpretations"]["P/E Ratio"], "Unknown");
        assert!(record["Company Name"].is_null());
        assert!(record["DCF Valuation"].is_null());
    }

    #[test]
    fn test_compound_growth() {
        let growth = compound_growth(&[121.0, 110.0, 100.0], 3).unwrap();
        assert!((growth - 10.0).abs() < 1e-9);
        assert_eq!(compound_growth(&[121.0, 110.0], 3), None);
        assert_eq!(compound_growth(&[121.0, 110.0, -5.0], 3), None);
    }

    #[test]
    fn test_discounted_cash_flow() {
        assert!(discounted_cash_flow(100.0, 0.03).unwrap() > 100.0);
        assert_eq!(discounted_cash_flow(100.0, 0.12), None);
        assert_eq!(discounted_cash_flow(f64::NAN, 0.03), None);
    }

    #[test]
    fn test_fiscal_quarter_parsing() {
        let quarter: FiscalQuarter = "2024q3".parse().unwrap();
        assert_eq!(quarter, FiscalQuarter { year: 2024, quarter: 3 });
        assert_eq!(quarter.to_string(), "2024Q3");
        assert_eq!(quarter.end_date(), NaiveDate::from_ymd_opt(2024, 9, 30));

        assert!(matches!("2024Q5".parse::<FiscalQuarter>(), Err(FinanceError::InvalidPeriod(_))));
        assert!(matches!("Q3".parse::<FiscalQuarter>(), Err(FinanceError::InvalidPeriod(_))));
        assert!(matches!("2024-09".parse::<FiscalQuarter>(), Err(FinanceError::InvalidPeriod(_))));
    }

    #[test]
    fn test_build_quarterly() {
        let rows = vec![
            row((2024, 12, 31), &[("TotalRevenue", 130.0)]),
            row(
                (2024, 9, 30),
                &[
                    ("TotalRevenue", 120.0),
                    ("GrossProfit", 54.0),
                    ("OperatingIncome", 36.0),
                    ("NetIncome", 24.0),
                    ("CashAndCashEquivalents", 30.0),
                    ("TotalDebt", 100.0),
                    ("StockholdersEquity", 50.0),
                    ("TotalAssets", 300.0),
                    ("CurrentAssets", 150.0),
                    ("CurrentLiabilities", 100.0),
                    ("RepurchaseOfCapitalStock", -20.0),
                ],
            ),
            row((2024, 6, 30), &[("TotalRevenue", 100.0), ("NetIncome", 20.0)]),
        ];

        let record = build_quarterly(&rows, FiscalQuarter::new(2024, 3).unwrap()).unwrap();
        assert_eq!(record["Period End"], "2024-09-30");
        assert_eq!(record["Comparison Period End"], "2024-06-30");
        assert_eq!(record["Growth (QoQ)"]["Revenue"], 20.0);
        assert_eq!(record["Growth (QoQ)"]["Net Income"], 20.0);
        assert_eq!(record["Margins"]["Gross Margin"], 0.45);
        assert_eq!(record["Margins"]["Net Margin"], 0.2);
        assert_eq!(record["Balance Sheet"]["Net Debt"], 70.0);
        assert_eq!(record["Cash Flow"]["Share Buyback"], 20.0);
        assert!(record["Cash Flow"]["Dividends Paid"].is_null());
        assert_eq!(record["Ratios"]["Current Ratio"], 1.5);
        assert_eq!(record["Ratios"]["Debt to Equity"], 2.0);
        assert_eq!(record["Ratios"]["ROA"], 0.08);
    }

    #[test]
    fn test_unreported_quarter_is_none() {
        let rows = vec![row((2024, 9, 30), &[("TotalRevenue", 120.0)])];
        assert!(build_quarterly(&rows, FiscalQuarter::new(2023, 1).unwrap()).is_none());

        let record = build_quarterly(&rows, FiscalQuarter::new(2024, 3).unwrap()).unwrap();
        assert!(record["Growth (QoQ)"]["Revenue"].is_null());
        assert!(record["Comparison Period End"].is_null());
    }
}
