//! Technical indicator snapshot for one symbol
//!
//! Indicators come from `ta`. Rolling statistics that `ta` lacks (support,
//! resistance, volume average, volatility) are computed over plain slices.

use chrono::NaiveDate;
use serde_json::{Value, json};
use ta::indicators::{
    AverageTrueRange, BollingerBands, ExponentialMovingAverage, FastStochastic,
    MovingAverageConvergenceDivergence, OnBalanceVolume, RelativeStrengthIndex,
    SimpleMovingAverage,
};
use ta::{DataItem, Next};
use tracing::debug;

use crate::api::{Quote, YahooFinanceClient};
use crate::error::{FinanceError, Result};

/// Minimum closes needed before indicators are meaningful
pub const MIN_DATA_POINTS: usize = 30;

const SUPPORT_RESISTANCE_WINDOW: usize = 20;
const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Which slice of history to analyze
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceWindow {
    /// Named period such as `3mo` or `1y`
    Period(String),
    /// Explicit `[start, end)` dates
    Range { start: NaiveDate, end: NaiveDate },
}

impl PriceWindow {
    /// Parse a `YYYY-MM-DD` date pair
    pub fn from_dates(start: &str, end: &str) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map_err(|e| FinanceError::InvalidPeriod(format!("bad date '{s}': {e}")))
        };
        Ok(Self::Range {
            start: parse(start)?,
            end: parse(end)?,
        })
    }
}

/// Fetches price history and computes the indicator snapshot
#[derive(Clone)]
pub struct TechnicalAnalysisTool {
    yahoo_client: YahooFinanceClient,
}

impl TechnicalAnalysisTool {
    /// Create a new technical analysis tool
    pub fn new(yahoo_client: YahooFinanceClient) -> Self {
        Self { yahoo_client }
    }

    /// Indicator snapshot for `symbol` over `window`
    pub async fn analyze(&self, symbol: &str, window: &PriceWindow) -> Result<Value> {
        let quotes = match window {
            PriceWindow::Period(period) => {
                debug!(symbol, period = period.as_str(), "using period");
                self.yahoo_client.historical_range(symbol, period).await?
            }
            PriceWindow::Range { start, end } => {
                debug!(symbol, %start, %end, "using date range");
                self.yahoo_client
                    .historical_between(symbol, *start, *end)
                    .await?
            }
        };

        compute_indicators(symbol, &quotes)
    }
}

fn indicator_err(e: impl std::fmt::Debug) -> FinanceError {
    FinanceError::IndicatorError(format!("{e:?}"))
}

/// Last value of a full-window simple moving average, `None` when too short
fn rolling_mean(values: &[f64], period: usize) -> Result<Option<f64>> {
    if values.len() < period {
        return Ok(None);
    }
    let mut sma = SimpleMovingAverage::new(period).map_err(indicator_err)?;
    Ok(values.iter().map(|&v| sma.next(v)).last())
}

fn last_ema(values: &[f64], period: usize) -> Result<Option<f64>> {
    let mut ema = ExponentialMovingAverage::new(period).map_err(indicator_err)?;
    Ok(values.iter().map(|&v| ema.next(v)).last())
}

fn window_min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

fn window_max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Sample standard deviation of daily returns, annualized
fn annualized_volatility(closes: &[f64]) -> Option<f64> {
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect();
    if returns.len() < 2 {
        return None;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    Some(variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt())
}

fn interpret_rsi(rsi: f64) -> &'static str {
    if rsi > 70.0 {
        "Overbought"
    } else if rsi < 30.0 {
        "Oversold"
    } else {
        "Neutral"
    }
}

fn interpret_stochastic(k: f64) -> &'static str {
    if k > 80.0 {
        "Overbought"
    } else if k < 20.0 {
        "Oversold"
    } else {
        "Neutral"
    }
}

/// Compute the full indicator snapshot from daily bars, oldest first
pub fn compute_indicators(symbol: &str, quotes: &[Quote]) -> Result<Value> {
    if quotes.is_empty() {
        return Err(FinanceError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "No data available for symbol.".to_string(),
        });
    }
    if quotes.len() < MIN_DATA_POINTS {
        return Err(FinanceError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: "Too few data points to compute indicators. Try a longer period.".to_string(),
        });
    }

    let closes: Vec<f64> = quotes.iter().map(|q| q.close).collect();
    let highs: Vec<f64> = quotes.iter().map(|q| q.high).collect();
    let lows: Vec<f64> = quotes.iter().map(|q| q.low).collect();
    let volumes: Vec<f64> = quotes.iter().map(|q| q.volume as f64).collect();

    let bars = quotes
        .iter()
        .map(|q| {
            DataItem::builder()
                .open(q.open)
                .high(q.high)
                .low(q.low)
                .close(q.close)
                .volume(q.volume as f64)
                .build()
                .map_err(indicator_err)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut macd = MovingAverageConvergenceDivergence::new(12, 26, 9).map_err(indicator_err)?;
    let mut rsi = RelativeStrengthIndex::new(14).map_err(indicator_err)?;
    let mut bb = BollingerBands::new(20, 2.0).map_err(indicator_err)?;
    let mut stoch = FastStochastic::new(14).map_err(indicator_err)?;
    let mut percent_d = SimpleMovingAverage::new(3).map_err(indicator_err)?;
    let mut atr = AverageTrueRange::new(14).map_err(indicator_err)?;
    let mut obv = OnBalanceVolume::new();

    let mut macd_out = None;
    let mut rsi_out = 0.0;
    let mut bb_out = None;
    let mut k_out = 0.0;
    let mut d_out = 0.0;
    let mut atr_out = 0.0;
    let mut obv_out = 0.0;
    for (bar, &close) in bars.iter().zip(&closes) {
        macd_out = Some(macd.next(close));
        rsi_out = rsi.next(close);
        bb_out = Some(bb.next(close));
        k_out = stoch.next(bar);
        d_out = percent_d.next(k_out);
        atr_out = atr.next(bar);
        obv_out = obv.next(bar);
    }

    let n = closes.len();
    let current_price = closes[n - 1];
    let current_volume = volumes[n - 1];

    let ma = |period| rolling_mean(&closes, period);
    let (ma20, ma50, ma100, ma200) = (ma(20)?, ma(50)?, ma(100)?, ma(200)?);
    let ema = |period| last_ema(&closes, period);

    let max_price = window_max(&highs).unwrap_or(current_price);
    let min_price = window_min(&lows).unwrap_or(current_price);
    let diff = max_price - min_price;

    let w = SUPPORT_RESISTANCE_WINDOW;
    let support = window_min(&lows[n.saturating_sub(w)..]);
    let resistance = window_max(&highs[n.saturating_sub(w)..]);
    let prev_support = window_min(&lows[n.saturating_sub(w + 1)..n - 1]);
    let prev_resistance = window_max(&highs[n.saturating_sub(w + 1)..n - 1]);
    let breakout = match (prev_support, prev_resistance) {
        (_, Some(r)) if current_price > r => "Bullish Breakout",
        (Some(s), _) if current_price < s => "Bearish Breakdown",
        _ => "No Breakout",
    };

    let trend = match (ma50, ma200) {
        (Some(m50), Some(m200)) if current_price > m200 && m50 > m200 => "Bullish",
        (Some(m50), Some(m200)) if current_price < m200 && m50 < m200 => "Bearish",
        _ => "Neutral",
    };

    let volume_ma = rolling_mean(&volumes, 20)?;
    let volume_above = volume_ma.is_some_and(|avg| current_volume > avg);
    let average_volume = volumes.iter().sum::<f64>() / n as f64;

    let (macd_line, signal_line, histogram) = macd_out
        .map(|m| (m.macd, m.signal, m.histogram))
        .unwrap_or_default();
    let (bb_upper, bb_middle, bb_lower) = bb_out
        .map(|b| (b.upper, b.average, b.lower))
        .unwrap_or_default();

    let bollinger_view = if current_price > bb_upper {
        "Overbought"
    } else if current_price < bb_lower {
        "Oversold"
    } else {
        "Neutral"
    };

    Ok(json!({
        "Symbol": symbol.to_uppercase(),
        "Data_Points": n,
        "Current_Price": current_price,
        "Moving_Averages": {
            "20_MA": ma20,
            "50_MA": ma50,
            "100_MA": ma100,
            "200_MA": ma200,
        },
        "Exponential_MAs": {
            "12_EMA": ema(12)?,
            "26_EMA": ema(26)?,
            "50_EMA": ema(50)?,
            "200_EMA": ema(200)?,
        },
        "MACD": {
            "MACD": macd_line,
            "Signal_Line": signal_line,
            "Histogram": histogram,
        },
        "RSI": rsi_out,
        "Bollinger_Bands": {
            "Upper": bb_upper,
            "Middle": bb_middle,
            "Lower": bb_lower,
        },
        "Stochastic": {
            "%K": k_out,
            "%D": d_out,
        },
        "ATR": atr_out,
        "OBV": obv_out,
        "Fibonacci_Levels": {
            "0%": max_price,
            "23.6%": max_price - 0.236 * diff,
            "38.2%": max_price - 0.382 * diff,
            "50%": max_price - 0.5 * diff,
            "61.8%": max_price - 0.618 * diff,
            "100%": min_price,
        },
        "Support_Resistance": {
            "Support": support,
            "Resistance": resistance,
        },
        "Potential_Breakout": breakout,
        "Trend": trend,
        "Volume": {
            "Current": current_volume,
            "MA": volume_ma,
            "Trend": if volume_above { "Above Average" } else { "Below Average" },
        },
        "Statistics": {
            "Period_High": max_price,
            "Period_Low": min_price,
            "Average_Volume": average_volume,
            "Volatility": annualized_volatility(&closes),
        },
        "Interpretation": {
            "Trend": if ma200.is_some_and(|m| current_price > m) { "Bullish" } else { "Bearish" },
            "RSI": interpret_rsi(rsi_out),
            "MACD": if macd_line > signal_line { "Bullish" } else { "Bearish" },
            "Stochastic": interpret_stochastic(k_out),
            "Bollinger_Bands": bollinger_view,
            "Volume": if volume_above { "High" } else { "Low" },
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn series(closes: &[f64]) -> Vec<Quote> {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Quote {
                symbol: "TEST".to_string(),
                timestamp: start + Duration::days(i as i64),
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 1_000 + i as u64,
                adjclose: close,
            })
            .collect()
    }

    #[test]
    fn test_empty_history() {
        let err = compute_indicators("TEST", &[]).unwrap_err();
        assert!(err.to_string().contains("No data available for symbol."));
    }

    #[test]
    fn test_too_few_points() {
        let quotes = series(&[10.0; 29]);
        let err = compute_indicators("TEST", &quotes).unwrap_err();
        assert!(err.to_string().contains("Too few data points"));
    }

    #[test]
    fn test_uptrend_snapshot() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let snapshot = compute_indicators("test", &series(&closes)).unwrap();

        assert_eq!(snapshot["Symbol"], "TEST");
        assert_eq!(snapshot["Current_Price"], 159.0);
        assert_eq!(snapshot["Data_Points"], 60);
        assert!(snapshot["Moving_Averages"]["50_MA"].is_number());
        assert!(snapshot["Moving_Averages"]["200_MA"].is_null());
        assert_eq!(snapshot["Interpretation"]["MACD"], "Bullish");
        assert_eq!(snapshot["Interpretation"]["RSI"], "Overbought");
        assert_eq!(snapshot["Fibonacci_Levels"]["0%"], 160.0);
        assert_eq!(snapshot["Fibonacci_Levels"]["100%"], 99.0);
        assert_eq!(snapshot["Volume"]["Trend"], "Above Average");
    }

    #[test]
    fn test_breakdown_detected() {
        let mut closes = vec![100.0; 40];
        closes.push(80.0);
        let snapshot = compute_indicators("TEST", &series(&closes)).unwrap();
        assert_eq!(snapshot["Potential_Breakout"], "Bearish Breakdown");
    }

    #[test]
    fn test_price_window_from_dates() {
        let window = PriceWindow::from_dates("2024-01-01", " 2024-06-30 ").unwrap();
        assert_eq!(
            window,
            PriceWindow::Range {
                start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            }
        );
        assert!(matches!(
            PriceWindow::from_dates("01/01/2024", "2024-06-30"),
            Err(FinanceError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn test_volatility_of_flat_series_is_zero() {
        assert_eq!(annualized_volatility(&[5.0, 5.0, 5.0]), Some(0.0));
        assert_eq!(annualized_volatility(&[5.0]), None);
    }
}
