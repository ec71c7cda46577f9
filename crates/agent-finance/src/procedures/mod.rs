//! Analysis procedures
//!
//! A procedure turns one named-input bundle into a report: it fetches data
//! through its tool, then has an analyst persona write it up. Procedures
//! return `Result`; [`invoke`] is the boundary where an `Err` becomes an
//! error-marker text report.

mod fundamental;
mod macro_outlook;
mod quarterly;
mod technical;

pub use fundamental::FundamentalProcedure;
pub use macro_outlook::MacroProcedure;
pub use quarterly::QuarterlyProcedure;
pub use technical::TechnicalProcedure;

use agent_llm::LLMProvider;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::agents::{PersonaSet, ReportWriter};
use crate::api::{EconDbClient, MarketLookup, YahooFinanceClient};
use crate::config::FinanceConfig;
use crate::error::{FinanceError, Result};
use crate::report::AnalysisReport;
use crate::tools::{
    FiscalQuarter, FundamentalAnalysisTool, MacroEconomicTool, PriceWindow, TechnicalAnalysisTool,
};

/// Inputs for a fundamental analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundamentalInputs {
    pub company_ticker: String,
}

/// Inputs for a technical analysis
///
/// Either `period` is set and both dates are empty, or both dates are set
/// and `period` is empty. The constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TechnicalInputs {
    stock_symbol: String,
    period: String,
    start_date: String,
    end_date: String,
}

impl TechnicalInputs {
    /// Analyze a named period
    pub fn for_period(stock_symbol: impl Into<String>, period: impl Into<String>) -> Self {
        Self {
            stock_symbol: stock_symbol.into(),
            period: period.into(),
            start_date: String::new(),
            end_date: String::new(),
        }
    }

    /// Analyze an explicit date range
    pub fn for_dates(
        stock_symbol: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            stock_symbol: stock_symbol.into(),
            period: String::new(),
            start_date: start_date.into(),
            end_date: end_date.into(),
        }
    }

    pub fn stock_symbol(&self) -> &str {
        &self.stock_symbol
    }

    /// Empty when a date range is used
    pub fn period(&self) -> &str {
        &self.period
    }

    /// Empty when a period is used
    pub fn start_date(&self) -> &str {
        &self.start_date
    }

    /// Empty when a period is used
    pub fn end_date(&self) -> &str {
        &self.end_date
    }

    /// Price window the technical tool should fetch
    pub fn window(&self) -> Result<PriceWindow> {
        if self.period.is_empty() {
            PriceWindow::from_dates(&self.start_date, &self.end_date)
        } else {
            Ok(PriceWindow::Period(self.period.clone()))
        }
    }
}

/// Inputs for a macroeconomic outlook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroInputs {
    /// Trimmed country name or ticker
    pub input: String,
}

/// Inputs for the review of one reported quarter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarterlyInputs {
    pub company_ticker: String,
    pub quarter: FiscalQuarter,
}

/// Named-input bundle for one procedure call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcedureInput {
    Fundamental(FundamentalInputs),
    Technical(TechnicalInputs),
    Macro(MacroInputs),
    Quarterly(QuarterlyInputs),
}

impl ProcedureInput {
    fn label(&self) -> &'static str {
        match self {
            Self::Fundamental(_) => "fundamental",
            Self::Technical(_) => "technical",
            Self::Macro(_) => "macro",
            Self::Quarterly(_) => "quarterly",
        }
    }
}

impl fmt::Display for ProcedureInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fundamental(i) => write!(f, "fundamental({})", i.company_ticker),
            Self::Technical(i) if i.period.is_empty() => write!(
                f,
                "technical({}, {}..{})",
                i.stock_symbol, i.start_date, i.end_date
            ),
            Self::Technical(i) => write!(f, "technical({}, {})", i.stock_symbol, i.period),
            Self::Macro(i) => write!(f, "macro({})", i.input),
            Self::Quarterly(i) => write!(f, "quarterly({}, {})", i.company_ticker, i.quarter),
        }
    }
}

fn unexpected_input(procedure: &str, input: &ProcedureInput) -> FinanceError {
    FinanceError::Other(format!(
        "{procedure} procedure cannot run with {} inputs",
        input.label()
    ))
}

/// One analysis procedure
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AnalysisProcedure: Send + Sync {
    /// Run the procedure
    async fn run(&self, input: &ProcedureInput) -> Result<AnalysisReport>;
}

/// Run a procedure, folding any error into an error-marker report
pub async fn invoke(procedure: &dyn AnalysisProcedure, input: &ProcedureInput) -> AnalysisReport {
    match procedure.run(input).await {
        Ok(report) => report,
        Err(e) => {
            warn!(%input, error = %e, "analysis procedure failed");
            AnalysisReport::error(e)
        }
    }
}

/// The three procedures the dispatcher routes to
#[derive(Clone)]
pub struct ProcedureSet {
    pub fundamental: Arc<dyn AnalysisProcedure>,
    pub technical: Arc<dyn AnalysisProcedure>,
    pub macro_outlook: Arc<dyn AnalysisProcedure>,
}

impl ProcedureSet {
    /// Procedures backed by Yahoo Finance, EconDB and the completion service
    pub fn live(
        config: &FinanceConfig,
        personas: &PersonaSet,
        provider: Arc<dyn LLMProvider>,
        yahoo: YahooFinanceClient,
        lookup: Arc<dyn MarketLookup>,
    ) -> Result<Self> {
        let econdb = EconDbClient::new(config)?;

        Ok(Self {
            fundamental: Arc::new(FundamentalProcedure::new(
                FundamentalAnalysisTool::new(yahoo.clone()),
                ReportWriter::new(&personas.fundamental, provider.clone(), config)?,
            )),
            technical: Arc::new(TechnicalProcedure::new(
                TechnicalAnalysisTool::new(yahoo),
                ReportWriter::new(&personas.technical, provider.clone(), config)?,
            )),
            macro_outlook: Arc::new(MacroProcedure::new(
                MacroEconomicTool::new(lookup, econdb),
                ReportWriter::new(&personas.macro_outlook, provider, config)?,
            )),
        })
    }
}
