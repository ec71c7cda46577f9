//! Per-ticker research reports
//!
//! [`ResearchReporter`] runs the fundamental and macroeconomic procedures
//! for one ticker, plus the quarterly review when a quarter is named, and
//! has the reporter persona combine their findings into one Markdown
//! document. A failed analysis leaves its section marked unavailable; the
//! report only fails when every analysis did.

use agent_llm::LLMProvider;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::agents::{PersonaSet, ReportWriter};
use crate::api::{YahooFinanceClient, yahoo::normalize_symbol};
use crate::config::FinanceConfig;
use crate::error::{FinanceError, Result};
use crate::failure::FailureClassifier;
use crate::procedures::{
    self, AnalysisProcedure, FundamentalInputs, MacroInputs, ProcedureInput, ProcedureSet,
    QuarterlyInputs, QuarterlyProcedure,
};
use crate::prompts::{self, ResearchSection};
use crate::report::AnalysisReport;
use crate::tools::{FiscalQuarter, FundamentalAnalysisTool};
use crate::validator::EntityValidator;

/// A finished research report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchReport {
    pub ticker: String,
    pub quarter: Option<FiscalQuarter>,
    pub markdown: String,
}

impl ResearchReport {
    /// `research_AAPL.md`, or `research_AAPL_2024Q3.md` with a quarter
    pub fn file_name(&self) -> String {
        match self.quarter {
            Some(quarter) => format!("research_{}_{quarter}.md", self.ticker),
            None => format!("research_{}.md", self.ticker),
        }
    }

    /// Write the Markdown into `dir`, creating it when needed
    pub async fn write_to(&self, dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(self.file_name());
        tokio::fs::write(&path, &self.markdown).await?;
        info!(path = %path.display(), "research report written");
        Ok(path)
    }
}

fn section(title: &str, report: AnalysisReport) -> ResearchSection {
    let body = (!FailureClassifier::is_error_message(&report)).then(|| report.into_document_text());
    ResearchSection {
        title: title.to_string(),
        body,
    }
}

/// Builds research reports for single tickers
#[derive(Clone)]
pub struct ResearchReporter {
    validator: EntityValidator,
    fundamental: Arc<dyn AnalysisProcedure>,
    macro_outlook: Arc<dyn AnalysisProcedure>,
    quarterly: Arc<dyn AnalysisProcedure>,
    writer: ReportWriter,
}

impl ResearchReporter {
    pub fn new(
        validator: EntityValidator,
        procedures: &ProcedureSet,
        quarterly: Arc<dyn AnalysisProcedure>,
        writer: ReportWriter,
    ) -> Self {
        Self {
            validator,
            fundamental: procedures.fundamental.clone(),
            macro_outlook: procedures.macro_outlook.clone(),
            quarterly,
            writer,
        }
    }

    /// Reporter sharing the assistant's live procedures
    pub fn live(
        config: &FinanceConfig,
        personas: &PersonaSet,
        provider: Arc<dyn LLMProvider>,
        yahoo: YahooFinanceClient,
        validator: EntityValidator,
        procedures: &ProcedureSet,
    ) -> Result<Self> {
        let quarterly = QuarterlyProcedure::new(
            FundamentalAnalysisTool::new(yahoo),
            ReportWriter::new(&personas.fundamental, provider.clone(), config)?,
        );
        Ok(Self::new(
            validator,
            procedures,
            Arc::new(quarterly),
            ReportWriter::new(&personas.reporter, provider, config)?,
        ))
    }

    /// Research report for `ticker`, optionally reviewing one quarter
    #[instrument(skip(self))]
    pub async fn research(
        &self,
        ticker: &str,
        quarter: Option<FiscalQuarter>,
    ) -> Result<ResearchReport> {
        let ticker = normalize_symbol(ticker)
            .ok_or_else(|| FinanceError::InvalidSymbol(ticker.trim().to_string()))?;
        if !self.validator.is_valid_ticker(&ticker).await {
            return Err(FinanceError::InvalidSymbol(ticker));
        }

        let fundamental_input = ProcedureInput::Fundamental(FundamentalInputs {
            company_ticker: ticker.clone(),
        });
        let macro_input = ProcedureInput::Macro(MacroInputs {
            input: ticker.clone(),
        });
        let quarterly_input = quarter.map(|quarter| {
            ProcedureInput::Quarterly(QuarterlyInputs {
                company_ticker: ticker.clone(),
                quarter,
            })
        });

        let (fundamental, macro_outlook, quarterly) = tokio::join!(
            procedures::invoke(self.fundamental.as_ref(), &fundamental_input),
            procedures::invoke(self.macro_outlook.as_ref(), &macro_input),
            async {
                match &quarterly_input {
                    Some(input) => Some(procedures::invoke(self.quarterly.as_ref(), input).await),
                    None => None,
                }
            },
        );

        let mut sections = vec![section("Fundamental", fundamental)];
        if let Some(report) = quarterly {
            sections.push(section("Quarterly", report));
        }
        sections.push(section("Macroeconomic", macro_outlook));

        if sections.iter().all(|s| s.body.is_none()) {
            return Err(FinanceError::DataUnavailable {
                symbol: ticker,
                reason: "every analysis failed".to_string(),
            });
        }

        let quarter_label = quarter.map(|q| q.to_string());
        let task = prompts::research_task(&ticker, quarter_label.as_deref(), &sections)?;
        let markdown = self.writer.write(&task).await?;

        Ok(ResearchReport {
            ticker,
            quarter,
            markdown,
        })
    }
}
