use async_trait::async_trait;
use tracing::info;

use super::{AnalysisProcedure, ProcedureInput, unexpected_input};
use crate::agents::ReportWriter;
use crate::error::Result;
use crate::prompts;
use crate::report::AnalysisReport;
use crate::tools::TechnicalAnalysisTool;

/// Indicator snapshot plus an analyst write-up
pub struct TechnicalProcedure {
    tool: TechnicalAnalysisTool,
    writer: ReportWriter,
}

impl TechnicalProcedure {
    pub fn new(tool: TechnicalAnalysisTool, writer: ReportWriter) -> Self {
        Self { tool, writer }
    }
}

#[async_trait]
impl AnalysisProcedure for TechnicalProcedure {
    async fn run(&self, input: &ProcedureInput) -> Result<AnalysisReport> {
        let ProcedureInput::Technical(inputs) = input else {
            return Err(unexpected_input("technical", input));
        };

        let window = inputs.window()?;
        info!(%input, "running technical analysis");
        let data = self.tool.analyze(inputs.stock_symbol(), &window).await?;
        let task = prompts::technical_task(
            inputs.stock_symbol(),
            inputs.period(),
            inputs.start_date(),
            inputs.end_date(),
            &data,
        )?;
        let body = self.writer.write(&task).await?;

        Ok(AnalysisReport::Structured {
            body: Some(body),
            data,
        })
    }
}
