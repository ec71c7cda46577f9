use async_trait::async_trait;
use tracing::info;

use super::{AnalysisProcedure, ProcedureInput, unexpected_input};
use crate::agents::ReportWriter;
use crate::error::Result;
use crate::prompts;
use crate::report::AnalysisReport;
use crate::tools::FundamentalAnalysisTool;

/// Fundamental data plus an analyst write-up
pub struct FundamentalProcedure {
    tool: FundamentalAnalysisTool,
    writer: ReportWriter,
}

impl FundamentalProcedure {
    pub fn new(tool: FundamentalAnalysisTool, writer: ReportWriter) -> Self {
        Self { tool, writer }
    }
}

#[async_trait]
impl AnalysisProcedure for FundamentalProcedure {
    async fn run(&self, input: &ProcedureInput) -> Result<AnalysisReport> {
        let ProcedureInput::Fundamental(inputs) = input else {
            return Err(unexpected_input("fundamental", input));
        };

        info!(ticker = inputs.company_ticker.as_str(), "running fundamental analysis");
        let data = self.tool.analyze(&inputs.company_ticker).await?;
        let task = prompts::fundamental_task(&inputs.company_ticker, &data)?;
        let body = self.writer.write(&task).await?;

        Ok(AnalysisReport::Structured {
            body: Some(body),
            data,
        })
    }
}
