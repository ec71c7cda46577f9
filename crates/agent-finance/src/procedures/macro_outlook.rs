use async_trait::async_trait;
use tracing::info;

use super::{AnalysisProcedure, ProcedureInput, unexpected_input};
use crate::agents::ReportWriter;
use crate::error::Result;
use crate::prompts;
use crate::report::AnalysisReport;
use crate::tools::MacroEconomicTool;

/// Country series plus an economist write-up
pub struct MacroProcedure {
    tool: MacroEconomicTool,
    writer: ReportWriter,
}

impl MacroProcedure {
    pub fn new(tool: MacroEconomicTool, writer: ReportWriter) -> Self {
        Self { tool, writer }
    }
}

#[async_trait]
impl AnalysisProcedure for MacroProcedure {
    async fn run(&self, input: &ProcedureInput) -> Result<AnalysisReport> {
        let ProcedureInput::Macro(inputs) = input else {
            return Err(unexpected_input("macro", input));
        };

        info!(subject = inputs.input.as_str(), "running macroeconomic analysis");
        let data = self.tool.analyze(&inputs.input).await?;
        let task = prompts::macro_task(&inputs.input, &data)?;
        let body = self.writer.write(&task).await?;

        Ok(AnalysisReport::Structured {
            body: Some(body),
            data,
        })
    }
}
