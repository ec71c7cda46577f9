use async_trait::async_trait;
use tracing::info;

use super::{AnalysisProcedure, ProcedureInput, unexpected_input};
use crate::agents::ReportWriter;
use crate::error::Result;
use crate::prompts;
use crate::report::AnalysisReport;
use crate::tools::FundamentalAnalysisTool;

/// Quarterly statements plus an analyst review
pub struct QuarterlyProcedure {
    tool: FundamentalAnalysisTool,
    writer: ReportWriter,
}

impl QuarterlyProcedure {
    pub fn new(tool: FundamentalAnalysisTool, writer: ReportWriter) -> Self {
        Self { tool, writer }
    }
}

#[async_trait]
impl AnalysisProcedure for QuarterlyProcedure {
    async fn run(&self, input: &ProcedureInput) -> Result<AnalysisReport> {
        let ProcedureInput::Quarterly(inputs) = input else {
            return Err(unexpected_input("quarterly", input));
        };

        let quarter = inputs.quarter.to_string();
        info!(ticker = inputs.company_ticker.as_str(), %quarter, "running quarterly review");
        let data = self
            .tool
            .analyze_quarter(&inputs.company_ticker, inputs.quarter)
            .await?;
        let task = prompts::quarterly_task(&inputs.company_ticker, &quarter, &data)?;
        let body = self.writer.write(&task).await?;

        Ok(AnalysisReport::Structured {
            body: Some(body),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentPersona;
    use crate::api::YahooFinanceClient;
    use crate::config::FinanceConfig;
    use crate::error::FinanceError;
    use crate::procedures::FundamentalInputs;
    use crate::testing::ScriptedProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_rejects_other_inputs() {
        let config = FinanceConfig::default();
        let procedure = QuarterlyProcedure::new(
            FundamentalAnalysisTool::new(YahooFinanceClient::new(&config).unwrap()),
            ReportWriter::new(
                &AgentPersona::fundamental_analyst(),
                Arc::new(ScriptedProvider::new(Vec::<&str>::new())),
                &config,
            )
            .unwrap(),
        );

        let input = ProcedureInput::Fundamental(FundamentalInputs {
            company_ticker: "AAPL".to_string(),
        });
        assert!(matches!(
            procedure.run(&input).await,
            Err(FinanceError::Other(message)) if message.contains("quarterly")
        ));
    }
}
