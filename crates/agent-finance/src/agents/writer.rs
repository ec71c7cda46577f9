//! Stateless report writer used by the analysis procedures

use agent_llm::{CompletionRequest, LLMProvider, Message};
use std::sync::Arc;
use tracing::instrument;

use super::AgentPersona;
use crate::config::FinanceConfig;
use crate::error::Result;
use crate::prompts;

/// One persona, one completion per report, no history
#[derive(Clone)]
pub struct ReportWriter {
    system_prompt: String,
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl ReportWriter {
    /// Create a writer for a persona
    pub fn new(
        persona: &AgentPersona,
        provider: Arc<dyn LLMProvider>,
        config: &FinanceConfig,
    ) -> Result<Self> {
        Ok(Self {
            system_prompt: prompts::persona_prompt(persona)?,
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Write a report for a rendered task prompt
    #[instrument(skip_all)]
    pub async fn write(&self, task: &str) -> Result<String> {
        let request = CompletionRequest::builder(&self.model)
            .system(self.system_prompt.clone())
            .add_message(Message::user(task))
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .build();

        let response = self.provider.complete(request).await?;
        Ok(response.text().to_string())
    }
}
