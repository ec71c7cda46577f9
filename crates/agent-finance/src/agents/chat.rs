//! Conversational agents with per-instance history

use agent_llm::{CompletionRequest, LLMError, LLMProvider, Message, ResponseFormat};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::AgentPersona;
use crate::config::FinanceConfig;
use crate::error::Result;
use crate::messages::EMPTY_PROMPT;
use crate::prompts;

/// Anything that answers a prompt with text
///
/// Callers decide what the user sees when the service fails.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Responder: Send {
    async fn respond(&mut self, prompt: &str) -> std::result::Result<String, LLMError>;
}

/// An agent that keeps its own conversation history
///
/// History starts with the persona's system message; every successful query
/// appends the user prompt and the reply.
pub struct ChatAgent {
    name: String,
    provider: Arc<dyn LLMProvider>,
    model: String,
    temperature: f32,
    max_tokens: usize,
    response_format: ResponseFormat,
    history: Vec<Message>,
}

impl std::fmt::Debug for ChatAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatAgent")
            .field("name", &self.name)
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl ChatAgent {
    /// Create an agent from a persona
    pub fn new(
        name: impl Into<String>,
        persona: &AgentPersona,
        provider: Arc<dyn LLMProvider>,
        config: &FinanceConfig,
    ) -> Result<Self> {
        let system_prompt = prompts::persona_prompt(persona)?;
        Ok(Self {
            name: name.into(),
            provider,
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: ResponseFormat::Text,
            history: vec![Message::system(system_prompt)],
        })
    }

    /// Request a response style other than free text
    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = format;
        self
    }

    /// Agent name, used in logs
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full history, system message first
    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Drop everything but the system message
    pub fn reset(&mut self) {
        self.history.truncate(1);
    }

    /// Send a prompt with the full history and record the exchange
    ///
    /// An empty prompt is answered locally. On failure the prompt is removed
    /// from history again.
    #[instrument(skip(self, prompt), fields(agent = %self.name))]
    pub async fn query(&mut self, prompt: &str) -> std::result::Result<String, LLMError> {
        if prompt.trim().is_empty() {
            return Ok(EMPTY_PROMPT.to_string());
        }

        self.history.push(Message::user(prompt));
        let request = CompletionRequest::builder(&self.model)
            .messages(self.history.clone())
            .max_tokens(self.max_tokens)
            .temperature(self.temperature)
            .response_format(self.response_format)
            .build();

        match self.provider.complete(request).await {
            Ok(response) => {
                let reply = response.text().to_string();
                debug!(tokens = response.usage.total(), "agent replied");
                self.history.push(Message::assistant(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }
}

#[async_trait]
impl Responder for ChatAgent {
    async fn respond(&mut self, prompt: &str) -> std::result::Result<String, LLMError> {
        self.query(prompt).await.inspect_err(|e| {
            warn!(agent = %self.name, error = %e, "completion failed");
        })
    }
}
