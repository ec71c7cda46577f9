//! Financial analysis assistant
//!
//! Routes free-text requests to fundamental, technical and macroeconomic
//! analysis procedures or to a conversational agent, then summarizes the
//! results into one reply.
//!
//! # Pipeline
//!
//! - The intent router agent classifies the request into an [`IntentBatch`]
//!   ([`intent::parse_intent_output`]).
//! - The [`MultiIntentAggregator`] dispatches each supported intent through
//!   the [`IntentDispatcher`], which validates entities with the
//!   [`EntityValidator`] and invokes one [`AnalysisProcedure`].
//! - The [`FailureClassifier`] drops failed results; survivors are joined
//!   and handed to the summarizer agent.
//!
//! All per-user state lives in a [`SessionContext`] passed into every turn.
//!
//! Outside the chat pipeline, the [`ResearchReporter`] writes a standalone
//! Markdown research report for one ticker.
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_finance::{FinanceConfig, FinancialAssistant};
//! use agent_llm::providers::OpenAIProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let provider = Arc::new(OpenAIProvider::from_env()?);
//!     let assistant = FinancialAssistant::live(FinanceConfig::default(), provider)?;
//!     let mut session = assistant.open_session()?;
//!
//!     let reply = assistant
//!         .handle_turn(&mut session, "Fundamental analysis of AAPL")
//!         .await;
//!     println!("{}", reply.text);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod aggregator;
pub mod api;
pub mod assistant;
pub mod cache;
pub mod config;
pub mod countries;
pub mod dispatcher;
pub mod error;
pub mod failure;
pub mod intent;
pub mod markdown;
pub mod messages;
pub mod procedures;
pub mod prompts;
pub mod report;
pub mod research;
pub mod session;
pub mod tools;
pub mod validator;

#[cfg(test)]
mod testing;

pub use agents::{AgentPersona, ChatAgent, PersonaSet, Responder};
pub use aggregator::{AggregatedDocument, MultiIntentAggregator};
pub use assistant::{FinancialAssistant, TurnReply};
pub use config::FinanceConfig;
pub use dispatcher::IntentDispatcher;
pub use error::{FinanceError, IntentParseError, Result};
pub use failure::FailureClassifier;
pub use intent::{ClassifiedIntent, IntentBatch, IntentEntities, IntentKind};
pub use procedures::{AnalysisProcedure, ProcedureInput};
pub use report::AnalysisReport;
pub use research::{ResearchReport, ResearchReporter};
pub use session::{ConversationTurn, SessionContext, TurnRole};
pub use validator::EntityValidator;
