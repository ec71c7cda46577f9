//! Turn orchestration
//!
//! [`FinancialAssistant`] holds no per-session state and can be shared
//! between sessions behind an `Arc`. Each turn runs classification,
//! parsing, aggregation and summarization strictly in sequence.

use agent_llm::LLMProvider;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::agents::PersonaSet;
use crate::aggregator::MultiIntentAggregator;
use crate::api::{MarketLookup, YahooFinanceClient};
use crate::config::FinanceConfig;
use crate::dispatcher::IntentDispatcher;
use crate::error::Result;
use crate::intent::{IntentKind, parse_intent_output};
use crate::messages;
use crate::procedures::ProcedureSet;
use crate::research::ResearchReporter;
use crate::session::{SessionAgents, SessionContext, TurnRole};
use crate::validator::EntityValidator;

/// Outcome of one user turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnReply {
    /// Reply text as produced, before any Markdown cleanup
    pub text: String,
    /// The idle timeout cleared the session before this turn
    pub session_expired: bool,
    /// Session's active intent after the turn
    pub active_intent: Option<IntentKind>,
}

/// The financial assistant
pub struct FinancialAssistant {
    aggregator: MultiIntentAggregator,
    personas: PersonaSet,
    provider: Arc<dyn LLMProvider>,
    config: FinanceConfig,
    research: Option<ResearchReporter>,
}

impl FinancialAssistant {
    pub fn new(
        aggregator: MultiIntentAggregator,
        personas: PersonaSet,
        provider: Arc<dyn LLMProvider>,
        config: FinanceConfig,
    ) -> Self {
        Self {
            aggregator,
            personas,
            provider,
            config,
            research: None,
        }
    }

    /// Attach a research reporter
    pub fn with_research(mut self, reporter: ResearchReporter) -> Self {
        self.research = Some(reporter);
        self
    }

    /// The research reporter, when one is attached
    pub fn research(&self) -> Option<&ResearchReporter> {
        self.research.as_ref()
    }

    /// Assistant backed by Yahoo Finance, EconDB and the given provider
    pub fn live(config: FinanceConfig, provider: Arc<dyn LLMProvider>) -> Result<Self> {
        config.validate()?;

        let personas = PersonaSet::default();
        let yahoo = YahooFinanceClient::new(&config)?;
        let lookup: Arc<dyn MarketLookup> = Arc::new(yahoo.clone());
        let procedures = ProcedureSet::live(
            &config,
            &personas,
            provider.clone(),
            yahoo.clone(),
            lookup.clone(),
        )?;
        let validator = EntityValidator::new(lookup);
        let research = ResearchReporter::live(
            &config,
            &personas,
            provider.clone(),
            yahoo,
            validator.clone(),
            &procedures,
        )?;
        let dispatcher = IntentDispatcher::new(
            validator,
            procedures,
            config.default_technical_period.clone(),
        );

        info!(
            provider = provider.name(),
            model = %config.model,
            "financial assistant ready"
        );
        Ok(Self::new(
            MultiIntentAggregator::new(dispatcher),
            personas,
            provider,
            config,
        )
        .with_research(research))
    }

    pub fn config(&self) -> &FinanceConfig {
        &self.config
    }

    /// Start a fresh session with its own agents
    pub fn open_session(&self) -> Result<SessionContext> {
        let agents = SessionAgents::new(&self.personas, self.provider.clone(), &self.config)?;
        Ok(SessionContext::new(agents, self.config.session_idle_timeout))
    }

    /// Handle one user message
    pub async fn handle_turn(&self, session: &mut SessionContext, prompt: &str) -> TurnReply {
        self.handle_turn_at(session, prompt, Utc::now()).await
    }

    /// [`handle_turn`](Self::handle_turn) with an explicit clock
    #[instrument(skip(self, session, prompt), fields(session = %session.id()))]
    pub async fn handle_turn_at(
        &self,
        session: &mut SessionContext,
        prompt: &str,
        now: DateTime<Utc>,
    ) -> TurnReply {
        let session_expired = session.expire_if_idle(now);

        if prompt.trim().is_empty() {
            session.touch(now);
            return reply(session, messages::EMPTY_PROMPT.to_string(), session_expired);
        }

        session.push_turn(TurnRole::User, prompt);

        let classified = session.agents_mut().intent_router.query(prompt).await;
        let text = match classified {
            Err(e) => {
                warn!(error = %e, "intent classification failed");
                messages::TURN_FAILURE.to_string()
            }
            Ok(raw) => {
                debug!(raw = raw.as_str(), "classifier output");
                match parse_intent_output(&raw) {
                    Err(e) => {
                        warn!(error = %e, "classifier output rejected");
                        messages::PARSE_FAILURE.to_string()
                    }
                    Ok(batch) => {
                        let SessionAgents {
                            conversation,
                            summarizer,
                            ..
                        } = session.agents_mut();
                        let outcome = self
                            .aggregator
                            .aggregate(&batch, prompt, conversation, summarizer)
                            .await;
                        session.set_active_intent(outcome.active_intent);
                        outcome.reply
                    }
                }
            }
        };

        session.push_turn(TurnRole::Assistant, text.as_str());
        session.touch(now);
        reply(session, text, session_expired)
    }
}

fn reply(session: &SessionContext, text: String, session_expired: bool) -> TurnReply {
    TurnReply {
        text,
        session_expired,
        active_intent: session.active_intent().map(|intent| intent.kind.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::tests::{dispatcher, structured};
    use crate::procedures::MockAnalysisProcedure;
    use crate::session::ConversationTurn;
    use crate::testing::ScriptedProvider;

    fn procedure(body: &'static str) -> MockAnalysisProcedure {
        let mut procedure = MockAnalysisProcedure::new();
        procedure.expect_run().returning(move |_| Ok(structured(body)));
        procedure
    }

    fn assistant(provider: Arc<ScriptedProvider>) -> FinancialAssistant {
        FinancialAssistant::new(
            MultiIntentAggregator::new(dispatcher(
                procedure("fundamental report"),
                procedure("technical report"),
                procedure("macro report"),
            )),
            PersonaSet::default(),
            provider,
            FinanceConfig::default(),
        )
    }

    #[test]
    fn test_live_assistant_can_research() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<&str>::new()));
        let live = FinancialAssistant::live(FinanceConfig::default(), provider.clone()).unwrap();
        assert!(live.research().is_some());
        assert!(assistant(provider).research().is_none());
    }

    #[tokio::test]
    async fn test_full_turn_is_summarized() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "fundamental_analysis", "entities": {"ticker": "AAPL"}}"#,
            "AAPL trades at a premium.",
        ]));
        let assistant = assistant(provider.clone());
        let mut session = assistant.open_session().unwrap();

        let reply = assistant.handle_turn(&mut session, "AAPL fundamentals").await;
        assert_eq!(reply.text, "AAPL trades at a premium.");
        assert!(!reply.session_expired);
        assert_eq!(reply.active_intent, Some(IntentKind::FundamentalAnalysis));

        assert_eq!(
            session.turns(),
            &[
                ConversationTurn {
                    role: TurnRole::User,
                    content: "AAPL fundamentals".to_string()
                },
                ConversationTurn {
                    role: TurnRole::Assistant,
                    content: "AAPL trades at a premium.".to_string()
                },
            ]
        );

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].response_format,
            agent_llm::ResponseFormat::JsonObject
        );
        assert!(requests[1].messages.last().unwrap().text().contains("fundamental report"));
    }

    #[tokio::test]
    async fn test_malformed_classifier_output() {
        let provider = Arc::new(ScriptedProvider::new(["I think you want fundamentals"]));
        let assistant = assistant(provider.clone());
        let mut session = assistant.open_session().unwrap();

        let reply = assistant.handle_turn(&mut session, "AAPL?").await;
        assert_eq!(reply.text, messages::PARSE_FAILURE);
        assert_eq!(reply.active_intent, None);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_classifier_failure_is_folded() {
        let provider = Arc::new(ScriptedProvider::failing());
        let assistant = assistant(provider);
        let mut session = assistant.open_session().unwrap();

        let reply = assistant.handle_turn(&mut session, "AAPL?").await;
        assert_eq!(reply.text, messages::TURN_FAILURE);
        assert_eq!(session.turns().len(), 2);
    }

    #[tokio::test]
    async fn test_summarizer_failure_hides_service_error() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "fundamental_analysis", "entities": {"ticker": "AAPL"}}"#,
        ]));
        let assistant = assistant(provider.clone());
        let mut session = assistant.open_session().unwrap();

        let reply = assistant.handle_turn(&mut session, "AAPL fundamentals").await;
        assert_eq!(reply.text, messages::TURN_FAILURE);
        assert_eq!(reply.active_intent, Some(IntentKind::FundamentalAnalysis));
        assert_eq!(provider.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_conversation_failure_hides_service_error() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "conversation", "entities": {}}"#,
        ]));
        let assistant = assistant(provider);
        let mut session = assistant.open_session().unwrap();

        let reply = assistant.handle_turn(&mut session, "hello").await;
        assert_eq!(reply.text, messages::TURN_FAILURE);
        assert_eq!(session.turns()[1].content, messages::TURN_FAILURE);
    }

    #[test]
    fn test_empty_prompt_is_answered_locally() {
        tokio_test::block_on(async {
            let provider = Arc::new(ScriptedProvider::new(Vec::<&str>::new()));
            let assistant = assistant(provider.clone());
            let mut session = assistant.open_session().unwrap();

            let reply = assistant.handle_turn(&mut session, "   ").await;
            assert_eq!(reply.text, messages::EMPTY_PROMPT);
            assert!(session.turns().is_empty());
            assert!(provider.requests().is_empty());
        });
    }

    #[tokio::test]
    async fn test_idle_session_expires_before_turn() {
        let provider = Arc::new(ScriptedProvider::new([
            r#"{"intent": "conversation", "entities": {}}"#,
            "Hello again!",
        ]));
        let assistant = assistant(provider);
        let mut session = assistant.open_session().unwrap();

        let start = Utc::now();
        session.touch(start);
        session.push_turn(TurnRole::User, "old question");

        let later = start + chrono::Duration::minutes(45);
        let reply = assistant.handle_turn_at(&mut session, "hi", later).await;
        assert!(reply.session_expired);
        assert_eq!(reply.text, "Hello again!");
        assert_eq!(reply.active_intent, Some(IntentKind::Conversation));
        assert_eq!(session.turns().len(), 2);
        assert_eq!(session.last_interaction(), later);
    }
}
