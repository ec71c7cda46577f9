//! Per-session state
//!
//! A [`SessionContext`] owns everything one user conversation mutates: the
//! turn log, the active intent, the session-scoped agents and the idle clock.
//! It is passed explicitly into every turn, so sessions never share state.

use agent_llm::{LLMProvider, ResponseFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

use crate::agents::{ChatAgent, PersonaSet};
use crate::config::FinanceConfig;
use crate::error::Result;
use crate::intent::ClassifiedIntent;

/// Who wrote a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One entry in the session log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Agents whose history lives as long as the session
#[derive(Debug)]
pub struct SessionAgents {
    /// Classifier, asked for JSON output
    pub intent_router: ChatAgent,
    pub conversation: ChatAgent,
    pub summarizer: ChatAgent,
}

impl SessionAgents {
    pub fn new(
        personas: &PersonaSet,
        provider: Arc<dyn LLMProvider>,
        config: &FinanceConfig,
    ) -> Result<Self> {
        Ok(Self {
            intent_router: ChatAgent::new(
                "intent_router",
                &personas.intent_router,
                provider.clone(),
                config,
            )?
            .with_response_format(ResponseFormat::JsonObject),
            conversation: ChatAgent::new(
                "conversation",
                &personas.conversation,
                provider.clone(),
                config,
            )?,
            summarizer: ChatAgent::new("summarizer", &personas.summarizer, provider, config)?,
        })
    }

    /// Clear every agent back to its system message
    pub fn reset(&mut self) {
        self.intent_router.reset();
        self.conversation.reset();
        self.summarizer.reset();
    }
}

/// State of one user session
#[derive(Debug)]
pub struct SessionContext {
    id: Uuid,
    turns: Vec<ConversationTurn>,
    active_intent: Option<ClassifiedIntent>,
    last_interaction: DateTime<Utc>,
    idle_timeout: Duration,
    agents: SessionAgents,
}

impl SessionContext {
    pub fn new(agents: SessionAgents, idle_timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            turns: Vec::new(),
            active_intent: None,
            last_interaction: Utc::now(),
            idle_timeout,
            agents,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// Last intent of the most recent batch
    pub fn active_intent(&self) -> Option<&ClassifiedIntent> {
        self.active_intent.as_ref()
    }

    pub fn set_active_intent(&mut self, intent: ClassifiedIntent) {
        self.active_intent = Some(intent);
    }

    pub fn last_interaction(&self) -> DateTime<Utc> {
        self.last_interaction
    }

    pub fn agents(&self) -> &SessionAgents {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut SessionAgents {
        &mut self.agents
    }

    pub fn push_turn(&mut self, role: TurnRole, content: impl Into<String>) {
        self.turns.push(ConversationTurn {
            role,
            content: content.into(),
        });
    }

    /// Drop the log, the active intent and every agent history
    pub fn clear(&mut self) {
        self.turns.clear();
        self.active_intent = None;
        self.agents.reset();
    }

    /// Clear the session when it sat idle longer than the timeout
    ///
    /// Returns whether it was cleared.
    pub fn expire_if_idle(&mut self, now: DateTime<Utc>) -> bool {
        let idle = (now - self.last_interaction)
            .to_std()
            .is_ok_and(|elapsed| elapsed > self.idle_timeout);

        if idle {
            info!(session = %self.id, "session idle, clearing conversation");
            self.clear();
        }
        idle
    }

    /// Record an interaction
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_interaction = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedProvider;
    use serde_json::Map;

    fn session(provider: Arc<ScriptedProvider>) -> SessionContext {
        let config = FinanceConfig::default();
        let agents = SessionAgents::new(&PersonaSet::default(), provider, &config).unwrap();
        SessionContext::new(agents, config.session_idle_timeout)
    }

    #[test]
    fn test_idle_session_is_cleared() {
        let mut session = session(Arc::new(ScriptedProvider::new(Vec::<&str>::new())));
        let start = Utc::now();
        session.touch(start);
        session.push_turn(TurnRole::User, "AAPL fundamentals");
        session.set_active_intent(ClassifiedIntent::new("fundamental_analysis", Map::new()));

        assert!(!session.expire_if_idle(start + chrono::Duration::minutes(30)));
        assert_eq!(session.turns().len(), 1);

        assert!(session.expire_if_idle(start + chrono::Duration::minutes(31)));
        assert!(session.turns().is_empty());
        assert!(session.active_intent().is_none());
    }

    #[test]
    fn test_clock_going_backwards_is_not_idle() {
        let mut session = session(Arc::new(ScriptedProvider::new(Vec::<&str>::new())));
        let start = Utc::now();
        session.touch(start);
        assert!(!session.expire_if_idle(start - chrono::Duration::hours(2)));
    }

    #[tokio::test]
    async fn test_clear_resets_agent_histories() {
        let provider = Arc::new(ScriptedProvider::new(["hello"]));
        let mut session = session(provider);

        session.agents_mut().conversation.query("hi").await.unwrap();
        assert_eq!(session.agents().conversation.history().len(), 3);

        session.clear();
        assert_eq!(session.agents().conversation.history().len(), 1);
    }

    #[test]
    fn test_sessions_have_distinct_ids() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<&str>::new()));
        let a = session(provider.clone());
        let b = session(provider);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_turn_role_serialization() {
        let turn = ConversationTurn {
            role: TurnRole::Assistant,
            content: "ok".to_string(),
        };
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
