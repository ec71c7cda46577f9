//! Multi-intent aggregation
//!
//! Every supported intent in a batch is dispatched in order. Results that the
//! [`FailureClassifier`] flags are dropped, the survivors are joined into one
//! document and the summarizer turns that document into the reply.

use std::fmt;
use tracing::{debug, info, warn};

use crate::agents::Responder;
use crate::dispatcher::IntentDispatcher;
use crate::failure::FailureClassifier;
use crate::intent::{ClassifiedIntent, IntentBatch, IntentKind};
use crate::messages;
use crate::prompts;

/// Separator between reports in the aggregated document
pub const SEPARATOR: &str = "\n\n---\n\n";

/// Surviving report bodies of one batch, in intent order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedDocument {
    sections: Vec<String>,
}

impl AggregatedDocument {
    pub fn push(&mut self, section: impl Into<String>) {
        self.sections.push(section.into());
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    /// Sections joined with [`SEPARATOR`]
    pub fn render(&self) -> String {
        self.sections.join(SEPARATOR)
    }
}

impl fmt::Display for AggregatedDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// What the dispatch loop produced, before summarization
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    pub document: AggregatedDocument,
    /// Intents that were dispatched (supported ones)
    pub dispatched: usize,
    /// Surviving sections that came from the conversational agent
    pub conversational: usize,
    /// Text of the last dispatched result that was dropped
    pub last_failure: Option<String>,
}

impl Collection {
    /// Every survivor is a conversational reply
    pub fn is_conversation_only(&self) -> bool {
        !self.document.is_empty() && self.conversational == self.document.len()
    }
}

/// Reply for one batch plus the intent the session keeps as active
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome {
    pub reply: String,
    pub active_intent: ClassifiedIntent,
    /// Whether the summarizer was called
    pub summarized: bool,
}

/// Runs a batch through the dispatcher and the summarizer
#[derive(Clone)]
pub struct MultiIntentAggregator {
    dispatcher: IntentDispatcher,
}

impl MultiIntentAggregator {
    pub fn new(dispatcher: IntentDispatcher) -> Self {
        Self { dispatcher }
    }

    /// Dispatch every supported intent and keep the successful results
    pub async fn collect(
        &self,
        batch: &IntentBatch,
        user_input: &str,
        conversation: &mut dyn Responder,
    ) -> Collection {
        let mut collection = Collection::default();

        for intent in batch {
            if !intent.kind.is_supported() {
                debug!(intent = %intent.kind, "skipping unsupported intent");
                continue;
            }

            let report = self
                .dispatcher
                .dispatch(intent, user_input, conversation)
                .await;
            collection.dispatched += 1;

            if FailureClassifier::is_error_message(&report) {
                info!(intent = %intent.kind, "dropping failed result");
                collection.last_failure = Some(report.into_document_text());
                continue;
            }

            if intent.kind == IntentKind::Conversation {
                collection.conversational += 1;
            }
            collection.document.push(report.into_document_text());
        }

        collection
    }

    /// Produce the reply for a batch
    ///
    /// No survivors yields a fixed message, except that a lone dispatched
    /// intent keeps its own failure text. Conversation-only batches skip
    /// the summarizer. A failed summarizer call yields
    /// [`messages::TURN_FAILURE`].
    pub async fn aggregate(
        &self,
        batch: &IntentBatch,
        user_input: &str,
        conversation: &mut dyn Responder,
        summarizer: &mut dyn Responder,
    ) -> AggregateOutcome {
        let collection = self.collect(batch, user_input, conversation).await;
        let active_intent = batch.last().clone();

        if collection.document.is_empty() {
            let reply = match collection.last_failure {
                Some(failure) if batch.len() == 1 && collection.dispatched == 1 => failure,
                _ => messages::NO_RELEVANT_INFO.to_string(),
            };
            return AggregateOutcome {
                reply,
                active_intent,
                summarized: false,
            };
        }

        let document = collection.document.render();
        if collection.is_conversation_only() {
            return AggregateOutcome {
                reply: document,
                active_intent,
                summarized: false,
            };
        }

        let reply = match prompts::summary_prompt(&document, user_input) {
            Ok(prompt) => match summarizer.respond(&prompt).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(error = %e, "summarizer failed");
                    messages::TURN_FAILURE.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "summary prompt failed, returning raw reports");
                return AggregateOutcome {
                    reply: document,
                    active_intent,
                    summarized: false,
                };
            }
        };

        AggregateOutcome {
            reply,
            active_intent,
            summarized: true,
        }
    }
}
