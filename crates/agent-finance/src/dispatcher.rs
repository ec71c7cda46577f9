//! Routes one classified intent to its analysis procedure
//!
//! Validation failures come back as fixed user-facing texts; procedure
//! failures come back as error-marker texts. Nothing here returns `Err`.

use tracing::{info, warn};

use crate::agents::Responder;
use crate::intent::{ClassifiedIntent, IntentEntities, IntentKind};
use crate::messages;
use crate::procedures::{
    self, FundamentalInputs, MacroInputs, ProcedureInput, ProcedureSet, TechnicalInputs,
};
use crate::report::AnalysisReport;
use crate::validator::EntityValidator;

/// Technical inputs for a ticker: explicit dates win, otherwise the first
/// available period
pub fn technical_inputs(
    ticker: &str,
    entities: &IntentEntities,
    default_period: &str,
) -> TechnicalInputs {
    match entities.date_range() {
        Some((start, end)) => TechnicalInputs::for_dates(ticker, start, end),
        None => TechnicalInputs::for_period(
            ticker,
            entities.period.as_deref().unwrap_or(default_period),
        ),
    }
}

/// Macro subject: country, then ticker, then the raw request
pub fn macro_subject(entities: &IntentEntities, user_input: &str) -> String {
    entities
        .country
        .as_deref()
        .or(entities.ticker.as_deref())
        .unwrap_or(user_input)
        .trim()
        .to_string()
}

/// Validates entities and invokes the matching procedure
#[derive(Clone)]
pub struct IntentDispatcher {
    validator: EntityValidator,
    procedures: ProcedureSet,
    default_period: String,
}

impl IntentDispatcher {
    pub fn new(
        validator: EntityValidator,
        procedures: ProcedureSet,
        default_period: impl Into<String>,
    ) -> Self {
        Self {
            validator,
            procedures,
            default_period: default_period.into(),
        }
    }

    /// Dispatch one intent
    ///
    /// `conversation` answers `conversation` intents with the raw request.
    pub async fn dispatch(
        &self,
        intent: &ClassifiedIntent,
        user_input: &str,
        conversation: &mut dyn Responder,
    ) -> AnalysisReport {
        let entities = &intent.entities;

        match &intent.kind {
            IntentKind::FundamentalAnalysis => {
                let Some(ticker) = entities.ticker.as_deref() else {
                    return AnalysisReport::text(messages::NOT_UNDERSTOOD);
                };
                if !self.validator.is_valid_ticker(ticker).await {
                    return AnalysisReport::text(messages::TICKER_NOT_FOUND);
                }
                info!(ticker, "dispatching fundamental analysis");
                let input = ProcedureInput::Fundamental(FundamentalInputs {
                    company_ticker: ticker.to_string(),
                });
                procedures::invoke(self.procedures.fundamental.as_ref(), &input).await
            }

            IntentKind::TechnicalAnalysis => {
                let Some(ticker) = entities.ticker.as_deref() else {
                    return AnalysisReport::text(messages::TICKER_MISSING);
                };
                if !self.validator.is_valid_ticker(ticker).await {
                    return AnalysisReport::text(messages::TICKER_NOT_FOUND);
                }
                let input = ProcedureInput::Technical(technical_inputs(
                    ticker,
                    entities,
                    &self.default_period,
                ));
                info!(%input, "dispatching technical analysis");
                procedures::invoke(self.procedures.technical.as_ref(), &input).await
            }

            IntentKind::MacroOutlook => {
                let subject = macro_subject(entities, user_input);
                if !self.validator.is_valid_macro_input(&subject).await {
                    return AnalysisReport::text(messages::MACRO_NOT_FOUND);
                }
                info!(subject = subject.as_str(), "dispatching macroeconomic analysis");
                let input = ProcedureInput::Macro(MacroInputs { input: subject });
                procedures::invoke(self.procedures.macro_outlook.as_ref(), &input).await
            }

            IntentKind::Conversation => {
                info!("dispatching to conversational agent");
                match conversation.respond(user_input).await {
                    Ok(reply) => AnalysisReport::text(reply),
                    Err(e) => {
                        warn!(error = %e, "conversational reply failed");
                        AnalysisReport::text(messages::TURN_FAILURE)
                    }
                }
            }

            IntentKind::Unsupported(name) => {
                info!(intent = name.as_str(), "unsupported intent");
                AnalysisReport::text(messages::NOT_UNDERSTOOD)
            }
        }
    }
}
