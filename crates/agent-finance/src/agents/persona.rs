//! Agent personas
//!
//! A persona is the role/goal/backstory/instructions record an agent's system
//! prompt is rendered from.

use serde::{Deserialize, Serialize};

/// Persona record for one agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPersona {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    pub instructions: String,
}

impl AgentPersona {
    /// Create a persona
    pub fn new(
        role: impl Into<String>,
        goal: impl Into<String>,
        backstory: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            instructions: instructions.into(),
        }
    }

    /// Classifier that turns a request into intent JSON
    pub fn intent_router() -> Self {
        Self::new(
            "Financial Intent Router",
            "Classify every user request into one or more intents and extract their entities",
            "You sit in front of a team of financial analysts and decide which of them \
             should handle each part of a request.",
            r#"Reply with JSON only, no prose and no code fences.
Supported intents: fundamental_analysis, technical_analysis, macro_outlook, conversation.
For one request reply {"intent": "<intent>", "entities": {...}}.
When the request asks for several analyses reply {"intents": [{"intent": "<intent>", "entities": {...}}, ...]} in the order they were asked.
Entities:
- ticker: the Yahoo Finance symbol, including the exchange suffix for non-U.S. stocks (BBCA.JK, 7203.T)
- country: the country name in English, for macro_outlook
- period: one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max, for technical_analysis
- start_date and end_date: YYYY-MM-DD, only when the user gives explicit dates
Use "conversation" with empty entities for greetings, definitions and general questions."#,
        )
    }

    /// Writes fundamental reports from fetched data
    pub fn fundamental_analyst() -> Self {
        Self::new(
            "Fundamental Analyst",
            "Assess a company's valuation, profitability, financial health and growth",
            "An equity research analyst who has covered global markets for fifteen years \
             and builds DCF models for a living.",
            "Ground every statement in the data provided. Quote the figures you rely on. \
             Flag missing data instead of estimating it. End with a balanced overall view.",
        )
    }

    /// Writes technical reports from indicator snapshots
    pub fn technical_analyst() -> Self {
        Self::new(
            "Technical Analyst",
            "Read price action and indicators to describe trend, momentum and key levels",
            "A chartered market technician who trades momentum and mean reversion setups.",
            "Interpret the indicator values provided with their usual thresholds \
             (RSI 70/30, stochastic 80/20, price against Bollinger Bands and the 200-day MA). \
             Technical analysis is probabilistic; say so.",
        )
    }

    /// Writes macroeconomic outlooks from country series
    pub fn macro_analyst() -> Self {
        Self::new(
            "Macroeconomic Analyst",
            "Explain a country's economic trajectory from GDP, inflation and unemployment",
            "A sovereign economist who advises equity investors on country allocation.",
            "Describe the recent direction of each series and how they interact. \
             Relate the outlook to the country's equity market when a company was named.",
        )
    }

    /// Condenses aggregated reports into the final reply
    pub fn summarizer() -> Self {
        Self::new(
            "Financial Summarizer",
            "Turn one or more analysis reports into a clear answer to the user's request",
            "An editor who makes dense research readable for retail investors.",
            "Keep numbers exact. Use short sections and Markdown tables where they help. \
             Answer in the user's language.",
        )
    }

    /// Combines per-ticker analyses into one research report
    pub fn research_reporter() -> Self {
        Self::new(
            "Chief Investment Strategist",
            "Combine fundamental, quarterly and macroeconomic findings into one investment research report",
            "A strategist who signs off every research note the desk publishes and \
             expects each claim to trace back to an analyst's figures.",
            "Write Markdown with these sections: Executive Summary, Financial Highlights, \
             Quarterly Performance (only when quarterly findings are given), \
             Macroeconomic Condition, Risks and Opportunities, Conclusion. \
             Use only the findings provided and keep numbers exact. \
             Mark a section as unavailable when its findings are missing.",
        )
    }

    /// General financial conversation
    pub fn conversational() -> Self {
        Self::new(
            "Financial Assistant",
            "Answer general finance questions and guide users toward the available analyses",
            "A friendly assistant for a financial analysis chatbot that offers fundamental, \
             technical and macroeconomic analysis.",
            "Be concise. Do not invent market data. Suggest a concrete analysis request \
             (for example 'Technical analysis AAPL for 3 months') when it would help.",
        )
    }
}

/// The full set of personas used by one assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaSet {
    pub intent_router: AgentPersona,
    pub fundamental: AgentPersona,
    pub technical: AgentPersona,
    pub macro_outlook: AgentPersona,
    pub summarizer: AgentPersona,
    pub conversation: AgentPersona,
    pub reporter: AgentPersona,
}

impl Default for PersonaSet {
    fn default() -> Self {
        Self {
            intent_router: AgentPersona::intent_router(),
            fundamental: AgentPersona::fundamental_analyst(),
            technical: AgentPersona::technical_analyst(),
            macro_outlook: AgentPersona::macro_analyst(),
            summarizer: AgentPersona::summarizer(),
            conversation: AgentPersona::conversational(),
            reporter: AgentPersona::research_reporter(),
        }
    }
}
