//! Prompt templates
//!
//! Templates are MiniJinja strings rendered on demand; nothing is cached
//! between renders.

use minijinja::{Environment, context};
use serde::Serialize;
use serde_json::Value;

use crate::agents::AgentPersona;
use crate::error::Result;

const PERSONA: &str = "Role: {{ role }}
Goal: {{ goal }}
Backstory: {{ backstory }}
Instructions: {{ instructions }}";

const SUMMARY: &str = r#"Here is the result of the technical or fundamental analysis or macroeconomic analysis:
{{ report }}

User request was: "{{ request }}"

Please summarize only the information relevant to the request. If the user mentioned specific elements like RSI or MACD, just highlight those points. If nothing specific is mentioned, provide a general and comprehensive summary."#;

const FUNDAMENTAL_TASK: &str = "Write a fundamental analysis report for {{ ticker }}.

Use only the data below. Cover valuation, profitability, financial health, growth and the DCF estimate, then give an overall view. Say so when a figure is unavailable instead of guessing.

Data:
{{ data }}";

const TECHNICAL_TASK: &str = "Write a technical analysis report for {{ symbol }} \
{%- if start_date %} from {{ start_date }} to {{ end_date }}{% else %} over the last {{ period }}{% endif %}.

Use only the indicator snapshot below. Discuss trend, momentum (RSI, MACD, stochastic), volatility (Bollinger Bands, ATR), volume, support and resistance and the Fibonacci levels, then give a short outlook.

Data:
{{ data }}";

const MACRO_TASK: &str = "Write a macroeconomic outlook for {{ subject }}.

Use only the GDP, inflation and unemployment series below (last five years). Describe the direction of each series, how they relate and what they imply for the economy and its equity market.

Data:
{{ data }}";

const QUARTERLY_TASK: &str = "Write a quarterly results review of {{ ticker }} for {{ quarter }}.

Use only the figures below. Compare the quarter with the previous one, discuss margins, cash generation, the balance sheet and shareholder returns, then say what changed. Say so when a figure is unavailable.

Data:
{{ data }}";

const RESEARCH_TASK: &str = "Write an investment research report on {{ ticker }}
{%- if quarter %} with a focus on {{ quarter }}{% endif %}.

{% for section in sections -%}
## {{ section.title }} findings
{% if section.body %}{{ section.body }}{% else %}Unavailable.{% endif %}

{% endfor -%}
Combine these findings into one report. Do not add figures that are not in the findings.";

fn render(template: &str, ctx: minijinja::Value) -> Result<String> {
    let env = Environment::new();
    Ok(env.render_str(template, ctx)?)
}

fn pretty(data: &Value) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string())
}

/// System prompt for an agent persona
pub fn persona_prompt(persona: &AgentPersona) -> Result<String> {
    render(
        PERSONA,
        context! {
            role => persona.role.as_str(),
            goal => persona.goal.as_str(),
            backstory => persona.backstory.as_str(),
            instructions => persona.instructions.as_str(),
        },
    )
}

/// Summarizer input for an aggregated report document
pub fn summary_prompt(report: &str, request: &str) -> Result<String> {
    render(SUMMARY, context! { report, request })
}

/// Task prompt for the fundamental analyst
pub fn fundamental_task(ticker: &str, data: &Value) -> Result<String> {
    render(FUNDAMENTAL_TASK, context! { ticker, data => pretty(data) })
}

/// Task prompt for the technical analyst; dates win over the period when set
pub fn technical_task(
    symbol: &str,
    period: &str,
    start_date: &str,
    end_date: &str,
    data: &Value,
) -> Result<String> {
    render(
        TECHNICAL_TASK,
        context! { symbol, period, start_date, end_date, data => pretty(data) },
    )
}

/// Task prompt for the macro analyst
pub fn macro_task(subject: &str, data: &Value) -> Result<String> {
    render(MACRO_TASK, context! { subject, data => pretty(data) })
}

/// Task prompt for the quarterly review of one reported quarter
pub fn quarterly_task(ticker: &str, quarter: &str, data: &Value) -> Result<String> {
    render(QUARTERLY_TASK, context! { ticker, quarter, data => pretty(data) })
}

/// Findings from one analyst, `None` when the analysis failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchSection {
    pub title: String,
    pub body: Option<String>,
}

/// Task prompt for the research reporter
pub fn research_task(
    ticker: &str,
    quarter: Option<&str>,
    sections: &[ResearchSection],
) -> Result<String> {
    render(RESEARCH_TASK, context! { ticker, quarter, sections })
}
