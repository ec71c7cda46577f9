//! Financial assistant REPL
//!
//! # Usage
//!
//! ```bash
//! export OPENAI_API_KEY="sk-..."
//! cargo run --bin finance-bot -p finance-cli
//!
//! # Local OpenAI-compatible server
//! cargo run --bin finance-bot -p finance-cli -- --api-base http://localhost:1234/v1
//! ```

use agent_finance::markdown::clean_llm_markdown;
use agent_finance::messages::{DISCLAIMER, SESSION_TIMEOUT};
use agent_finance::tools::FiscalQuarter;
use agent_finance::{FinanceConfig, FinancialAssistant};
use agent_llm::providers::{OpenAIConfig, OpenAIProvider};
use agent_utils::{AppConfig, LogFormat};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const HELP: &str = "Commands:
  /research TICKER [YYYYQn]  write a research report, optionally reviewing a quarter
  /reset  start a new conversation
  /help   show this help
  /exit   quit

Or ask in natural language:
  \"Fundamental analysis of AAPL\"
  \"Technical analysis BBCA.JK for 3 months\"
  \"Macro outlook for Japan and the technicals of 7203.T\"";

#[derive(Parser, Debug)]
#[command(name = "finance-bot")]
#[command(about = "Chat with the financial analysis assistant", long_about = None)]
struct Args {
    /// Completion model
    #[arg(long, env = "OPENAI_MODEL")]
    model: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// API key for the completion service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Log output format (pretty or json)
    #[arg(long)]
    log_format: Option<LogFormat>,

    /// Minutes of inactivity before the conversation is cleared
    #[arg(long, default_value_t = 30)]
    idle_timeout_mins: u64,

    /// Directory research reports are written to
    #[arg(long, default_value = "research_reports")]
    research_dir: PathBuf,

    /// Print the active intent after each reply
    #[arg(long)]
    show_intent: bool,
}

fn provider_config(args: &Args) -> anyhow::Result<OpenAIConfig> {
    let mut config = OpenAIConfig::new(args.api_key.clone().unwrap_or_default()).with_timeout(180);
    if let Some(api_base) = &args.api_base {
        config = config.with_api_base(api_base);
    }
    config.validate()?;
    Ok(config)
}

fn idle_timeout(minutes: u64) -> Duration {
    Duration::from_secs(minutes.saturating_mul(60))
}

fn finance_config(args: &Args) -> anyhow::Result<FinanceConfig> {
    let mut builder = FinanceConfig::builder()
        .with_env_api_keys()
        .session_idle_timeout(idle_timeout(args.idle_timeout_mins));
    if let Some(model) = &args.model {
        builder = builder.model(model);
    }
    Ok(builder.build()?)
}

/// Ticker and optional quarter from the arguments of `/research`
fn research_args(rest: &str) -> anyhow::Result<(String, Option<FiscalQuarter>)> {
    let mut parts = rest.split_whitespace();
    let ticker = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: /research TICKER [YYYYQn]"))?;
    let quarter = parts.next().map(str::parse::<FiscalQuarter>).transpose()?;
    if parts.next().is_some() {
        anyhow::bail!("usage: /research TICKER [YYYYQn]");
    }
    Ok((ticker.to_string(), quarter))
}

async fn run_research(assistant: &FinancialAssistant, rest: &str, dir: &Path) -> anyhow::Result<()> {
    let (ticker, quarter) = research_args(rest)?;
    let reporter = assistant
        .research()
        .ok_or_else(|| anyhow::anyhow!("research reports are not available"))?;

    println!("Researching {ticker}, this takes a while...");
    let report = reporter.research(&ticker, quarter).await?;
    let path = report.write_to(dir).await?;

    println!("{}
", clean_llm_markdown(&report.markdown));
    println!("Report saved to {}
", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let app = AppConfig::from_env()?;
    agent_utils::init_tracing_with(args.log_format.unwrap_or(app.log_format), &app.log_filter);

    let openai_config = provider_config(&args)?;
    let config = finance_config(&args)?;

    println!("{DISCLAIMER}\n");
    println!("Configuration:");
    println!("  API Base: {}", openai_config.api_base);
    println!("  Model: {}", config.model);
    println!(
        "  The conversation is cleared after {} minutes of inactivity.",
        args.idle_timeout_mins
    );
    println!("\n{HELP}\n");

    let provider = Arc::new(OpenAIProvider::with_config(openai_config)?);
    let assistant = FinancialAssistant::live(config, provider)?;
    let mut session = assistant.open_session()?;
    info!(session = %session.id(), "session opened");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        let input = input.trim();
        match input {
            "" => continue,
            "/exit" | "/quit" => {
                println!("Goodbye!");
                break;
            }
            "/help" => {
                println!("{HELP}\n");
                continue;
            }
            "/reset" => {
                session = assistant.open_session()?;
                println!("Conversation cleared.\n");
                continue;
            }
            _ => {}
        }

        if let Some(rest) = input
            .strip_prefix("/research")
            .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
        {
            if let Err(e) = run_research(&assistant, rest, &args.research_dir).await {
                warn!(error = %e, "research report failed");
                println!("Could not write the research report: {e}\n");
            }
            continue;
        }

        let reply = assistant.handle_turn(&mut session, input).await;
        if reply.session_expired {
            println!("{SESSION_TIMEOUT}");
        }
        println!("{}\n", clean_llm_markdown(&reply.text));

        if args.show_intent {
            if let Some(intent) = &reply.active_intent {
                println!("[active intent: {intent}]\n");
            }
        }
    }

    Ok(())
}
