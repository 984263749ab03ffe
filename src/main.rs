use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use mail_advisor::advisors::AdvisorTable;
use mail_advisor::channels::{HandoffFile, ImapSmtpMailbox};
use mail_advisor::config::{AppConfig, DataServiceConfig, process_env};
use mail_advisor::llm::create_provider;
use mail_advisor::pipeline::tools::Tool;
use mail_advisor::pipeline::types::RunOutcome;
use mail_advisor::pipeline::{
    Categorizer, DataFetcher, JsonRpcToolClient, Orchestrator, ReplyComposer, ToolSource,
};

#[derive(Parser)]
#[command(name = "mail-advisor", version, about = "Answer customer emails with LLM financial advisors")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Process the latest unread email once and exit (default).
    Run {
        /// Reprocess the email stored by the previous run instead of reading the mailbox.
        #[arg(long)]
        from_handoff: bool,
    },
    /// Call one data-service tool and print its raw response.
    ProbeTool {
        /// Tool name, e.g. fetch_net_worth.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install rustls crypto provider"))?;

    let cli = Cli::parse();
    let _log_guard = init_tracing();

    match cli.command.unwrap_or(Command::Run {
        from_handoff: false,
    }) {
        Command::Run { from_handoff } => run(from_handoff).await,
        Command::ProbeTool { name } => probe_tool(&name).await,
    }
}

/// stderr logging, plus a daily log file when `MAIL_ADVISOR_LOG_DIR` is set.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match process_env("MAIL_ADVISOR_LOG_DIR") {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mail-advisor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

async fn run(from_handoff: bool) -> anyhow::Result<()> {
    let config = AppConfig::load().context("Invalid configuration")?;

    eprintln!("📬 Mail Advisor v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Mailbox: {}", config.email.imap_host);
    eprintln!("   Data service: {}", config.data_service.endpoint);
    eprintln!(
        "   Categorizer: {} ({})",
        config.categorizer.model,
        config.categorizer.backend.as_str()
    );
    eprintln!("   Handoff file: {}", config.handoff_path.display());

    let categorizer = Categorizer::new(create_provider(&config.categorizer)?);
    let tools: Arc<dyn ToolSource> = Arc::new(JsonRpcToolClient::new(config.data_service.clone())?);
    let advisors = AdvisorTable::from_config(&config.advisors)?;
    let composer = match &config.reply_drafting {
        Some(llm) => {
            eprintln!("   Reply drafting: {}", llm.model);
            ReplyComposer::with_drafter(create_provider(llm)?)
        }
        None => ReplyComposer::plain(),
    };

    let orchestrator = Orchestrator::new(
        Arc::new(ImapSmtpMailbox::new(config.email.clone())),
        HandoffFile::new(&config.handoff_path),
        categorizer,
        DataFetcher::new(tools),
        advisors,
        composer,
    );

    let outcome = if from_handoff {
        eprintln!("   Mode: replay stored email\n");
        orchestrator.replay().await?
    } else {
        eprintln!();
        orchestrator.run().await?
    };

    eprintln!("{}", summary(&outcome));
    Ok(())
}

fn summary(outcome: &RunOutcome) -> String {
    match outcome {
        RunOutcome::NoUnreadMail => "📭 No unread email.".to_string(),
        RunOutcome::Skipped { category } => {
            format!("🚫 Skipped: email categorized as {category}.")
        }
        RunOutcome::NoAdvisor { category } => {
            format!("⚠️ No advisor for category {category}; no reply sent.")
        }
        RunOutcome::SkippedNoOutput { advisor, .. } => {
            format!("⚠️ Advisor '{advisor}' produced no response; no reply sent.")
        }
        RunOutcome::AdvisorFailed {
            advisor, reason, ..
        } => format!("❌ Advisor '{advisor}' failed: {reason}; no reply sent."),
        RunOutcome::Replied {
            advisor,
            to,
            message_id,
            ..
        } => format!("✅ Reply from '{advisor}' sent to {to} ({message_id})."),
    }
}

async fn probe_tool(name: &str) -> anyhow::Result<()> {
    if Tool::from_name(name).is_none() {
        tracing::warn!(tool = %name, "Not a known tool name, calling it anyway");
    }

    let config = DataServiceConfig::from_env(&process_env).context("Invalid configuration")?;
    let client = JsonRpcToolClient::new(config)?;
    eprintln!("🔧 Calling '{}' at {}", name, client.endpoint());

    let body = client.call_tool(name).await?;
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => {
            eprintln!("⚠️ Response is not valid JSON:");
            println!("{body}");
        }
    }
    Ok(())
}
