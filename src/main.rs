use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;

use selfloom::config::LoomConfig;
use selfloom::llm::{GenerationParams, OpenRouterClient};
use selfloom::loom::{event_channel, LoomOutcome, LoomSession, SessionParams};
use selfloom::store::DocumentStore;

/// Default directory for stored documents
const DOCUMENTS_DIR: &str = "documents";

#[derive(Parser)]
#[command(name = "selfloom", about = "Self-continuing text generation loom", version)]
struct Cli {
    /// Path to a config file (default: .selfloom.yml, then user config)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a loom session, streaming SSE events to stdout
    Run {
        /// Seed text override
        #[arg(long)]
        seed: Option<String>,

        /// Candidate slots per round
        #[arg(long, default_value_t = 5)]
        count: usize,

        /// Generation model id
        #[arg(long)]
        base_model: Option<String>,

        /// Judging model id
        #[arg(long)]
        grader_model: Option<String>,

        /// Max new tokens per completion
        #[arg(long)]
        max_new_tokens: Option<u32>,

        #[arg(long)]
        temperature: Option<f64>,

        #[arg(long)]
        min_p: Option<f64>,
    },

    /// Manage stored documents
    Docs {
        #[command(subcommand)]
        command: DocsCommands,
    },

    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum DocsCommands {
    /// List documents, newest first
    List,
    /// Print a document's content
    Show { name: String },
    /// Delete a document
    Delete { name: String },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the resolved configuration
    Show,
    /// Store the API token
    SetToken { token: String },
    /// Store the last-used model ids
    SetModels {
        #[arg(long)]
        base: Option<String>,
        #[arg(long)]
        grader: Option<String>,
    },
}

fn setup_logging() -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("selfloom")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("selfloom.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();
    let config = LoomConfig::load(cli.config.as_ref())?;
    config.validate()?;

    match cli.command {
        None => {
            run_session(config, None, 5, None, None, None, None, None).await
        }
        Some(Commands::Run {
            seed,
            count,
            base_model,
            grader_model,
            max_new_tokens,
            temperature,
            min_p,
        }) => {
            run_session(
                config,
                seed,
                count,
                base_model,
                grader_model,
                max_new_tokens,
                temperature,
                min_p,
            )
            .await
        }
        Some(Commands::Docs { command }) => handle_docs_command(command),
        Some(Commands::Config { command }) => handle_config_command(command, config),
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_session(
    mut config: LoomConfig,
    seed: Option<String>,
    count: usize,
    base_model: Option<String>,
    grader_model: Option<String>,
    max_new_tokens: Option<u32>,
    temperature: Option<f64>,
    min_p: Option<f64>,
) -> Result<()> {
    if count == 0 {
        eyre::bail!("--count must be > 0");
    }

    // Persist model overrides for next time, the session's only write-back.
    if base_model.is_some() || grader_model.is_some() {
        config.set_models(base_model.as_deref(), grader_model.as_deref());
        if let Err(e) = config.save() {
            log::warn!("Failed to save model choice: {}", e);
        }
    }

    let token = config.resolved_token();
    if token.is_none() {
        eprintln!(
            "{}",
            "No OpenRouter API token found. Set one via `selfloom config set-token` or OPENROUTER_API_KEY.".yellow()
        );
        eprintln!("{}", "Starting anyway - generation calls will fail fast...".yellow());
    }

    let client = Arc::new(OpenRouterClient::new(token)?);

    let params = SessionParams {
        seed,
        candidate_count: count,
        base_model: config.model.clone(),
        grader_model: config.instruct_model.clone(),
        generation: GenerationParams {
            max_tokens: max_new_tokens.unwrap_or(config.max_new_tokens),
            temperature: temperature.unwrap_or(config.temperature),
            min_p: min_p.unwrap_or(config.min_p),
        },
        base_context_limit: config.base_context_limit,
        grader_context_limit: config.grader_context_limit,
        ..SessionParams::default()
    };

    info!("Starting loom session with {} candidate slots", count);

    let (emitter, mut rx) = event_channel(64);
    let session = LoomSession::new(client, params, emitter);
    let handle = tokio::spawn(session.run());

    let mut stdout = std::io::stdout();
    while let Some(event) = rx.recv().await {
        let frame = event.to_sse()?;
        let written = stdout
            .write_all(frame.as_bytes())
            .and_then(|_| stdout.flush());
        if written.is_err() {
            // Consumer gone; dropping the receiver stops the session.
            info!("Stdout closed, stopping session");
            break;
        }
    }
    drop(rx);

    match handle.await.context("Session task panicked")?? {
        LoomOutcome::Disconnected => {
            info!("Session ended: consumer disconnected");
            Ok(())
        }
        LoomOutcome::GraderFailed => {
            eprintln!("{}", "Session ended: grader failure".red());
            Ok(())
        }
    }
}

fn handle_docs_command(command: DocsCommands) -> Result<()> {
    let store = DocumentStore::open(DOCUMENTS_DIR)?;

    match command {
        DocsCommands::List => {
            let docs = store.list()?;
            if docs.is_empty() {
                println!("{}", "No documents.".yellow());
            }
            for doc in docs {
                println!(
                    "{}  {}",
                    doc.modified.format("%Y-%m-%d %H:%M").to_string().dimmed(),
                    doc.name.cyan()
                );
            }
        }
        DocsCommands::Show { name } => match store.load(&name)? {
            Some(content) => println!("{}", content),
            None => eyre::bail!("Document not found: {}", name),
        },
        DocsCommands::Delete { name } => {
            store.delete(&name)?;
            println!("{} {}", "Deleted:".green(), name);
        }
    }
    Ok(())
}

fn handle_config_command(command: ConfigCommands, mut config: LoomConfig) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("model:                {}", config.model.cyan());
            println!("instruct_model:       {}", config.instruct_model.cyan());
            println!("temperature:          {}", config.temperature);
            println!("min_p:                {}", config.min_p);
            println!("max_new_tokens:       {}", config.max_new_tokens);
            println!("base_context_limit:   {}", config.base_context_limit);
            println!("grader_context_limit: {}", config.grader_context_limit);
            let token_state = if config.resolved_token().is_some() {
                "set".green()
            } else {
                "unset".red()
            };
            println!("token:                {}", token_state);
        }
        ConfigCommands::SetToken { token } => {
            if token.is_empty() {
                eyre::bail!("No token provided");
            }
            config.token = token;
            config.save()?;
            println!("{}", "Token saved.".green());
        }
        ConfigCommands::SetModels { base, grader } => {
            config.set_models(base.as_deref(), grader.as_deref());
            config.save()?;
            println!("{}", "Models saved.".green());
        }
    }
    Ok(())
}
