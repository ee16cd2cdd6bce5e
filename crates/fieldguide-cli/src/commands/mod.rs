//! CLI command implementations.

pub mod ask;
pub mod chat;
pub mod config;
pub mod faq;
pub mod init;
pub mod models;

use anyhow::{Context, Result};
use colored::Colorize;
use fieldguide_config::{AppPaths, Config};
use fieldguide_core::QueryResult;
use fieldguide_ingest::{Ingestor, RawDocument};
use fieldguide_llm::{GenerationErrorKind, Providers};
use fieldguide_rag::{InitOutcome, RagError, SessionController, SessionState};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::Path;
use tokio::runtime::Runtime;
use tracing::debug;

/// Longest excerpt shown under a source reference.
const EXCERPT_CHARS: usize = 240;

/// Get the application paths.
pub fn get_paths() -> Result<AppPaths> {
    AppPaths::new().context("Failed to determine application directories")
}

/// Load configuration, falling back to defaults when no file exists.
pub fn load_config() -> Result<Config> {
    Config::load().context("Failed to load configuration")
}

/// Build a session for the configured provider.
pub fn build_session(config: &Config) -> Result<SessionController> {
    let providers =
        Providers::from_config(&config.model).context("Failed to set up model provider")?;
    SessionController::from_config(config, providers).context("Invalid chunking configuration")
}

/// Read the documents named on the command line, or the configured defaults.
/// Directories are searched for supported files.
pub fn read_documents(config: &Config, names: &[String]) -> Result<Vec<RawDocument>> {
    let names: Vec<String> = if names.is_empty() {
        config.documents.defaults.clone()
    } else {
        names.to_vec()
    };

    let ingestor = Ingestor::with_defaults()?;
    let mut raws = Vec::new();
    for name in &names {
        debug!("Reading {}", name);
        let path = Path::new(name);
        if path.is_dir() {
            raws.extend(ingestor.read_dir(path)?);
        } else {
            raws.push(
                RawDocument::from_path(path)
                    .with_context(|| format!("Failed to read document {}", name))?,
            );
        }
    }

    if raws.is_empty() {
        anyhow::bail!("No documents to load. Pass --doc <path> or set documents.defaults in the config.");
    }
    Ok(raws)
}

/// Index documents behind a spinner and report what happened.
pub fn index_documents(
    rt: &Runtime,
    session: &mut SessionController,
    state: &mut SessionState,
    documents: &[RawDocument],
) -> Result<()> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!("Loading {} document(s)...", documents.len()));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let outcome = rt.block_on(session.initialize(state, documents));
    pb.finish_and_clear();

    match outcome.map_err(explain)? {
        InitOutcome::Reused => {
            println!("{} Documents already loaded.", "Note:".yellow());
        }
        InitOutcome::Rebuilt { documents, chunks } => {
            println!(
                "  {} Indexed {} document(s) into {} chunks",
                "✓".green(),
                documents,
                chunks
            );
        }
    }
    Ok(())
}

/// Ask one question, printing the answer as it streams.
pub fn stream_answer(
    rt: &Runtime,
    session: &mut SessionController,
    state: &mut SessionState,
    question: &str,
) -> Result<QueryResult> {
    print!("{} ", "Answer:".green().bold());
    io::stdout().flush()?;

    let result = rt.block_on(session.ask(state, question, |token| {
        print!("{}", token);
        io::stdout().flush().ok();
    }));
    println!();

    result.map_err(explain)
}

/// Print numbered references for the chunks behind an answer.
pub fn print_sources(result: &QueryResult) {
    let citations = result.citations(EXCERPT_CHARS);
    if citations.is_empty() {
        return;
    }

    println!("{}", "─".repeat(70));
    println!("{}", "Sources:".cyan().bold());
    for (i, citation) in citations.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            citation.filename.white(),
            format!("(page {})", citation.page).dimmed()
        );
        println!("     {}", citation.excerpt.replace('\n', " ").dimmed());
    }
}

/// Attach a hint to provider failures the user can fix.
pub fn explain(err: RagError) -> anyhow::Error {
    let hint = match err.kind() {
        Some(GenerationErrorKind::Auth) => {
            Some("Check OPENAI_API_KEY or model.api_key in the config.")
        }
        Some(GenerationErrorKind::RateLimit) => Some("Wait a moment and try again."),
        Some(GenerationErrorKind::Quota) => Some("Check the billing status of your API account."),
        Some(GenerationErrorKind::Network) => Some("Check model.host and your network connection."),
        _ => None,
    };

    match hint {
        Some(hint) => anyhow::Error::new(err).context(hint),
        None => anyhow::Error::new(err),
    }
}
