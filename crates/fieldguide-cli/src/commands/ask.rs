//! Ask command - answer one question about the documents.

use super::{build_session, index_documents, load_config, print_sources, read_documents, stream_answer};
use anyhow::{Context, Result};
use colored::Colorize;
use fieldguide_rag::SessionState;
use tokio::runtime::Runtime;

/// Run the ask command.
pub fn run(question: &str, documents: &[String], show_sources: bool) -> Result<()> {
    let config = load_config()?;
    let raws = read_documents(&config, documents)?;
    let mut session = build_session(&config)?;
    let mut state = SessionState::new(config.chat.greeting.clone());

    let rt = Runtime::new().context("Failed to create async runtime")?;
    index_documents(&rt, &mut session, &mut state, &raws)?;

    println!("{} {}", "Question:".cyan().bold(), question);
    println!("{}", "─".repeat(70));

    let result = stream_answer(&rt, &mut session, &mut state, question)?;
    println!();

    if show_sources {
        print_sources(&result);
    }

    Ok(())
}
