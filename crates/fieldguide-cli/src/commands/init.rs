//! Initialize Fieldguide.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use fieldguide_config::Config;

pub fn run() -> Result<()> {
    let paths = get_paths()?;

    // Check if already initialized
    if paths.is_initialized() {
        println!(
            "{} Fieldguide is already initialized.",
            "Note:".yellow().bold()
        );
        println!("  Config: {}", paths.config_file.display());
        return Ok(());
    }

    println!("{}", "Initializing Fieldguide...".cyan().bold());

    paths
        .ensure_dirs()
        .context("Failed to create directories")?;
    println!("  {} Created directories", "✓".green());

    Config::create_default_file(&paths.config_file)
        .context("Failed to create config file")?;
    println!(
        "  {} Created config: {}",
        "✓".green(),
        paths.config_file.display()
    );

    println!();
    println!("{}", "Fieldguide initialized successfully!".green().bold());
    println!();
    println!("Next steps:");
    println!(
        "  1. Set your API key: {}",
        "export OPENAI_API_KEY=sk-...".cyan()
    );
    println!(
        "  2. Ask about a manual: {}",
        "fieldguide ask \"How do I drain the tank?\" --doc manual.pdf".cyan()
    );
    println!("  3. Start a conversation: {}", "fieldguide chat".cyan());

    Ok(())
}
