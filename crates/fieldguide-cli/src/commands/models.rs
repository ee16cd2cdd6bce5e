//! List chat models offered by the provider.

use super::load_config;
use anyhow::{Context, Result};
use colored::Colorize;
use fieldguide_llm::Providers;
use tokio::runtime::Runtime;

pub fn run() -> Result<()> {
    let config = load_config()?;
    let providers =
        Providers::from_config(&config.model).context("Failed to set up model provider")?;

    let rt = Runtime::new().context("Failed to create async runtime")?;
    let models = rt
        .block_on(providers.language_model.list_models())
        .with_context(|| format!("Failed to list models from {}", config.model.provider))?;

    println!(
        "{} {}",
        "Models from".cyan().bold(),
        config.model.provider.to_string().cyan().bold()
    );
    println!("{}", "─".repeat(50));

    if models.is_empty() {
        println!("{}", "No models found.".dimmed());
        return Ok(());
    }

    for model in models {
        if model == config.model.model_id {
            println!("  {} {}", model.green(), "(selected)".dimmed());
        } else {
            println!("  {}", model);
        }
    }

    Ok(())
}
