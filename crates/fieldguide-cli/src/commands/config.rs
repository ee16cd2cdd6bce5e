//! Configuration commands.

use super::get_paths;
use anyhow::{Context, Result};
use colored::Colorize;
use fieldguide_config::Config;

pub fn show() -> Result<()> {
    let paths = get_paths()?;

    let contents = if paths.config_file.exists() {
        std::fs::read_to_string(&paths.config_file).context("Failed to read config file")?
    } else {
        println!(
            "{} No config file yet, showing defaults. Run 'fieldguide init' to create one.",
            "Note:".yellow()
        );
        Config::default_config_string()
    };

    println!("{}", "Current Configuration".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("{}", contents);

    Ok(())
}

pub fn path() -> Result<()> {
    let paths = get_paths()?;
    println!("{}", paths.config_file.display());
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let paths = get_paths()?;

    let mut config = Config::load_from(&paths.config_file).context("Failed to load config")?;
    config.set(key, value)?;
    config
        .save_to(&paths.config_file)
        .context("Failed to save config")?;

    let shown = if key == "model.api_key" { "********" } else { value };
    println!("{} Set {} = {}", "✓".green(), key.cyan(), shown);

    Ok(())
}
