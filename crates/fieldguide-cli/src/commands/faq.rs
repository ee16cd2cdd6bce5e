//! Frequently asked questions.

use super::load_config;
use anyhow::Result;
use colored::Colorize;

pub fn run() -> Result<()> {
    let config = load_config()?;
    print_faq(&config.faq);
    Ok(())
}

pub fn print_faq(questions: &[String]) {
    if questions.is_empty() {
        println!("{}", "No frequently asked questions configured.".dimmed());
        return;
    }

    println!("{}", "Frequently Asked Questions".cyan().bold());
    println!("{}", "─".repeat(50));
    for (i, question) in questions.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, question);
    }
}

/// Question number `n` (1-based).
pub fn pick(questions: &[String], n: &str) -> Option<String> {
    let index: usize = n.trim().parse().ok()?;
    index
        .checked_sub(1)
        .and_then(|i| questions.get(i))
        .cloned()
}
