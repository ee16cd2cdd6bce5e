//! Fieldguide CLI - ask questions about equipment manuals.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Fieldguide - question answering over installation and maintenance manuals
#[derive(Parser)]
#[command(name = "fieldguide")]
#[command(version)]
#[command(about = "Question answering over installation and maintenance manuals", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize Fieldguide (create config and data directories)
    Init,

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// List chat models offered by the configured provider
    Models,

    /// List the frequently asked questions
    Faq,

    /// Ask a single question about the documents
    Ask {
        /// Your question
        question: String,

        /// Document or directory to load (repeatable; default: from config)
        #[arg(short, long = "doc")]
        documents: Vec<String>,

        /// Hide source references
        #[arg(long)]
        no_sources: bool,
    },

    /// Start an interactive chat about the documents
    Chat {
        /// Document or directory to load (repeatable; default: from config)
        #[arg(short, long = "doc")]
        documents: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., model.model_id)
        key: String,

        /// Value to set
        value: String,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fieldguide=debug,info"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fieldguide=info,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Init => commands::init::run(),
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::show(),
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Set { key, value } => commands::config::set(&key, &value),
        },
        Commands::Models => commands::models::run(),
        Commands::Faq => commands::faq::run(),
        Commands::Ask {
            question,
            documents,
            no_sources,
        } => commands::ask::run(&question, &documents, !no_sources),
        Commands::Chat { documents } => commands::chat::run(&documents),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}
