//! Chat command - interactive conversation about the documents.

use super::faq::{pick, print_faq};
use super::{
    build_session, get_paths, index_documents, load_config, print_sources, read_documents,
    stream_answer,
};
use anyhow::{Context, Result};
use colored::Colorize;
use fieldguide_config::{AppPaths, Config};
use fieldguide_core::{save_transcript, ConversationTurn, QueryResult, Role};
use fieldguide_rag::{with_history, SessionController, SessionState};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;
use tokio::runtime::Runtime;

const VIEW: &str = "chat";

/// What the loop should do after a line of input.
#[derive(Debug, PartialEq)]
enum Input {
    Question(String),
    Faq(Option<String>),
    Load(String),
    Sources,
    History,
    Save(Option<String>),
    Help,
    Exit,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return Input::Question(line.to_string());
    };

    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim().to_string()).filter(|a| !a.is_empty())),
        None => (command, None),
    };

    match name {
        "faq" => Input::Faq(arg),
        "load" => match arg {
            Some(path) => Input::Load(path),
            None => Input::Unknown("/load needs a path".to_string()),
        },
        "sources" => Input::Sources,
        "history" => Input::History,
        "save" => Input::Save(arg),
        "help" | "?" => Input::Help,
        "exit" | "quit" | "q" => Input::Exit,
        other => Input::Unknown(format!("Unknown command: '/{}'", other)),
    }
}

/// Everything the chat loop works with.
struct Chat {
    config: Config,
    paths: AppPaths,
    rt: Runtime,
    session: SessionController,
    last_result: Option<QueryResult>,
}

/// Run the interactive chat.
pub fn run(documents: &[String]) -> Result<()> {
    let config = load_config()?;
    let paths = get_paths()?;
    let raws = read_documents(&config, documents)?;

    let mut chat = Chat {
        session: build_session(&config)?,
        rt: Runtime::new().context("Failed to create async runtime")?,
        config,
        paths,
        last_result: None,
    };
    let mut state = SessionState::new(chat.config.chat.greeting.clone());

    index_documents(&chat.rt, &mut chat.session, &mut state, &raws)?;

    println!("{}", "Fieldguide Chat".cyan().bold());
    println!("{}", "─".repeat(50));
    println!(
        "Type {} for commands, {} to exit.",
        "/help".cyan(),
        "/exit".cyan()
    );
    println!();

    with_history(&mut state, VIEW, |state| chat.run_loop(state), print_turn)
}

fn print_turn(turn: &ConversationTurn) {
    match turn.role {
        Role::User => println!("{} {}", "You:".cyan().bold(), turn.content),
        Role::Assistant => println!("{} {}", "Assistant:".green().bold(), turn.content),
    }
}

impl Chat {
    fn run_loop(&mut self, state: &mut SessionState) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        let _ = rl.load_history(&self.paths.history_file);

        loop {
            let readline = rl.readline(&format!("{} ", "you>".cyan().bold()));
            match readline {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(line);

                    match parse_input(line) {
                        Input::Exit => break,
                        input => {
                            if let Err(e) = self.handle(state, input) {
                                eprintln!("{} {:#}", "Error:".red(), e);
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("{} {:?}", "Error:".red(), err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        if let Some(parent) = self.paths.history_file.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.save_history(&self.paths.history_file);

        Ok(())
    }

    fn handle(&mut self, state: &mut SessionState, input: Input) -> Result<()> {
        match input {
            Input::Question(question) => self.ask(state, &question),
            Input::Faq(None) => {
                print_faq(&self.config.faq);
                Ok(())
            }
            Input::Faq(Some(n)) => match pick(&self.config.faq, &n) {
                Some(question) => {
                    println!("{} {}", "You:".cyan().bold(), question);
                    self.ask(state, &question)
                }
                None => {
                    println!(
                        "{} No question {}. Type {} to list them.",
                        "?".yellow(),
                        n,
                        "/faq".cyan()
                    );
                    Ok(())
                }
            },
            Input::Load(path) => {
                let raws = read_documents(&self.config, &[path])?;
                index_documents(&self.rt, &mut self.session, state, &raws)?;
                self.last_result = None;
                Ok(())
            }
            Input::Sources => {
                match &self.last_result {
                    Some(result) if !result.source_chunks.is_empty() => print_sources(result),
                    _ => println!("{}", "No sources yet.".dimmed()),
                }
                Ok(())
            }
            Input::History => {
                for turn in &state.transcript {
                    print_turn(turn);
                }
                Ok(())
            }
            Input::Save(path) => self.save(state, path),
            Input::Help => {
                print_help();
                Ok(())
            }
            Input::Unknown(message) => {
                println!(
                    "{} {}. Type {} for help.",
                    "?".yellow(),
                    message,
                    "/help".cyan()
                );
                Ok(())
            }
            Input::Exit => Ok(()),
        }
    }

    fn ask(&mut self, state: &mut SessionState, question: &str) -> Result<()> {
        let result = stream_answer(&self.rt, &mut self.session, state, question)?;
        println!(
            "{}",
            format!(
                "({} source(s), /sources to show)",
                result.source_chunks.len()
            )
            .dimmed()
        );
        self.last_result = Some(result);
        Ok(())
    }

    fn save(&self, state: &SessionState, path: Option<String>) -> Result<()> {
        let path = match path {
            Some(path) => PathBuf::from(path),
            None => self.paths.transcripts_dir.join(format!(
                "{}-{}.json",
                chrono::Local::now().format("%Y%m%d-%H%M%S"),
                &state.session_id[..8]
            )),
        };

        save_transcript(&path, &state.transcript).context("Failed to save transcript")?;
        println!("{} Saved transcript to {}", "✓".green(), path.display());
        Ok(())
    }
}

fn print_help() {
    println!("{}", "Available Commands:".cyan().bold());
    println!();
    println!("  {}              Ask a question", "<question>".white());
    println!("  {}                List frequently asked questions", "/faq".white());
    println!("  {}              Ask frequently asked question N", "/faq N".white());
    println!("  {}        Load different documents", "/load <path>".white());
    println!("  {}            Show sources of the last answer", "/sources".white());
    println!("  {}            Show the conversation", "/history".white());
    println!("  {}       Save the conversation as JSON", "/save [path]".white());
    println!("  {}               Exit the chat", "/exit".white());
    println!();
}
