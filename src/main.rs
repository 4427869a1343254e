//! # repo-chat CLI
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `repo-chat index <path>` | Build or refresh the index for a repository |
//! | `repo-chat ask <path> "<question>"` | Answer one question about an indexed repository |
//! | `repo-chat chat [<path>]` | Interactive question session |
//! | `repo-chat collections` | List indexed repositories |
//!
//! Answers go to stdout; logs go to stderr (`RUST_LOG` or `--verbose`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use repo_chat::ask::ask;
use repo_chat::config;
use repo_chat::engine::Engine;
use repo_chat::ingest::{index_repository, IndexSummary};
use repo_chat::session::{Session, SessionRegistry};

#[derive(Parser)]
#[command(
    name = "repo-chat",
    about = "Ask natural-language questions about a local repository",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./repo-chat.toml` when present, otherwise built-in
    /// defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a local repository.
    ///
    /// Walks the directory, embeds every eligible file and stores it in the
    /// collection for that repository. Re-running replaces documents by path.
    Index {
        /// Repository root directory.
        path: PathBuf,
    },

    /// Ask one question about a previously indexed repository.
    Ask {
        /// Repository root directory.
        path: PathBuf,
        /// The question.
        question: String,
    },

    /// Start an interactive session.
    ///
    /// Lines are questions, except `:index <path>`, `:history`, `:reset`
    /// and `:quit`.
    Chat {
        /// Repository to attach at start (must already be indexed).
        path: Option<PathBuf>,
    },

    /// List indexed repositories.
    Collections,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_or_default(cli.config.as_deref())?;
    let engine = Engine::from_config(cfg).await?;

    match cli.command {
        Commands::Index { path } => {
            let mut session = Session::new(uuid::Uuid::new_v4());
            let summary = index_repository(&engine, &mut session, &path)
                .await
                .with_context(|| format!("Failed to index {}", path.display()))?;
            print_summary(&summary);
        }
        Commands::Ask { path, question } => {
            let mut session = Session::new(uuid::Uuid::new_v4());
            if let Some(index) = engine.attach_existing(&path).await? {
                session.attach(index);
            }
            println!("{}", ask(&engine, &mut session, &question).await);
        }
        Commands::Chat { path } => run_chat(&engine, path.as_deref()).await?,
        Commands::Collections => {
            let collections = engine.store().collections().await?;
            println!("collections");
            if collections.is_empty() {
                println!("  (none)");
            }
            for c in collections {
                let created = chrono::DateTime::from_timestamp(c.created_at, 0)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| c.created_at.to_string());
                println!(
                    "  {}  documents: {}  model: {}  dims: {}  created: {}",
                    c.name,
                    c.documents,
                    c.embedding_model.as_deref().unwrap_or("-"),
                    c.dims.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
                    created
                );
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &IndexSummary) {
    println!("index {}", summary.root.display());
    println!("  collection: {}", summary.collection);
    println!("  documents indexed: {}", summary.documents_indexed);
    println!("  skipped (unreadable): {}", summary.skipped_unreadable);
    println!("  skipped (empty): {}", summary.skipped_empty);
    println!("ok");
}

async fn run_chat(engine: &Engine, path: Option<&Path>) -> Result<()> {
    let registry = SessionRegistry::new();
    let id = registry.create().await;
    let handle = registry
        .get(id)
        .await
        .context("session disappeared after creation")?;

    if let Some(path) = path {
        match engine.attach_existing(path).await? {
            Some(index) => handle.lock().await.attach(index),
            None => eprintln!(
                "{} is not indexed yet; use :index {}",
                path.display(),
                path.display()
            ),
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let mut session = handle.lock().await;
        match line.split_once(char::is_whitespace).unwrap_or((line, "")) {
            (":quit", _) | (":exit", _) => break,
            (":reset", _) => {
                session.conversation.reset();
                println!("history cleared");
            }
            (":history", _) => {
                for turn in session.conversation.history() {
                    println!("{}", serde_json::to_string(turn)?);
                }
            }
            (":index", arg) if !arg.trim().is_empty() => {
                let target = PathBuf::from(arg.trim());
                match index_repository(engine, &mut session, &target).await {
                    Ok(summary) => print_summary(&summary),
                    Err(e) => eprintln!("Failed to index {}: {}", target.display(), e),
                }
            }
            (":index", _) => eprintln!("usage: :index <path>"),
            _ => println!("{}", ask(engine, &mut session, line).await),
        }
    }

    registry.end(id).await;
    Ok(())
}
