use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use inkwell_config::EngineConfig;
use inkwell_mod_history::{Author, HistoryConfig, HistoryQuery, HistoryService, SortOrder};

/// Operator tool for the inkwell post history store.
#[derive(Parser, Debug)]
#[command(name = "inkwell", version, about)]
struct Cli {
    /// Config file (defaults to inkwell.json next to the executable).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// History database directory; overrides config and environment.
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record new content as the next version of a document.
    Commit {
        doc_id: String,
        /// Read content from this file instead of stdin.
        #[arg(long)]
        file: Option<PathBuf>,
        #[arg(long)]
        uid: String,
        #[arg(long)]
        username: String,
        /// Defaults to the username.
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long, short, default_value = "")]
        message: String,
        /// Store full content instead of a diff.
        #[arg(long)]
        snapshot: bool,
    },
    /// List a document's versions with edit stats.
    History {
        doc_id: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long = "page-size")]
        page_size: Option<usize>,
        #[arg(long, value_enum, default_value_t = Order::Desc)]
        order: Order,
    },
    /// Print a document's content, current or at a version.
    Show {
        doc_id: String,
        /// Version timestamp in milliseconds.
        #[arg(long)]
        at: Option<u64>,
    },
    /// Discard every version after the given one.
    Reset { doc_id: String, timestamp: u64 },
    /// Fold every version up to the given one into a single snapshot.
    Squash { doc_id: String, timestamp: u64 },
    /// Replay a document's log and check it against its current content.
    Verify { doc_id: String },
    /// List documents that have history.
    Documents,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Order {
    Asc,
    Desc,
}

impl From<Order> for SortOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => SortOrder::Asc,
            Order::Desc => SortOrder::Desc,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(EngineConfig::config_path);
    let engine_config = EngineConfig::load_or_create(&config_path);
    let mut history_config = HistoryConfig::from(&engine_config);
    if let Some(dir) = cli.data_dir {
        history_config.data_dir = dir;
    }
    tracing::debug!(data_dir = %history_config.data_dir.display(), "Opening history store");

    let service = HistoryService::open(history_config)?;
    run(&service, cli.command)
}

fn run(service: &HistoryService, command: Command) -> Result<()> {
    match command {
        Command::Commit {
            doc_id,
            file,
            uid,
            username,
            nickname,
            message,
            snapshot,
        } => {
            let content = read_content(file.as_deref())?;
            let nickname = nickname.unwrap_or_else(|| username.clone());
            let author = Author::new(uid, username, nickname);
            print_json(&service.commit_edit(&doc_id, &content, &author, &message, snapshot)?)
        }
        Command::History {
            doc_id,
            page,
            page_size,
            order,
        } => {
            let query = HistoryQuery {
                page,
                page_size,
                sort_order: order.into(),
            };
            print_json(&service.get_history(&doc_id, &query)?)
        }
        Command::Show { doc_id, at } => print_json(&service.get_version_content(&doc_id, at)?),
        Command::Reset { doc_id, timestamp } => {
            print_json(&service.reset_to_version(&doc_id, timestamp)?)
        }
        Command::Squash { doc_id, timestamp } => {
            print_json(&service.squash_to_version(&doc_id, timestamp)?)
        }
        Command::Verify { doc_id } => print_json(&service.verify_document(&doc_id)?),
        Command::Documents => print_json(&service.list_documents()?),
    }
}

fn read_content(file: Option<&std::path::Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read content from stdin")?;
            Ok(content)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{json}");
    Ok(())
}
