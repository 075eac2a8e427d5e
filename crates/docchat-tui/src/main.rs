mod app;
mod cli;
mod handler;
mod tui;
mod ui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docchat_core::{BackendClient, Config, HistoryStore, Theme};

use app::App;
use tui::EventHandler;

/// Chat with your documents from the terminal.
///
/// Without a subcommand the interactive TUI starts.
#[derive(Parser)]
#[command(name = "docchat", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL (default: config file, then http://127.0.0.1:8000)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Where chat history and logs are kept (default: platform data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive TUI
    Tui,
    /// Ask one question and print the reply
    Ask {
        /// Your question
        query: String,
    },
    /// List uploaded documents
    Files {
        /// Use the older GET /files listing
        #[arg(long)]
        legacy: bool,
    },
    /// Upload a document
    Upload {
        /// Path to the file
        path: PathBuf,
    },
    /// Delete an uploaded document
    Delete {
        /// File name as listed by `files`
        name: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the saved conversation
    History,
    /// Erase the saved conversation
    Clear,
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("info")
        } else {
            EnvFilter::new("warn")
        }
    })
}

/// Log to a file so output doesn't tear the alternate screen
fn init_file_logging(data_dir: &Path, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create {}", data_dir.display()))?;
    let log_path = data_dir.join("docchat.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn init_stderr_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring unreadable config: {}", e);
        Config::new()
    });
    if cli.base_url.is_some() {
        config.base_url = cli.base_url.clone();
    }
    if cli.data_dir.is_some() {
        config.data_dir = cli.data_dir.clone();
    }

    let data_dir = config.data_dir()?;
    let api = BackendClient::new(config.base_url());
    let store = HistoryStore::open(&data_dir);

    if matches!(cli.command, None | Some(Commands::Tui)) {
        init_file_logging(&data_dir, cli.verbose)?;
    } else {
        init_stderr_logging(cli.verbose);
    }

    match cli.command {
        None | Some(Commands::Tui) => {
            info!(base_url = %api.base_url(), "starting tui");
            run_tui(api, store, Theme::from_dark_mode(config.dark_mode)).await
        }
        Some(Commands::Ask { query }) => cli::ask(&api, store, &query).await,
        Some(Commands::Files { legacy }) => cli::files(&api, legacy).await,
        Some(Commands::Upload { path }) => cli::upload(&api, &path).await,
        Some(Commands::Delete { name, yes }) => cli::delete(&api, &name, yes).await,
        Some(Commands::History) => cli::history(store),
        Some(Commands::Clear) => cli::clear(store),
    }
}

async fn run_tui(api: BackendClient, store: HistoryStore, theme: Theme) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let mut events = EventHandler::new();
    let mut app = App::new(api, store, theme, events.notifier());
    app.start_refresh();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event),
                None => break,
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    app.shutdown();
    tui::restore()?;
    result
}
