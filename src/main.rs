//! promptsmith - a terminal workbench for prompt engineering
//!
//! p r o m p t s m i t h
//!
//! Rewrites a prompt with a handful of prompting techniques, streams each
//! variant through the model, and keeps drafts, history and templates on disk.

use anyhow::Result;
use chrono::Local;
use clap::Parser;
use promptsmith::history::{self, HistoryFilter, HistoryLog};
use promptsmith::llm::{GenerationService, OpenRouterClient};
use promptsmith::store::{Store, HISTORY_KEY};
use promptsmith::{app, config, logging};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "promptsmith",
    about = "Terminal prompt-engineering workbench",
    long_about = "p r o m p t s m i t h\n\n\
                  Applies prompting techniques to your prompt, streams the\n\
                  enhanced variants, and keeps a searchable history.",
    version
)]
struct Args {
    /// Set up OpenRouter API key
    #[arg(long)]
    setup: bool,

    /// Directory for draft, history, templates and the log file
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Write the saved history as JSON into DIR and exit
    #[arg(long, value_name = "DIR")]
    export_history: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.setup {
        return setup_api_key();
    }

    let mut config = config::Config::load();
    let data_dir = config.resolve_data_dir(args.data_dir.as_deref());

    let log_path = logging::init(&data_dir, &config.log_filter())?;
    tracing::info!(data_dir = %data_dir.display(), "Starting promptsmith");

    let store = Store::open_dir(&data_dir);

    if let Some(dir) = args.export_history {
        return export_history(&store, &dir);
    }

    let settings = config.client_settings()?;
    let startup_notice = if settings.api_key.is_none() {
        tracing::warn!("No OpenRouter API key configured");
        Some("No API key found. Run `promptsmith --setup` or set OPENROUTER_API_KEY.".to_string())
    } else {
        None
    };

    let service: Arc<dyn GenerationService> = Arc::new(OpenRouterClient::new(settings)?);

    let result = app::run_tui(service, store, config.resolve_export_dir(), startup_notice).await;
    if let Err(err) = &result {
        tracing::error!("TUI exited with error: {:#}", err);
        eprintln!("  Details were written to {}", log_path.display());
    }
    result
}

/// Export every saved history item, newest first
fn export_history(store: &Store, dir: &Path) -> Result<()> {
    let log: HistoryLog = store.load(HISTORY_KEY);
    if log.is_empty() {
        println!("  No saved prompts to export.");
        return Ok(());
    }

    let items = log.view(&HistoryFilter::default(), chrono::Utc::now());
    let path = history::export(&items, dir, Local::now().date_naive())?;
    println!("  + Exported {} prompts to {}", items.len(), path.display());
    Ok(())
}

/// Set up the API key interactively
fn setup_api_key() -> Result<()> {
    config::setup_api_key_interactive()?;

    // Verify the key is readable
    let mut config = config::Config::load();
    match config.get_api_key() {
        Some(_) => {
            println!("  + API key verified and ready to use!");
        }
        None => {
            eprintln!();
            eprintln!("  ! Warning: API key was saved but cannot be read back.");
            eprintln!("  ! This may be due to keychain access issues.");
            eprintln!();
            eprintln!("  Workaround: Set the OPENROUTER_API_KEY environment variable:");
            eprintln!("    export OPENROUTER_API_KEY=\"your-key-here\"");
            eprintln!();
            return Err(anyhow::anyhow!("API key verification failed"));
        }
    }

    Ok(())
}
