//! TUI runtime for promptsmith
//!
//! One loop owns all state: drain background results, fire due timers,
//! draw, then wait up to 50ms for a key.

use crate::app::cards::CardDeck;
use crate::app::messages::BackgroundMessage;
use crate::app::orchestrator::Orchestrator;
use crate::app::{background, input};
use crate::llm::GenerationService;
use crate::store::Store;
use crate::ui::{self, App, ToastKind};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Run the TUI until the user quits.
///
/// `startup_notice` is shown as an error toast on the first frame.
pub async fn run_tui(
    service: Arc<dyn GenerationService>,
    store: Store,
    export_dir: PathBuf,
    startup_notice: Option<String>,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<BackgroundMessage>();
    let mut app = build_app(service, store, export_dir, startup_notice, tx);

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(err).context("Failed to enter alternate screen");
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(terminal) => terminal,
        Err(err) => {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            return Err(err.into());
        }
    };

    let result = run_loop(&mut terminal, &mut app, &rx);

    // Restore the terminal even when the loop failed
    app.orchestrator.flush();
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn build_app(
    service: Arc<dyn GenerationService>,
    store: Store,
    export_dir: PathBuf,
    startup_notice: Option<String>,
    tx: mpsc::Sender<BackgroundMessage>,
) -> App {
    let orchestrator = Orchestrator::load(Arc::clone(&service), store, tx.clone(), Instant::now());
    let cards = CardDeck::new(service, tx);
    let mut app = App::new(orchestrator, cards, export_dir);
    if let Some(notice) = startup_notice {
        app.show_toast_kind(&notice, ToastKind::Error);
    }
    app
}

fn run_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    rx: &mpsc::Receiver<BackgroundMessage>,
) -> Result<()> {
    loop {
        app.clear_expired_toast();
        app.tick_loading();

        // Check for background messages (non-blocking)
        background::drain_messages(app, rx);
        app.orchestrator.tick(Instant::now());
        app.sync_cards();

        terminal.draw(|f| ui::render(f, app))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    input::handle_key_event(app, key)?;
                }
            }
        }

        if app.should_quit {
            tracing::info!("Quit requested");
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::FakeService;

    #[test]
    fn test_startup_notice_becomes_error_toast() {
        let (tx, _rx) = mpsc::channel();
        let app = build_app(
            Arc::new(FakeService::default()),
            Store::in_memory(),
            std::env::temp_dir(),
            Some("No OpenRouter API key found".to_string()),
            tx,
        );
        let toast = app.toast.as_ref().expect("toast shown");
        assert_eq!(toast.kind, ToastKind::Error);
        assert!(toast.message.contains("API key"));
    }

    #[test]
    fn test_no_notice_means_no_toast() {
        let (tx, _rx) = mpsc::channel();
        let app = build_app(
            Arc::new(FakeService::default()),
            Store::in_memory(),
            std::env::temp_dir(),
            None,
            tx,
        );
        assert!(app.toast.is_none());
    }
}
