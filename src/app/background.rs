//! Background task handling
//!
//! Channel sends use `let _ =`: a send only fails once the receiver is gone,
//! which happens during shutdown when nobody needs the result.

use crate::app::messages::BackgroundMessage;
use crate::ui::App;
use crate::util::truncate;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::mpsc;
use std::time::Instant;

pub fn drain_messages(app: &mut App, rx: &mpsc::Receiver<BackgroundMessage>) {
    let now = Instant::now();
    while let Ok(msg) = rx.try_recv() {
        match msg {
            BackgroundMessage::TechniquesSelected {
                submission,
                techniques,
            } => app.orchestrator.on_techniques_selected(submission, techniques),
            BackgroundMessage::EnhancementReady {
                submission,
                results,
            } => app.orchestrator.on_enhancement_ready(submission, results, now),
            BackgroundMessage::SubmissionFailed { submission, error } => {
                app.orchestrator.on_submission_failed(submission, error, now)
            }
            BackgroundMessage::CategorySuggested {
                generation,
                category,
            } => app
                .orchestrator
                .on_category_suggested(generation, category, now),
            BackgroundMessage::ExecutionChunk {
                deck,
                card,
                run,
                text,
            } => app.cards.on_chunk(deck, card, run, &text),
            BackgroundMessage::ExecutionFailed {
                deck,
                card,
                run,
                error,
            } => app.cards.on_error(deck, card, run, error),
            BackgroundMessage::ExecutionFinished { deck, card, run } => {
                app.cards.on_finished(deck, card, run)
            }
            BackgroundMessage::Error(e) => {
                app.show_toast_kind(&truncate(&e, 80), crate::ui::ToastKind::Error);
            }
        }
    }
}

/// Spawn a task whose panic is reported as a generic error message
pub fn spawn_background<F>(tx: mpsc::Sender<BackgroundMessage>, task_name: &'static str, fut: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    spawn_guarded(tx, task_name, fut, move |detail| {
        BackgroundMessage::Error(format!(
            "Background task '{}' crashed unexpectedly: {}",
            task_name, detail
        ))
    });
}

/// Spawn a task, turning a panic into the message built by `on_panic`
pub fn spawn_guarded<F, P>(
    tx: mpsc::Sender<BackgroundMessage>,
    task_name: &'static str,
    fut: F,
    on_panic: P,
) where
    F: Future<Output = ()> + Send + 'static,
    P: FnOnce(String) -> BackgroundMessage + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(panic) = AssertUnwindSafe(fut).catch_unwind().await {
            let detail = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "unknown panic payload".to_string()
            };
            tracing::error!(task = task_name, "background task panicked: {}", detail);
            let _ = tx.send(on_panic(detail));
        }
    });
}
