//! Per-card state for the result list: copy feedback and streamed execution.

use crate::app::background::spawn_background;
use crate::app::messages::BackgroundMessage;
use crate::llm::{GenerationError, GenerationService};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

pub const COPIED_FLAG_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
pub struct CardState {
    copied_at: Option<Instant>,
    pub output: String,
    pub error: Option<GenerationError>,
    running: bool,
    run: u64,
    cancel: Option<CancellationToken>,
}

impl CardState {
    pub fn is_copied(&self, now: Instant) -> bool {
        self.copied_at
            .is_some_and(|at| now.duration_since(at) < COPIED_FLAG_DURATION)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_output(&self) -> bool {
        !self.output.is_empty() || self.error.is_some()
    }

    fn stop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.running = false;
    }
}

/// Card states for the current result list.
///
/// A deck is tied to one result epoch; when the results are replaced the
/// deck is rebuilt and in-flight executions are cancelled.
pub struct CardDeck {
    service: Arc<dyn GenerationService>,
    tx: mpsc::Sender<BackgroundMessage>,
    epoch: u64,
    cards: Vec<CardState>,
    pub selected: usize,
}

impl CardDeck {
    pub fn new(service: Arc<dyn GenerationService>, tx: mpsc::Sender<BackgroundMessage>) -> Self {
        Self {
            service,
            tx,
            epoch: 0,
            cards: Vec::new(),
            selected: 0,
        }
    }

    pub fn cards(&self) -> &[CardState] {
        &self.cards
    }

    pub fn get(&self, index: usize) -> Option<&CardState> {
        self.cards.get(index)
    }

    /// Follow the result list: rebuild on a new epoch, grow as results are revealed
    pub fn sync(&mut self, epoch: u64, len: usize) {
        if epoch != self.epoch {
            self.reset();
            self.epoch = epoch;
        }
        if self.cards.len() < len {
            self.cards.resize_with(len, CardState::default);
        } else if self.cards.len() > len {
            for card in self.cards.iter_mut().skip(len) {
                card.stop();
            }
            self.cards.truncate(len);
        }
        if self.selected >= self.cards.len() {
            self.selected = self.cards.len().saturating_sub(1);
        }
    }

    fn reset(&mut self) {
        for card in &mut self.cards {
            card.stop();
        }
        self.cards.clear();
        self.selected = 0;
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.cards.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn mark_copied(&mut self, index: usize, now: Instant) {
        if let Some(card) = self.cards.get_mut(index) {
            card.copied_at = Some(now);
        }
    }

    /// Stream a completion of `prompt` into the card, replacing any earlier run
    pub fn execute(&mut self, index: usize, prompt: String) {
        let deck = self.epoch;
        let Some(card) = self.cards.get_mut(index) else {
            return;
        };
        card.stop();
        card.run += 1;
        card.output.clear();
        card.error = None;
        card.running = true;
        let token = CancellationToken::new();
        card.cancel = Some(token.clone());

        let run = card.run;
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        tracing::debug!(card = index, run, "Executing prompt");
        spawn_background(self.tx.clone(), "prompt_execution", async move {
            let chunk_tx = tx.clone();
            let error_tx = tx.clone();
            service
                .execute_prompt_stream(
                    &prompt,
                    Box::new(move |text| {
                        let _ = chunk_tx.send(BackgroundMessage::ExecutionChunk {
                            deck,
                            card: index,
                            run,
                            text,
                        });
                    }),
                    Box::new(move |error| {
                        let _ = error_tx.send(BackgroundMessage::ExecutionFailed {
                            deck,
                            card: index,
                            run,
                            error,
                        });
                    }),
                    token,
                )
                .await;
            let _ = tx.send(BackgroundMessage::ExecutionFinished {
                deck,
                card: index,
                run,
            });
        });
    }

    pub fn cancel(&mut self, index: usize) {
        if let Some(card) = self.cards.get_mut(index) {
            card.stop();
        }
    }

    /// The live card a message addresses, if the message is still current
    fn current(&mut self, deck: u64, index: usize, run: u64) -> Option<&mut CardState> {
        if deck != self.epoch {
            return None;
        }
        self.cards
            .get_mut(index)
            .filter(|card| card.run == run && card.running)
    }

    pub fn on_chunk(&mut self, deck: u64, index: usize, run: u64, text: &str) {
        if let Some(card) = self.current(deck, index, run) {
            card.output.push_str(text);
        }
    }

    pub fn on_error(&mut self, deck: u64, index: usize, run: u64, error: GenerationError) {
        if let Some(card) = self.current(deck, index, run) {
            card.error = Some(error);
            card.running = false;
            card.cancel = None;
        }
    }

    pub fn on_finished(&mut self, deck: u64, index: usize, run: u64) {
        if let Some(card) = self.current(deck, index, run) {
            card.running = false;
            card.cancel = None;
        }
    }

    pub fn is_any_running(&self) -> bool {
        self.cards.iter().any(CardState::is_running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::FakeService;

    fn deck_with(service: FakeService) -> (CardDeck, mpsc::Receiver<BackgroundMessage>) {
        let (tx, rx) = mpsc::channel();
        let mut deck = CardDeck::new(Arc::new(service), tx);
        deck.sync(1, 2);
        (deck, rx)
    }

    fn drain_until_finished(deck: &mut CardDeck, rx: &mpsc::Receiver<BackgroundMessage>) {
        loop {
            let msg = tokio::task::block_in_place(|| rx.recv_timeout(Duration::from_secs(5)))
                .expect("execution message");
            match msg {
                BackgroundMessage::ExecutionChunk {
                    deck: d,
                    card,
                    run,
                    text,
                } => deck.on_chunk(d, card, run, &text),
                BackgroundMessage::ExecutionFailed {
                    deck: d,
                    card,
                    run,
                    error,
                } => deck.on_error(d, card, run, error),
                BackgroundMessage::ExecutionFinished { deck: d, card, run } => {
                    deck.on_finished(d, card, run);
                    return;
                }
                other => panic!("unexpected message {:?}", other),
            }
        }
    }

    #[test]
    fn test_copied_flag_resets_after_two_seconds() {
        let (tx, _rx) = mpsc::channel();
        let mut deck = CardDeck::new(Arc::new(FakeService::default()), tx);
        deck.sync(1, 1);
        let start = Instant::now();
        deck.mark_copied(0, start);
        assert!(deck.cards()[0].is_copied(start + Duration::from_millis(1999)));
        assert!(!deck.cards()[0].is_copied(start + COPIED_FLAG_DURATION));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execution_streams_into_card() {
        let (mut deck, rx) = deck_with(FakeService::default());
        deck.execute(1, "Say hello".into());
        assert!(deck.cards()[1].is_running());
        drain_until_finished(&mut deck, &rx);

        let card = &deck.cards()[1];
        assert_eq!(card.output, "Hello world");
        assert!(card.error.is_none());
        assert!(!card.is_running());
        assert!(deck.cards()[0].output.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_execution_error_is_scoped_to_card() {
        let service = FakeService {
            chunks: vec!["partial".into()],
            stream_error: Some(GenerationError::RateLimited("slow down".into())),
            ..FakeService::default()
        };
        let (mut deck, rx) = deck_with(service);
        deck.execute(0, "Go".into());
        drain_until_finished(&mut deck, &rx);

        let card = &deck.cards()[0];
        assert_eq!(card.output, "partial");
        assert!(matches!(card.error, Some(GenerationError::RateLimited(_))));
        assert!(deck.cards()[1].error.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_new_epoch_cancels_and_drops_late_chunks() {
        let service = FakeService {
            hold_stream: true,
            ..FakeService::default()
        };
        let (mut deck, rx) = deck_with(service);
        deck.execute(0, "Go".into());

        // Results replaced while the stream is open
        deck.sync(2, 1);
        assert!(!deck.cards()[0].is_running());

        drain_until_finished(&mut deck, &rx);
        assert!(deck.cards()[0].output.is_empty());
    }

    #[test]
    fn test_sync_grows_with_reveals() {
        let (tx, _rx) = mpsc::channel();
        let mut deck = CardDeck::new(Arc::new(FakeService::default()), tx);
        deck.sync(3, 1);
        deck.mark_copied(0, Instant::now());
        deck.sync(3, 2);
        assert_eq!(deck.cards().len(), 2);
        assert!(deck.cards()[0].is_copied(Instant::now()));
        deck.select_next();
        deck.select_next();
        assert_eq!(deck.selected, 1);
    }
}
