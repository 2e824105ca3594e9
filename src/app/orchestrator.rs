//! Application state and the workflows that mutate it.
//!
//! Everything here runs on the event-loop thread. Remote calls are spawned
//! as tokio tasks that report back through `BackgroundMessage`s; timers are
//! deadlines checked by `tick`.

use crate::app::background::{spawn_background, spawn_guarded};
use crate::app::debounce::Debouncer;
use crate::app::messages::BackgroundMessage;
use crate::catalog::Category;
use crate::draft::{Draft, DraftRecord};
use crate::history::{HistoryItem, HistoryLog};
use crate::llm::{EnhancedPrompt, GenerationError, GenerationService};
use crate::store::{Store, DRAFT_KEY, HISTORY_KEY, TEMPLATES_KEY};
use crate::templates::{self, PromptTemplate, TemplateNameError, TemplateShelf};
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const DRAFT_SAVE_DELAY: Duration = Duration::from_millis(500);
pub const CATEGORY_SUGGEST_DELAY: Duration = Duration::from_secs(1);
pub const REVEAL_INTERVAL: Duration = Duration::from_millis(100);
/// Fewer words than this never trigger a category suggestion
pub const MIN_SUGGESTION_WORDS: usize = 3;

/// Where the current submission is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    SelectingTechniques,
    Enhancing,
    Revealing,
    Failed,
}

impl Phase {
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Phase::SelectingTechniques | Phase::Enhancing | Phase::Revealing
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Idle => "Ready",
            Phase::SelectingTechniques => "Selecting techniques...",
            Phase::Enhancing => "Enhancing prompt...",
            Phase::Revealing => "Preparing results...",
            Phase::Failed => "Failed",
        }
    }
}

/// Submission rejected before anything was sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Enter a prompt first.")]
    EmptyPrompt,
    #[error("Manual mode needs at least one technique.")]
    NoTechniques,
    #[error("A submission is already running.")]
    InFlight,
}

/// The draft as it was when submit was pressed
#[derive(Debug, Clone)]
struct Submission {
    id: u64,
    prompt: String,
    category: Category,
}

#[derive(Debug)]
struct Reveal {
    submission: Submission,
    outputs: Vec<EnhancedPrompt>,
    pending: VecDeque<EnhancedPrompt>,
    next_at: Instant,
}

pub struct Orchestrator {
    service: Arc<dyn GenerationService>,
    store: Store,
    tx: mpsc::Sender<BackgroundMessage>,

    draft: Draft,
    results: Vec<EnhancedPrompt>,
    /// Bumped whenever the result list is replaced or cleared
    results_epoch: u64,
    history: HistoryLog,
    templates: TemplateShelf,

    phase: Phase,
    error: Option<GenerationError>,
    validation_error: Option<ValidationError>,
    active: Option<Submission>,
    next_submission: u64,
    techniques_in_use: Vec<String>,
    reveal: Option<Reveal>,

    draft_save: Debouncer<()>,
    category_timer: Debouncer<()>,
    suggestion_generation: u64,
    suggesting_category: bool,
    suppress_next_suggestion: bool,
}

impl Orchestrator {
    /// Restore draft, history and templates from the store
    pub fn load(
        service: Arc<dyn GenerationService>,
        store: Store,
        tx: mpsc::Sender<BackgroundMessage>,
        now: Instant,
    ) -> Self {
        let draft = Draft::from_record(store.load::<DraftRecord>(DRAFT_KEY));
        let history: HistoryLog = store.load(HISTORY_KEY);
        let templates: TemplateShelf = store.load(TEMPLATES_KEY);
        tracing::debug!(
            history = history.len(),
            templates = templates.len(),
            "Loaded saved state"
        );

        let mut orchestrator = Self {
            service,
            store,
            tx,
            draft,
            results: Vec::new(),
            results_epoch: 0,
            history,
            templates,
            phase: Phase::Idle,
            error: None,
            validation_error: None,
            active: None,
            next_submission: 1,
            techniques_in_use: Vec::new(),
            reveal: None,
            draft_save: Debouncer::new(DRAFT_SAVE_DELAY),
            category_timer: Debouncer::new(CATEGORY_SUGGEST_DELAY),
            suggestion_generation: 0,
            suggesting_category: false,
            suppress_next_suggestion: false,
        };
        orchestrator.reevaluate_suggestion(now);
        orchestrator
    }

    // ── accessors ──────────────────────────────────────────────────────────

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn results(&self) -> &[EnhancedPrompt] {
        &self.results
    }

    pub fn results_epoch(&self) -> u64 {
        self.results_epoch
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn templates(&self) -> &TemplateShelf {
        &self.templates
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn error(&self) -> Option<&GenerationError> {
        self.error.as_ref()
    }

    pub fn validation_error(&self) -> Option<ValidationError> {
        self.validation_error
    }

    pub fn suggesting_category(&self) -> bool {
        self.suggesting_category
    }

    /// Techniques feeding the running (or last) enhancement
    pub fn techniques_in_use(&self) -> &[String] {
        &self.techniques_in_use
    }

    /// Results still waiting to be revealed
    pub fn pending_reveals(&self) -> usize {
        self.reveal.as_ref().map_or(0, |r| r.pending.len())
    }

    // ── draft edits ────────────────────────────────────────────────────────

    pub fn set_prompt(&mut self, markup: &str, now: Instant) {
        if self.draft.prompt == markup {
            return;
        }
        self.draft.prompt = markup.to_string();
        self.validation_error = None;
        self.draft_save.arm(now, ());
        self.reevaluate_suggestion(now);
    }

    pub fn set_context_note(&mut self, note: &str, now: Instant) {
        if self.draft.context_note == note {
            return;
        }
        self.draft.context_note = note.to_string();
        self.draft_save.arm(now, ());
    }

    pub fn set_category(&mut self, category: Category, now: Instant) {
        if self.draft.category == category {
            return;
        }
        self.draft.category = category;
        self.draft_save.arm(now, ());
    }

    /// Switch technique mode. Ignored while a submission runs.
    pub fn set_automatic(&mut self, automatic: bool, now: Instant) -> bool {
        if self.is_busy() || self.draft.automatic == automatic {
            return false;
        }
        self.draft.automatic = automatic;
        self.validation_error = None;
        self.reevaluate_suggestion(now);
        true
    }

    pub fn add_technique(&mut self, name: &str) -> bool {
        let added = self.draft.add_technique(name);
        if added {
            self.validation_error = None;
        }
        added
    }

    pub fn remove_technique(&mut self, name: &str) -> bool {
        self.draft.remove_technique(name)
    }

    pub fn toggle_technique(&mut self, name: &str) {
        if !self.remove_technique(name) {
            self.add_technique(name);
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
        self.validation_error = None;
        if self.phase == Phase::Failed {
            self.phase = Phase::Idle;
        }
    }

    // ── submission ─────────────────────────────────────────────────────────

    /// Validate the draft and start technique selection / enhancement.
    /// Returns the submission id.
    pub fn submit(&mut self, now: Instant) -> Result<u64, ValidationError> {
        let validation = if self.is_busy() {
            Err(ValidationError::InFlight)
        } else if self.draft.plain_text().trim().is_empty() {
            Err(ValidationError::EmptyPrompt)
        } else if !self.draft.automatic && self.draft.techniques.is_empty() {
            Err(ValidationError::NoTechniques)
        } else {
            Ok(())
        };
        if let Err(err) = validation {
            self.validation_error = Some(err);
            return Err(err);
        }

        self.validation_error = None;
        self.error = None;
        self.clear_results();
        self.reveal = None;

        let id = self.next_submission;
        self.next_submission += 1;
        let submission = Submission {
            id,
            prompt: self.draft.prompt.clone(),
            category: self.draft.category,
        };
        self.active = Some(submission);

        let automatic = self.draft.automatic;
        self.phase = if automatic {
            Phase::SelectingTechniques
        } else {
            Phase::Enhancing
        };
        self.techniques_in_use = if automatic {
            Vec::new()
        } else {
            self.draft.techniques.clone()
        };
        tracing::info!(
            submission = id,
            automatic,
            category = self.draft.category.label(),
            "Submitting prompt"
        );
        self.spawn_submission(id, automatic);
        self.reevaluate_suggestion(now);
        Ok(id)
    }

    fn spawn_submission(&self, submission: u64, automatic: bool) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let plain = self.draft.plain_text();
        let category = self.draft.category;
        let context = self.draft.context_note.clone();
        let manual = self.draft.techniques.clone();

        spawn_guarded(
            self.tx.clone(),
            "submission",
            async move {
                let techniques = if automatic {
                    let context = Some(context.trim()).filter(|c| !c.is_empty());
                    match service.select_techniques(&plain, category, context).await {
                        Ok(techniques) => {
                            let _ = tx.send(BackgroundMessage::TechniquesSelected {
                                submission,
                                techniques: techniques.clone(),
                            });
                            techniques
                        }
                        Err(error) => {
                            let _ = tx.send(BackgroundMessage::SubmissionFailed { submission, error });
                            return;
                        }
                    }
                } else {
                    manual
                };

                let message = match service.enhance_prompt(&plain, category, &techniques).await {
                    Ok(results) => BackgroundMessage::EnhancementReady {
                        submission,
                        results,
                    },
                    Err(error) => BackgroundMessage::SubmissionFailed { submission, error },
                };
                let _ = tx.send(message);
            },
            move |detail| BackgroundMessage::SubmissionFailed {
                submission,
                error: GenerationError::Connectivity(format!("internal error: {}", detail)),
            },
        );
    }

    fn is_active(&self, submission: u64) -> bool {
        self.active.as_ref().is_some_and(|s| s.id == submission)
    }

    pub fn on_techniques_selected(&mut self, submission: u64, techniques: Vec<String>) {
        if !self.is_active(submission) || self.phase != Phase::SelectingTechniques {
            return;
        }
        tracing::debug!(submission, ?techniques, "Techniques selected");
        self.techniques_in_use = techniques;
        self.phase = Phase::Enhancing;
    }

    pub fn on_enhancement_ready(
        &mut self,
        submission: u64,
        results: Vec<EnhancedPrompt>,
        now: Instant,
    ) {
        if !self.is_active(submission) {
            return;
        }
        if results.is_empty() {
            self.fail(
                GenerationError::MalformedResponse("no usable enhanced prompts".to_string()),
                now,
            );
            return;
        }
        let Some(active) = self.active.clone() else {
            return;
        };
        tracing::debug!(submission, count = results.len(), "Enhancement ready");
        self.phase = Phase::Revealing;
        self.reveal = Some(Reveal {
            submission: active,
            pending: results.iter().cloned().collect(),
            outputs: results,
            next_at: now,
        });
        self.advance_reveal(now);
    }

    pub fn on_submission_failed(&mut self, submission: u64, error: GenerationError, now: Instant) {
        if !self.is_active(submission) {
            return;
        }
        self.fail(error, now);
    }

    fn fail(&mut self, error: GenerationError, now: Instant) {
        tracing::warn!("Submission failed: {}", error);
        self.phase = Phase::Failed;
        self.error = Some(error);
        self.active = None;
        self.reveal = None;
        self.clear_results();
        self.reevaluate_suggestion(now);
    }

    /// Reveal due results; after the last one, record the submission in history.
    fn advance_reveal(&mut self, now: Instant) {
        loop {
            let Some(reveal) = self.reveal.as_mut() else {
                return;
            };
            if now < reveal.next_at {
                return;
            }
            if let Some(next) = reveal.pending.pop_front() {
                self.results.push(next);
                reveal.next_at += REVEAL_INTERVAL;
                continue;
            }
            let Some(done) = self.reveal.take() else {
                return;
            };
            self.commit_history(done);
            self.active = None;
            self.phase = Phase::Idle;
            self.reevaluate_suggestion(now);
            return;
        }
    }

    fn commit_history(&mut self, reveal: Reveal) {
        let item = HistoryItem::new(
            reveal.submission.prompt,
            reveal.submission.category,
            reveal.outputs,
            Utc::now(),
        );
        tracing::info!(id = %item.id, outputs = item.outputs.len(), "Recorded history item");
        self.history.push(item);
        self.persist_history();
    }

    fn clear_results(&mut self) {
        self.results.clear();
        self.results_epoch += 1;
    }

    // ── timers ─────────────────────────────────────────────────────────────

    /// Fire due debounces and reveals
    pub fn tick(&mut self, now: Instant) {
        if self.draft_save.poll(now).is_some() {
            self.persist_draft();
        }
        if self.category_timer.poll(now).is_some() && self.suggestion_allowed() {
            self.spawn_category_suggestion();
        }
        self.advance_reveal(now);
    }

    /// Earliest pending deadline, for tests and idle polling
    pub fn next_deadline(&self) -> Option<Instant> {
        [
            self.draft_save.deadline(),
            self.category_timer.deadline(),
            self.reveal.as_ref().map(|r| r.next_at),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    fn suggestion_allowed(&self) -> bool {
        self.draft.automatic
            && !self.is_busy()
            && self.draft.word_count() >= MIN_SUGGESTION_WORDS
    }

    /// Re-run the category suggestion trigger after its inputs changed.
    ///
    /// Any pending timer is cancelled and any in-flight suggestion goes stale.
    fn reevaluate_suggestion(&mut self, now: Instant) {
        self.suggestion_generation += 1;
        self.category_timer.cancel();
        self.suggesting_category = false;
        if self.suppress_next_suggestion {
            self.suppress_next_suggestion = false;
            return;
        }
        if self.suggestion_allowed() {
            self.category_timer.arm(now, ());
        }
    }

    fn spawn_category_suggestion(&mut self) {
        let generation = self.suggestion_generation;
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let plain = self.draft.plain_text().trim().to_string();
        self.suggesting_category = true;
        tracing::debug!(generation, "Requesting category suggestion");
        spawn_background(self.tx.clone(), "category_suggestion", async move {
            let category = service.suggest_category(&plain).await;
            let _ = tx.send(BackgroundMessage::CategorySuggested {
                generation,
                category,
            });
        });
    }

    pub fn on_category_suggested(
        &mut self,
        generation: u64,
        category: Option<Category>,
        now: Instant,
    ) {
        if generation != self.suggestion_generation {
            tracing::debug!(generation, "Discarding stale category suggestion");
            return;
        }
        self.suggesting_category = false;
        if let Some(category) = category {
            self.set_category(category, now);
        }
    }

    // ── history ────────────────────────────────────────────────────────────

    /// Show a past submission: prompt, category and outputs come back,
    /// the form returns to automatic mode.
    pub fn select_history_item(&mut self, id: &str, now: Instant) -> bool {
        if self.is_busy() {
            return false;
        }
        let Some(item) = self.history.get(id).cloned() else {
            return false;
        };
        self.suppress_next_suggestion = true;
        self.draft.prompt = item.original_prompt;
        self.draft.category = item.category;
        self.draft.context_note.clear();
        self.draft.automatic = true;
        self.draft.techniques.clear();
        self.clear_results();
        self.results = item.outputs;
        self.error = None;
        self.validation_error = None;
        self.phase = Phase::Idle;
        self.draft_save.arm(now, ());
        self.reevaluate_suggestion(now);
        true
    }

    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let favorite = self.history.toggle_favorite(id)?;
        self.persist_history();
        Some(favorite)
    }

    pub fn add_tag(&mut self, id: &str, tag: &str) -> bool {
        let added = self.history.add_tag(id, tag);
        if added {
            self.persist_history();
        }
        added
    }

    pub fn remove_tag(&mut self, id: &str, tag: &str) -> bool {
        let removed = self.history.remove_tag(id, tag);
        if removed {
            self.persist_history();
        }
        removed
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
        self.persist_history();
    }

    // ── templates ──────────────────────────────────────────────────────────

    pub fn save_template(&mut self, name: &str) -> Result<String, TemplateNameError> {
        let name = templates::validate_name(name)?;
        let template = PromptTemplate::from_draft(name, &self.draft, Utc::now());
        let id = template.id.clone();
        self.templates.add(template);
        self.persist_templates();
        Ok(id)
    }

    /// Restore the form exactly as the template captured it
    pub fn load_template(&mut self, id: &str, now: Instant) -> bool {
        if self.is_busy() {
            return false;
        }
        let Some(template) = self.templates.get(id).cloned() else {
            return false;
        };
        self.suppress_next_suggestion = true;
        self.draft = template.to_draft();
        self.clear_results();
        self.error = None;
        self.validation_error = None;
        self.phase = Phase::Idle;
        self.draft_save.arm(now, ());
        self.reevaluate_suggestion(now);
        true
    }

    pub fn delete_template(&mut self, id: &str) -> bool {
        let removed = self.templates.remove(id).is_some();
        if removed {
            self.persist_templates();
        }
        removed
    }

    // ── persistence ────────────────────────────────────────────────────────

    fn persist_draft(&self) {
        self.store.save(DRAFT_KEY, &self.draft.to_record());
    }

    fn persist_history(&self) {
        self.store.save(HISTORY_KEY, &self.history);
    }

    fn persist_templates(&self) {
        self.store.save(TEMPLATES_KEY, &self.templates);
    }

    /// Write any pending draft change now (used on quit)
    pub fn flush(&mut self) {
        if self.draft_save.is_pending() {
            self.draft_save.cancel();
            self.persist_draft();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_LIMIT;
    use crate::llm::fake::{result, FakeService};
    use crate::store::{KvBackend, MemoryBackend};

    struct Harness {
        orchestrator: Orchestrator,
        rx: mpsc::Receiver<BackgroundMessage>,
        service: Arc<FakeService>,
        backend: Arc<MemoryBackend>,
        start: Instant,
    }

    impl Harness {
        fn new(service: FakeService) -> Self {
            Self::with_backend(service, Arc::new(MemoryBackend::new()))
        }

        fn with_backend(service: FakeService, backend: Arc<MemoryBackend>) -> Self {
            let service = Arc::new(service);
            let (tx, rx) = mpsc::channel();
            let start = Instant::now();
            let orchestrator = Orchestrator::load(
                service.clone(),
                Store::new(backend.clone()),
                tx,
                start,
            );
            Self {
                orchestrator,
                rx,
                service,
                backend,
                start,
            }
        }

        fn at(&self, ms: u64) -> Instant {
            self.start + Duration::from_millis(ms)
        }

        /// Wait for the next background message and feed it in at `now`
        async fn pump(&mut self, now: Instant) {
            let rx = &self.rx;
            let msg = tokio::task::block_in_place(|| rx.recv_timeout(Duration::from_secs(5)))
                .expect("background message");
            match msg {
                BackgroundMessage::TechniquesSelected {
                    submission,
                    techniques,
                } => self
                    .orchestrator
                    .on_techniques_selected(submission, techniques),
                BackgroundMessage::EnhancementReady {
                    submission,
                    results,
                } => self
                    .orchestrator
                    .on_enhancement_ready(submission, results, now),
                BackgroundMessage::SubmissionFailed { submission, error } => self
                    .orchestrator
                    .on_submission_failed(submission, error, now),
                BackgroundMessage::CategorySuggested {
                    generation,
                    category,
                } => self
                    .orchestrator
                    .on_category_suggested(generation, category, now),
                other => panic!("unexpected message {:?}", other),
            }
        }

        fn stored_history(&self) -> Vec<HistoryItem> {
            let raw = self.backend.get(HISTORY_KEY).unwrap().unwrap_or_default();
            serde_json::from_str(&raw).unwrap_or_default()
        }
    }

    fn history_with(count: usize) -> String {
        let base = Utc::now() - chrono::Duration::days(1);
        let items: Vec<HistoryItem> = (0..count)
            .map(|i| {
                HistoryItem::new(
                    format!("prompt {}", i),
                    Category::General,
                    vec![result("Chain-of-Thought", "x")],
                    base + chrono::Duration::seconds(i as i64),
                )
            })
            .rev()
            .collect();
        serde_json::to_string(&items).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_manual_mode_without_techniques_is_rejected_offline() {
        let mut h = Harness::new(FakeService::default());
        let now = h.at(0);
        h.orchestrator.set_prompt("Summarize this article", now);
        assert!(h.orchestrator.set_automatic(false, now));

        assert_eq!(
            h.orchestrator.submit(now),
            Err(ValidationError::NoTechniques)
        );
        assert_eq!(
            h.orchestrator.validation_error(),
            Some(ValidationError::NoTechniques)
        );
        assert!(h.orchestrator.error().is_none());
        assert_eq!(h.orchestrator.phase(), Phase::Idle);
        assert_eq!(FakeService::calls(&h.service.select_calls), 0);
        assert_eq!(FakeService::calls(&h.service.enhance_calls), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_prompt_is_rejected() {
        let mut h = Harness::new(FakeService::default());
        h.orchestrator.set_prompt("**  **", h.at(0));
        assert_eq!(
            h.orchestrator.submit(h.at(0)),
            Err(ValidationError::EmptyPrompt)
        );
        assert_eq!(FakeService::calls(&h.service.select_calls), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_summarize_scenario_end_to_end() {
        let mut h = Harness::new(FakeService::default());
        h.orchestrator
            .set_prompt("Summarize book X in 200 words", h.at(0));

        // Category suggestion after one quiet second
        h.orchestrator.tick(h.at(999));
        assert_eq!(FakeService::calls(&h.service.category_calls), 0);
        h.orchestrator.tick(h.at(1000));
        assert!(h.orchestrator.suggesting_category());
        h.pump(h.at(1100)).await;
        assert_eq!(h.orchestrator.draft().category, Category::Writing);
        assert!(!h.orchestrator.suggesting_category());

        // Submit: selection, then enhancement
        h.orchestrator.submit(h.at(2000)).unwrap();
        assert_eq!(h.orchestrator.phase(), Phase::SelectingTechniques);
        h.pump(h.at(2010)).await;
        assert_eq!(h.orchestrator.phase(), Phase::Enhancing);
        assert_eq!(
            h.orchestrator.techniques_in_use(),
            &["Chain-of-Thought".to_string(), "Persona Prompting".to_string()]
        );
        h.pump(h.at(2020)).await;

        // First result immediately, the second 100ms later
        assert_eq!(h.orchestrator.phase(), Phase::Revealing);
        assert_eq!(h.orchestrator.results().len(), 1);
        h.orchestrator.tick(h.at(2119));
        assert_eq!(h.orchestrator.results().len(), 1);
        h.orchestrator.tick(h.at(2120));
        assert_eq!(h.orchestrator.results().len(), 2);
        assert!(h.orchestrator.history().is_empty());

        h.orchestrator.tick(h.at(2220));
        assert_eq!(h.orchestrator.phase(), Phase::Idle);
        let item = &h.orchestrator.history().items()[0];
        assert_eq!(item.original_prompt, "Summarize book X in 200 words");
        assert_eq!(item.category, Category::Writing);
        assert_eq!(item.outputs.len(), 2);
        assert_eq!(h.stored_history().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_two_changes_within_a_second_make_one_category_call() {
        let mut h = Harness::new(FakeService::default());
        h.orchestrator.set_prompt("Write a cover letter", h.at(0));
        h.orchestrator
            .set_prompt("Write a cover letter for a designer", h.at(600));

        h.orchestrator.tick(h.at(1000));
        assert_eq!(FakeService::calls(&h.service.category_calls), 0);
        h.orchestrator.tick(h.at(1600));
        h.pump(h.at(1700)).await;
        h.orchestrator.tick(h.at(5000));
        assert_eq!(FakeService::calls(&h.service.category_calls), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_short_prompt_or_manual_mode_never_suggests() {
        let mut h = Harness::new(FakeService::default());
        h.orchestrator.set_prompt("two words", h.at(0));
        h.orchestrator.tick(h.at(2000));
        assert!(h.orchestrator.next_deadline().is_none());

        h.orchestrator.set_automatic(false, h.at(2000));
        h.orchestrator
            .set_prompt("now there are plenty of words", h.at(2100));
        h.orchestrator.tick(h.at(5000));
        assert_eq!(FakeService::calls(&h.service.category_calls), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stale_category_suggestion_is_ignored() {
        let mut h = Harness::new(FakeService::default());
        h.orchestrator.set_prompt("Draft a launch email", h.at(0));
        h.orchestrator.tick(h.at(1000));
        // The user keeps typing before the reply lands
        h.orchestrator
            .set_prompt("Draft a launch email for developers", h.at(1050));
        h.pump(h.at(1100)).await;
        assert_eq!(h.orchestrator.draft().category, Category::General);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_empty_enhancement_fails_without_history() {
        let service = FakeService {
            enhanced: Ok(Vec::new()),
            ..FakeService::default()
        };
        let mut h = Harness::new(service);
        h.orchestrator.set_prompt("Explain recursion", h.at(0));
        h.orchestrator.set_automatic(false, h.at(0));
        h.orchestrator.add_technique("Chain-of-Thought");
        h.orchestrator.submit(h.at(0)).unwrap();
        h.pump(h.at(10)).await;

        assert_eq!(h.orchestrator.phase(), Phase::Failed);
        assert!(matches!(
            h.orchestrator.error(),
            Some(GenerationError::MalformedResponse(_))
        ));
        assert!(h.orchestrator.results().is_empty());
        assert!(h.orchestrator.history().is_empty());

        h.orchestrator.dismiss_error();
        assert!(h.orchestrator.error().is_none());
        assert_eq!(h.orchestrator.phase(), Phase::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_selection_failure_surfaces_one_error() {
        let service = FakeService {
            techniques: Err(GenerationError::SelectionFailed),
            ..FakeService::default()
        };
        let mut h = Harness::new(service);
        h.orchestrator.set_prompt("Plan a workshop", h.at(0));
        h.orchestrator.submit(h.at(0)).unwrap();
        h.pump(h.at(10)).await;

        assert_eq!(h.orchestrator.error(), Some(&GenerationError::SelectionFailed));
        assert_eq!(FakeService::calls(&h.service.enhance_calls), 0);
        assert!(!h.orchestrator.is_busy());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_history_evicts_oldest() {
        let backend = Arc::new(MemoryBackend::new());
        backend
            .set(HISTORY_KEY, &history_with(HISTORY_LIMIT))
            .unwrap();
        let mut h = Harness::with_backend(FakeService::default(), backend);
        assert_eq!(h.orchestrator.history().len(), HISTORY_LIMIT);
        let oldest = h.orchestrator.history().items()[HISTORY_LIMIT - 1].id.clone();

        h.orchestrator.set_prompt("Outline a blog post", h.at(0));
        h.orchestrator.submit(h.at(0)).unwrap();
        h.pump(h.at(10)).await;
        h.pump(h.at(20)).await;
        h.orchestrator.tick(h.at(1000));

        assert_eq!(h.orchestrator.history().len(), HISTORY_LIMIT);
        assert!(h.orchestrator.history().get(&oldest).is_none());
        assert_eq!(
            h.orchestrator.history().items()[0].original_prompt,
            "Outline a blog post"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_corrupt_history_loads_empty() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set(HISTORY_KEY, "[{\"id\": ").unwrap();
        let h = Harness::with_backend(FakeService::default(), backend);
        assert!(h.orchestrator.history().is_empty());
        assert_eq!(h.backend.quarantined(), vec![HISTORY_KEY.to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_draft_autosave_is_debounced() {
        let mut h = Harness::new(FakeService::default());
        h.orchestrator.set_prompt("a", h.at(0));
        h.orchestrator.set_context_note("for kids", h.at(300));
        h.orchestrator.tick(h.at(700));
        assert!(h.backend.get(DRAFT_KEY).unwrap().is_none());
        h.orchestrator.tick(h.at(800));

        let raw = h.backend.get(DRAFT_KEY).unwrap().unwrap();
        let record: DraftRecord = serde_json::from_str(&raw).unwrap();
        assert_eq!(record.prompt, "a");
        assert_eq!(record.prompt_context, "for kids");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_template_save_then_load_restores_form() {
        let mut h = Harness::new(FakeService::default());
        let now = h.at(0);
        h.orchestrator.set_prompt("- Compare **two** laptops", now);
        h.orchestrator.set_category(Category::Research, now);
        h.orchestrator.set_automatic(false, now);
        h.orchestrator.add_technique("Few-Shot Prompting");
        h.orchestrator.add_technique("Chain-of-Thought");
        h.orchestrator.set_context_note("budget under 1000", now);
        let saved = h.orchestrator.draft().clone();

        assert_eq!(
            h.orchestrator.save_template("   "),
            Err(TemplateNameError::Empty)
        );
        let id = h.orchestrator.save_template("Laptop compare").unwrap();

        h.orchestrator.set_prompt("something else entirely here", now);
        h.orchestrator.set_automatic(true, now);
        h.orchestrator.set_context_note("", now);
        h.orchestrator.set_category(Category::General, now);

        assert!(h.orchestrator.load_template(&id, h.at(10)));
        assert_eq!(h.orchestrator.draft(), &saved);
        assert!(h.orchestrator.results().is_empty());

        // Loading consumes the suggestion trigger: no category call follows
        h.orchestrator.tick(h.at(5000));
        assert_eq!(FakeService::calls(&h.service.category_calls), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_select_history_item_restores_outputs() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set(HISTORY_KEY, &history_with(2)).unwrap();
        let mut h = Harness::with_backend(FakeService::default(), backend);
        let now = h.at(0);
        h.orchestrator.set_automatic(false, now);
        h.orchestrator.add_technique("Chain-of-Thought");
        h.orchestrator.set_context_note("note", now);

        let id = h.orchestrator.history().items()[0].id.clone();
        let epoch = h.orchestrator.results_epoch();
        assert!(h.orchestrator.select_history_item(&id, h.at(10)));

        let draft = h.orchestrator.draft();
        assert_eq!(draft.prompt, "prompt 1");
        assert!(draft.automatic);
        assert!(draft.techniques.is_empty());
        assert!(draft.context_note.is_empty());
        assert_eq!(h.orchestrator.results().len(), 1);
        assert!(h.orchestrator.results_epoch() > epoch);

        h.orchestrator.tick(h.at(5000));
        assert_eq!(FakeService::calls(&h.service.category_calls), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_tags_and_favorites_persist() {
        let backend = Arc::new(MemoryBackend::new());
        backend.set(HISTORY_KEY, &history_with(1)).unwrap();
        let mut h = Harness::with_backend(FakeService::default(), backend);
        let id = h.orchestrator.history().items()[0].id.clone();

        assert!(h.orchestrator.add_tag(&id, " work "));
        assert!(!h.orchestrator.add_tag(&id, "work"));
        assert_eq!(h.orchestrator.toggle_favorite(&id), Some(true));
        let stored = h.stored_history();
        assert_eq!(stored[0].tags, vec!["work".to_string()]);
        assert!(stored[0].is_favorite);

        assert!(h.orchestrator.remove_tag(&id, "work"));
        h.orchestrator.clear_history();
        assert!(h.stored_history().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_mode_cannot_change_while_busy() {
        let mut h = Harness::new(FakeService::default());
        h.orchestrator.set_prompt("Describe the water cycle", h.at(0));
        h.orchestrator.submit(h.at(0)).unwrap();
        assert!(!h.orchestrator.set_automatic(false, h.at(1)));
        assert_eq!(
            h.orchestrator.submit(h.at(2)),
            Err(ValidationError::InFlight)
        );
        h.pump(h.at(10)).await;
        h.pump(h.at(20)).await;
        h.orchestrator.tick(h.at(500));
        assert!(!h.orchestrator.is_busy());
    }
}
