//! Scripted `GenerationService` for tests.

use super::{ChunkSink, EnhancedPrompt, ErrorSink, GenerationError, GenerationService};
use crate::catalog::Category;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

pub(crate) struct FakeService {
    pub techniques: Result<Vec<String>, GenerationError>,
    pub category: Option<Category>,
    pub enhanced: Result<Vec<EnhancedPrompt>, GenerationError>,
    pub chunks: Vec<String>,
    pub stream_error: Option<GenerationError>,
    /// After the chunks, wait for cancellation instead of finishing
    pub hold_stream: bool,
    pub select_calls: AtomicUsize,
    pub category_calls: AtomicUsize,
    pub enhance_calls: AtomicUsize,
    pub execute_calls: AtomicUsize,
}

pub(crate) fn result(technique: &str, prompt: &str) -> EnhancedPrompt {
    EnhancedPrompt {
        technique: technique.to_string(),
        prompt: prompt.to_string(),
        explanation: format!("{} adds structure", technique),
    }
}

impl Default for FakeService {
    fn default() -> Self {
        Self {
            techniques: Ok(vec![
                "Chain-of-Thought".to_string(),
                "Persona Prompting".to_string(),
            ]),
            category: Some(Category::Writing),
            enhanced: Ok(vec![
                result("Chain-of-Thought", "Think step by step, then summarize."),
                result("Persona Prompting", "As a literary critic, summarize."),
            ]),
            chunks: vec!["Hello".to_string(), " world".to_string()],
            stream_error: None,
            hold_stream: false,
            select_calls: AtomicUsize::new(0),
            category_calls: AtomicUsize::new(0),
            enhance_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeService {
    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for FakeService {
    async fn select_techniques(
        &self,
        _prompt: &str,
        _category: Category,
        _context: Option<&str>,
    ) -> Result<Vec<String>, GenerationError> {
        self.select_calls.fetch_add(1, Ordering::SeqCst);
        self.techniques.clone()
    }

    async fn suggest_category(&self, _prompt: &str) -> Option<Category> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        self.category
    }

    async fn enhance_prompt(
        &self,
        _prompt: &str,
        _category: Category,
        _techniques: &[String],
    ) -> Result<Vec<EnhancedPrompt>, GenerationError> {
        self.enhance_calls.fetch_add(1, Ordering::SeqCst);
        self.enhanced.clone()
    }

    async fn execute_prompt_stream(
        &self,
        _prompt: &str,
        mut on_chunk: ChunkSink,
        on_error: ErrorSink,
        cancel: CancellationToken,
    ) {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        for chunk in &self.chunks {
            if cancel.is_cancelled() {
                return;
            }
            on_chunk(chunk.clone());
        }
        if self.hold_stream {
            cancel.cancelled().await;
            return;
        }
        if let Some(err) = self.stream_error.clone() {
            if !cancel.is_cancelled() {
                on_error(err);
            }
        }
    }
}
