use crate::catalog::Category;
use crate::llm::{EnhancedPrompt, GenerationError};

/// Messages from background tasks to the main UI thread
#[derive(Debug)]
pub enum BackgroundMessage {
    /// Automatic technique selection finished for a submission
    TechniquesSelected {
        submission: u64,
        techniques: Vec<String>,
    },
    EnhancementReady {
        submission: u64,
        results: Vec<EnhancedPrompt>,
    },
    SubmissionFailed {
        submission: u64,
        error: GenerationError,
    },
    /// Category suggestion result, tagged with the generation it was started under
    CategorySuggested {
        generation: u64,
        category: Option<Category>,
    },
    /// Streamed fragment for a result card
    ExecutionChunk {
        deck: u64,
        card: usize,
        run: u64,
        text: String,
    },
    ExecutionFailed {
        deck: u64,
        card: usize,
        run: u64,
        error: GenerationError,
    },
    ExecutionFinished {
        deck: u64,
        card: usize,
        run: u64,
    },
    /// Generic error (task crashes and the like)
    Error(String),
}
