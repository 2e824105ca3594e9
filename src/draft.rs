//! The prompt being composed and its persisted form.

use crate::catalog::{self, Category};
use crate::editor::markup;
use serde::{Deserialize, Serialize};

/// Working state of the prompt form
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    /// Editor markup (bold, lists, code fences...)
    pub prompt: String,
    pub context_note: String,
    pub category: Category,
    pub automatic: bool,
    /// Manual technique selection, in the order the user picked them
    pub techniques: Vec<String>,
}

impl Default for Draft {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            context_note: String::new(),
            category: Category::default(),
            automatic: true,
            techniques: Vec::new(),
        }
    }
}

/// What survives a restart: text, category and context note
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DraftRecord {
    pub prompt: String,
    pub category: Category,
    pub prompt_context: String,
}

impl Draft {
    pub fn from_record(record: DraftRecord) -> Self {
        Self {
            prompt: record.prompt,
            context_note: record.prompt_context,
            category: record.category,
            ..Self::default()
        }
    }

    pub fn to_record(&self) -> DraftRecord {
        DraftRecord {
            prompt: self.prompt.clone(),
            category: self.category,
            prompt_context: self.context_note.clone(),
        }
    }

    pub fn plain_text(&self) -> String {
        markup::plain_text(&self.prompt)
    }

    pub fn word_count(&self) -> usize {
        self.plain_text().split_whitespace().count()
    }

    /// Add a catalog technique to the manual selection. Returns false for
    /// unknown names and for techniques that are already selected.
    pub fn add_technique(&mut self, name: &str) -> bool {
        if !catalog::is_known_technique(name) || self.techniques.iter().any(|t| t == name) {
            return false;
        }
        self.techniques.push(name.to_string());
        true
    }

    pub fn remove_technique(&mut self, name: &str) -> bool {
        let before = self.techniques.len();
        self.techniques.retain(|t| t != name);
        self.techniques.len() != before
    }

    pub fn toggle_technique(&mut self, name: &str) {
        if !self.remove_technique(name) {
            self.add_technique(name);
        }
    }
}
