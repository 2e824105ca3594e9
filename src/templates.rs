//! Saved prompt templates.

use crate::catalog::Category;
use crate::draft::Draft;
use crate::history::new_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A snapshot of the form the user chose to keep under a name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: String,
    pub name: String,
    pub original_prompt: String,
    pub category: Category,
    pub is_automatic: bool,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub prompt_context: String,
}

impl PromptTemplate {
    pub fn from_draft(name: &str, draft: &Draft, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(now.timestamp_millis()),
            name: name.trim().to_string(),
            original_prompt: draft.prompt.clone(),
            category: draft.category,
            is_automatic: draft.automatic,
            techniques: draft.techniques.clone(),
            prompt_context: draft.context_note.clone(),
        }
    }

    /// The draft this template restores
    pub fn to_draft(&self) -> Draft {
        Draft {
            prompt: self.original_prompt.clone(),
            context_note: self.prompt_context.clone(),
            category: self.category,
            automatic: self.is_automatic,
            techniques: self.techniques.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TemplateNameError {
    #[error("Template name cannot be empty")]
    Empty,
}

/// Trimmed, non-empty template name
pub fn validate_name(name: &str) -> Result<&str, TemplateNameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        Err(TemplateNameError::Empty)
    } else {
        Ok(trimmed)
    }
}

/// The persisted template list, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateShelf {
    templates: Vec<PromptTemplate>,
}

impl TemplateShelf {
    pub fn templates(&self) -> &[PromptTemplate] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&PromptTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn add(&mut self, template: PromptTemplate) {
        self.templates.insert(0, template);
    }

    pub fn remove(&mut self, id: &str) -> Option<PromptTemplate> {
        let idx = self.templates.iter().position(|t| t.id == id)?;
        Some(self.templates.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> Draft {
        Draft {
            prompt: "- **Outline** a talk".into(),
            context_note: "for beginners".into(),
            category: Category::Education,
            automatic: false,
            techniques: vec!["Few-Shot Prompting".into(), "Chain-of-Thought".into()],
        }
    }

    #[test]
    fn test_template_round_trip_restores_form() {
        let draft = sample_draft();
        let template = PromptTemplate::from_draft("  Talk outline ", &draft, Utc::now());
        assert_eq!(template.name, "Talk outline");
        assert_eq!(template.to_draft(), draft);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  x "), Ok("x"));
        assert_eq!(validate_name("   "), Err(TemplateNameError::Empty));
    }

    #[test]
    fn test_shelf_add_and_remove() {
        let mut shelf = TemplateShelf::default();
        let first = PromptTemplate::from_draft("a", &sample_draft(), Utc::now());
        let second = PromptTemplate::from_draft("b", &sample_draft(), Utc::now());
        let first_id = first.id.clone();
        shelf.add(first);
        shelf.add(second);

        assert_eq!(shelf.templates()[0].name, "b");
        assert_eq!(shelf.remove(&first_id).map(|t| t.name), Some("a".into()));
        assert!(shelf.remove(&first_id).is_none());
        assert_eq!(shelf.len(), 1);
    }

    #[test]
    fn test_serialized_field_names() {
        let template = PromptTemplate::from_draft("n", &sample_draft(), Utc::now());
        let json = serde_json::to_value(&template).unwrap();
        assert_eq!(json["isAutomatic"], false);
        assert_eq!(json["promptContext"], "for beginners");
        assert_eq!(json["originalPrompt"], "- **Outline** a talk");
    }
}
