//! System prompts and response schemas for the structured generation calls.

use crate::catalog::{Category, TECHNIQUES};
use serde_json::{json, Value};

pub const SELECTION_TEMPERATURE: f32 = 0.5;
pub const CATEGORY_TEMPERATURE: f32 = 0.2;
pub const ENHANCE_TEMPERATURE: f32 = 0.8;

/// Object keys wrapping the array replies; strict schemas need an object root
pub const TECHNIQUES_KEY: &str = "techniques";
pub const PROMPTS_KEY: &str = "prompts";

fn catalog_listing() -> String {
    TECHNIQUES
        .iter()
        .map(|t| format!("- {}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn language_rule(output_language: Option<&str>) -> String {
    match output_language.map(str::trim).filter(|l| !l.is_empty()) {
        Some(language) => format!("Write every generated prompt and explanation in {}.", language),
        None => "Write every generated prompt and explanation in the same language as the user's original prompt.".to_string(),
    }
}

pub fn technique_selection_system() -> String {
    format!(
        r#"You are an expert prompt engineer. Given a user's prompt, its category and optional context,
choose the 3 to 5 prompt-engineering techniques from the catalog below that would improve it most.

CATALOG:
{}

Reply with a JSON object {{"techniques": [...]}} holding technique names copied exactly from the catalog, best first.
Do not invent techniques and do not add commentary."#,
        catalog_listing()
    )
}

pub fn technique_selection_user(prompt: &str, category: Category, context: Option<&str>) -> String {
    let mut out = format!("CATEGORY: {}\n\nPROMPT:\n{}", category.label(), prompt);
    if let Some(context) = context.map(str::trim).filter(|c| !c.is_empty()) {
        out.push_str("\n\nCONTEXT:\n");
        out.push_str(context);
    }
    out
}

pub fn category_system() -> String {
    format!(
        "Classify the user's prompt into exactly one of these categories: {}.\n\
         Reply with a JSON object of the form {{\"category\": \"<label>\"}} using the label verbatim.",
        Category::labels().join(", ")
    )
}

pub fn enhancement_system(category: Category, output_language: Option<&str>) -> String {
    format!(
        r#"You are an expert prompt engineer working on a prompt in the "{}" category.
For each requested technique, rewrite the user's prompt so that it applies that technique.
Keep the user's intent, add the structure the technique calls for, and make each result ready to paste into a chat model.

For each technique return an object with:
- "technique": the technique name exactly as requested
- "prompt": the rewritten prompt
- "explanation": one or two sentences on how the technique improves the prompt

{}
Reply with a JSON object {{"prompts": [...]}} holding these objects in the order the techniques were given."#,
        category.label(),
        language_rule(output_language)
    )
}

pub fn enhancement_user(prompt: &str, techniques: &[String]) -> String {
    let listing = techniques
        .iter()
        .map(|name| format!("- {}: {}", name, crate::catalog::describe(name)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("TECHNIQUES:\n{}\n\nPROMPT:\n{}", listing, prompt)
}

pub fn technique_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            TECHNIQUES_KEY: {
                "type": "array",
                "items": {
                    "type": "string",
                    "enum": TECHNIQUES.iter().map(|t| t.name).collect::<Vec<_>>()
                }
            }
        },
        "required": [TECHNIQUES_KEY],
        "additionalProperties": false
    })
}

pub fn category_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "category": { "type": "string", "enum": Category::labels() }
        },
        "required": ["category"],
        "additionalProperties": false
    })
}

pub fn enhancement_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            PROMPTS_KEY: {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "technique": { "type": "string" },
                        "prompt": { "type": "string" },
                        "explanation": { "type": "string" }
                    },
                    "required": ["technique", "prompt", "explanation"],
                    "additionalProperties": false
                }
            }
        },
        "required": [PROMPTS_KEY],
        "additionalProperties": false
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_prompt_lists_whole_catalog() {
        let system = technique_selection_system();
        for technique in TECHNIQUES {
            assert!(system.contains(technique.name), "missing {}", technique.name);
        }
    }

    #[test]
    fn test_context_only_included_when_present() {
        let with = technique_selection_user("Plan a trip", Category::General, Some(" budget "));
        assert!(with.contains("CONTEXT:\nbudget"));
        let without = technique_selection_user("Plan a trip", Category::General, Some("  "));
        assert!(!without.contains("CONTEXT"));
    }

    #[test]
    fn test_language_rule_prefers_configured_language() {
        assert!(enhancement_system(Category::Writing, Some("German")).contains("in German."));
        assert!(enhancement_system(Category::Writing, None).contains("same language"));
    }

    #[test]
    fn test_array_schemas_have_object_roots() {
        for (schema, key) in [
            (technique_schema(), TECHNIQUES_KEY),
            (enhancement_schema(), PROMPTS_KEY),
        ] {
            assert_eq!(schema["type"], "object");
            assert_eq!(schema["properties"][key]["type"], "array");
            assert_eq!(schema["required"][0], key);
        }
    }

    #[test]
    fn test_category_schema_enumerates_labels() {
        let schema = category_schema();
        let labels = schema["properties"]["category"]["enum"].as_array().unwrap();
        assert_eq!(labels.len(), Category::ALL.len());
    }
}
