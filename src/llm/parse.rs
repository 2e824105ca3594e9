//! Tolerant decoding of model output into the shapes each operation expects.

use super::prompts::{PROMPTS_KEY, TECHNIQUES_KEY};
use super::{EnhancedPrompt, GenerationError};
use crate::catalog::{self, Category};
use serde_json::Value;

const MAX_SALVAGE_CANDIDATES: usize = 4;

fn push_candidate(candidates: &mut Vec<String>, candidate: &str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() && !candidates.iter().any(|c| c == trimmed) {
        candidates.push(trimmed.to_string());
    }
}

/// Body of a ```json fenced block, if the whole reply is one
fn strip_code_fence(content: &str) -> Option<&str> {
    let rest = content.trim().strip_prefix("```")?;
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    let end = body.rfind("```")?;
    Some(body[..end].trim())
}

/// The balanced `{...}` or `[...]` value starting at byte `start`
fn balanced_value_at(content: &str, start: usize) -> Option<&str> {
    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => closers.push('}'),
            '[' => closers.push(']'),
            '}' | ']' => {
                if closers.pop() != Some(ch) {
                    return None;
                }
                if closers.is_empty() {
                    return Some(&content[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn embedded_values(content: &str) -> Vec<&str> {
    let mut found = Vec::new();
    for (idx, ch) in content.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        if let Some(value) = balanced_value_at(content, idx) {
            if !found.contains(&value) {
                found.push(value);
            }
            if found.len() >= MAX_SALVAGE_CANDIDATES {
                break;
            }
        }
    }
    found
}

/// Parse model output as JSON, salvaging fenced or prose-wrapped replies.
pub fn parse_json_content(content: &str) -> Result<Value, GenerationError> {
    let mut candidates = Vec::new();
    push_candidate(&mut candidates, content);
    if let Some(body) = strip_code_fence(content) {
        push_candidate(&mut candidates, body);
    }
    let mut idx = 0;
    while idx < candidates.len() {
        let current = candidates[idx].clone();
        for value in embedded_values(&current) {
            push_candidate(&mut candidates, value);
        }
        idx += 1;
    }

    let mut last_err = None;
    for candidate in &candidates {
        match serde_json::from_str::<Value>(candidate) {
            Ok(value) => return Ok(value),
            Err(err) => last_err = Some(err.to_string()),
        }
    }
    Err(GenerationError::MalformedResponse(
        last_err.unwrap_or_else(|| "empty response".to_string()),
    ))
}

/// A bare array, or the array under the reply's known wrapper `key`
fn keyed_array<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get(key)?.as_array(),
        _ => None,
    }
}

/// Catalog technique names from a selection reply, first occurrence wins.
pub fn techniques_from_value(value: &Value) -> Result<Vec<String>, GenerationError> {
    let items = keyed_array(value, TECHNIQUES_KEY).ok_or(GenerationError::SelectionFailed)?;
    let mut names: Vec<String> = Vec::new();
    for name in items.iter().filter_map(Value::as_str) {
        let Some(technique) = catalog::technique(name.trim()) else {
            tracing::debug!("Dropping unknown technique from selection: {}", name);
            continue;
        };
        if !names.iter().any(|n| n == technique.name) {
            names.push(technique.name.to_string());
        }
    }
    if names.is_empty() {
        return Err(GenerationError::SelectionFailed);
    }
    Ok(names)
}

/// Enhanced variants from an enhancement reply.
///
/// Elements missing any of the three string fields are dropped. A reply that
/// is neither an array nor `{"prompts": [...]}` is malformed; an empty list
/// is returned as-is.
pub fn enhanced_from_value(value: &Value) -> Result<Vec<EnhancedPrompt>, GenerationError> {
    let items = keyed_array(value, PROMPTS_KEY).ok_or_else(|| {
        GenerationError::MalformedResponse("expected an array of enhanced prompts".to_string())
    })?;
    let field = |item: &Value, key: &str| item.get(key).and_then(Value::as_str).map(str::to_string);
    Ok(items
        .iter()
        .filter_map(|item| {
            Some(EnhancedPrompt {
                technique: field(item, "technique")?,
                prompt: field(item, "prompt")?,
                explanation: field(item, "explanation")?,
            })
        })
        .collect())
}

/// Category from a suggestion reply; unknown labels yield nothing
pub fn category_from_value(value: &Value) -> Option<Category> {
    Category::from_label(value.get("category")?.as_str()?.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_salvages_fenced_and_wrapped_json() {
        let fenced = "```json\n[\"Chain-of-Thought\"]\n```";
        assert_eq!(parse_json_content(fenced).unwrap(), json!(["Chain-of-Thought"]));

        let chatty = "Sure! Here you go: {\"category\": \"Writing\"} Hope that helps.";
        assert_eq!(
            parse_json_content(chatty).unwrap(),
            json!({"category": "Writing"})
        );
    }

    #[test]
    fn test_parse_failure_is_malformed() {
        assert!(matches!(
            parse_json_content("no json here"),
            Err(GenerationError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_json_content(""),
            Err(GenerationError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_brackets_inside_strings_do_not_break_salvage() {
        let text = r#"note: [{"technique": "a]b", "prompt": "x", "explanation": "y"}]"#;
        let value = parse_json_content(text).unwrap();
        assert_eq!(value[0]["technique"], "a]b");
    }

    #[test]
    fn test_techniques_filtered_and_deduplicated() {
        let value = json!([
            "Chain-of-Thought",
            "Made Up Technique",
            "Persona Prompting",
            "Chain-of-Thought",
            42
        ]);
        assert_eq!(
            techniques_from_value(&value).unwrap(),
            vec!["Chain-of-Thought".to_string(), "Persona Prompting".to_string()]
        );
    }

    #[test]
    fn test_techniques_accept_wrapped_array() {
        let value = json!({"techniques": ["Few-Shot Prompting"]});
        assert_eq!(
            techniques_from_value(&value).unwrap(),
            vec!["Few-Shot Prompting".to_string()]
        );
    }

    #[test]
    fn test_techniques_ignore_unknown_wrapper() {
        assert_eq!(
            techniques_from_value(&json!({"names": ["Few-Shot Prompting"]})),
            Err(GenerationError::SelectionFailed)
        );
    }

    #[test]
    fn test_techniques_empty_after_filter_fails() {
        assert_eq!(
            techniques_from_value(&json!(["Nope", "Also nope"])),
            Err(GenerationError::SelectionFailed)
        );
        assert_eq!(
            techniques_from_value(&json!("Chain-of-Thought")),
            Err(GenerationError::SelectionFailed)
        );
    }

    #[test]
    fn test_enhanced_drops_incomplete_items() {
        let value = json!([
            {"technique": "Chain-of-Thought", "prompt": "Think step by step", "explanation": "why"},
            {"technique": "Persona Prompting", "prompt": "You are an editor"},
            {"technique": 3, "prompt": "x", "explanation": "y"}
        ]);
        let out = enhanced_from_value(&value).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].technique, "Chain-of-Thought");
    }

    #[test]
    fn test_enhanced_non_array_is_malformed() {
        assert!(matches!(
            enhanced_from_value(&json!({"technique": "x"})),
            Err(GenerationError::MalformedResponse(_))
        ));
        let stray_wrapper = json!({"results": [
            {"technique": "Chain-of-Thought", "prompt": "p", "explanation": "e"}
        ]});
        assert!(matches!(
            enhanced_from_value(&stray_wrapper),
            Err(GenerationError::MalformedResponse(_))
        ));
        assert_eq!(enhanced_from_value(&json!([])).unwrap(), Vec::new());
    }

    #[test]
    fn test_enhanced_unwraps_prompts_key() {
        let value = json!({"prompts": [
            {"technique": "Persona Prompting", "prompt": "You are an editor", "explanation": "e"}
        ]});
        let out = enhanced_from_value(&value).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].prompt, "You are an editor");
    }

    #[test]
    fn test_category_requires_known_label() {
        assert_eq!(
            category_from_value(&json!({"category": "Writing"})),
            Some(Category::Writing)
        );
        assert_eq!(category_from_value(&json!({"category": "Cooking"})), None);
        assert_eq!(category_from_value(&json!({"other": "Writing"})), None);
    }
}
