//! Submission history
//!
//! Every successful enhancement is recorded as a `HistoryItem`:
//! - newest first, capped at `HISTORY_LIMIT` entries (oldest evicted)
//! - favorites and free-form tags, edited in place by id
//! - a filtered, sorted view for browsing and export

use crate::catalog::Category;
use crate::editor::markup;
use crate::llm::EnhancedPrompt;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const HISTORY_LIMIT: usize = 100;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// One recorded submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    /// Editor markup of the prompt as submitted
    pub original_prompt: String,
    pub category: Category,
    pub outputs: Vec<EnhancedPrompt>,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl HistoryItem {
    pub fn new(
        original_prompt: String,
        category: Category,
        outputs: Vec<EnhancedPrompt>,
        now: DateTime<Utc>,
    ) -> Self {
        let timestamp = now.timestamp_millis();
        Self {
            id: new_id(timestamp),
            original_prompt,
            category,
            outputs,
            timestamp,
            is_favorite: false,
            tags: Vec::new(),
        }
    }

    pub fn plain_prompt(&self) -> String {
        markup::plain_text(&self.original_prompt)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    fn matches_search(&self, needle: &str) -> bool {
        needle.is_empty()
            || self.plain_prompt().to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Submission time plus a random suffix, so two submissions in the same
/// millisecond still get distinct ids
pub fn new_id(timestamp_ms: i64) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", timestamp_ms, &suffix[..9])
}

/// Age window for the history browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateRange {
    #[default]
    All,
    Today,
    LastWeek,
    LastMonth,
}

impl DateRange {
    pub fn label(&self) -> &'static str {
        match self {
            DateRange::All => "All time",
            DateRange::Today => "Today",
            DateRange::LastWeek => "Last 7 days",
            DateRange::LastMonth => "Last 30 days",
        }
    }

    fn max_age_ms(&self) -> Option<i64> {
        match self {
            DateRange::All => None,
            DateRange::Today => Some(DAY_MS),
            DateRange::LastWeek => Some(7 * DAY_MS),
            DateRange::LastMonth => Some(30 * DAY_MS),
        }
    }

    pub fn next(&self) -> DateRange {
        match self {
            DateRange::All => DateRange::Today,
            DateRange::Today => DateRange::LastWeek,
            DateRange::LastWeek => DateRange::LastMonth,
            DateRange::LastMonth => DateRange::All,
        }
    }
}

/// Filters applied by the history browser
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    pub search: String,
    pub category: Option<Category>,
    pub date: DateRange,
    pub favorites_only: bool,
}

impl HistoryFilter {
    pub fn cycle_category(&mut self) {
        self.category = match self.category {
            None => Some(Category::ALL[0]),
            Some(current) if current == Category::ALL[Category::ALL.len() - 1] => None,
            Some(current) => Some(current.next()),
        };
    }
}

/// The persisted history list, newest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HistoryLog {
    items: Vec<HistoryItem>,
}

impl HistoryLog {
    pub fn items(&self) -> &[HistoryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&HistoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut HistoryItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Prepend an item, evicting the oldest entries beyond the limit
    pub fn push(&mut self, item: HistoryItem) {
        self.items.insert(0, item);
        // Evict from the tail so the new item survives even if the clock went backwards
        self.items.truncate(HISTORY_LIMIT);
    }

    /// Flip the favorite flag. Returns the new value, or `None` for an unknown id.
    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let item = self.get_mut(id)?;
        item.is_favorite = !item.is_favorite;
        Some(item.is_favorite)
    }

    /// Add a trimmed, non-empty tag. Adding an existing tag changes nothing.
    pub fn add_tag(&mut self, id: &str, tag: &str) -> bool {
        let tag = tag.trim();
        if tag.is_empty() {
            return false;
        }
        let Some(item) = self.get_mut(id) else {
            return false;
        };
        if item.tags.iter().any(|t| t == tag) {
            return false;
        }
        item.tags.push(tag.to_string());
        true
    }

    pub fn remove_tag(&mut self, id: &str, tag: &str) -> bool {
        let Some(item) = self.get_mut(id) else {
            return false;
        };
        let before = item.tags.len();
        item.tags.retain(|t| t != tag);
        item.tags.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Filtered view, favorites first and then newest first
    pub fn view(&self, filter: &HistoryFilter, now: DateTime<Utc>) -> Vec<&HistoryItem> {
        let now_ms = now.timestamp_millis();
        let needle = filter.search.trim().to_lowercase();

        let mut view: Vec<&HistoryItem> = self
            .items
            .iter()
            .filter(|item| match filter.date.max_age_ms() {
                Some(max_age) => now_ms - item.timestamp <= max_age,
                None => true,
            })
            .filter(|item| filter.category.is_none_or(|c| item.category == c))
            .filter(|item| !filter.favorites_only || item.is_favorite)
            .filter(|item| item.matches_search(&needle))
            .collect();

        view.sort_by(|a, b| {
            b.is_favorite
                .cmp(&a.is_favorite)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        view
    }
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("promptsmith_history_{}.json", date.format("%Y-%m-%d"))
}

/// Write `items` as pretty JSON into `dir`, named after `date`
pub fn export(items: &[&HistoryItem], dir: &Path, date: NaiveDate) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
    let path = dir.join(export_file_name(date));
    let content = serde_json::to_string_pretty(items)?;
    std::fs::write(&path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn item_at(prompt: &str, when: DateTime<Utc>) -> HistoryItem {
        HistoryItem::new(prompt.to_string(), Category::General, Vec::new(), when)
    }

    fn log_with(count: usize, now: DateTime<Utc>) -> HistoryLog {
        let mut log = HistoryLog::default();
        for i in 0..count {
            let when = now - Duration::minutes((count - i) as i64);
            log.push(item_at(&format!("prompt {}", i), when));
        }
        log
    }

    #[test]
    fn test_ids_are_unique_within_one_millisecond() {
        let a = new_id(1_700_000_000_000);
        let b = new_id(1_700_000_000_000);
        assert_ne!(a, b);
        assert!(a.starts_with("1700000000000-"));
    }

    #[test]
    fn test_push_prepends_and_caps_at_limit() {
        let now = Utc::now();
        let mut log = log_with(HISTORY_LIMIT, now);
        assert_eq!(log.len(), HISTORY_LIMIT);
        let oldest_id = log.items().last().unwrap().id.clone();

        log.push(item_at("newest", now));
        assert_eq!(log.len(), HISTORY_LIMIT);
        assert_eq!(log.items()[0].original_prompt, "newest");
        assert!(log.get(&oldest_id).is_none());
    }

    #[test]
    fn test_push_keeps_new_item_when_clock_went_backwards() {
        let now = Utc::now();
        let mut log = log_with(HISTORY_LIMIT, now);
        let oldest_id = log.items().last().unwrap().id.clone();

        log.push(item_at("earlier clock", now - Duration::days(365)));
        assert_eq!(log.len(), HISTORY_LIMIT);
        assert_eq!(log.items()[0].original_prompt, "earlier clock");
        assert!(log.get(&oldest_id).is_none());
    }

    #[test]
    fn test_push_below_limit_grows_by_one() {
        let now = Utc::now();
        let mut log = log_with(3, now);
        log.push(item_at("fourth", now));
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_add_tag_is_idempotent_and_trimmed() {
        let mut log = log_with(1, Utc::now());
        let id = log.items()[0].id.clone();

        assert!(log.add_tag(&id, "  email "));
        assert!(!log.add_tag(&id, "email"));
        assert!(!log.add_tag(&id, "   "));
        assert_eq!(log.get(&id).unwrap().tags, vec!["email".to_string()]);

        assert!(log.remove_tag(&id, "email"));
        assert!(!log.remove_tag(&id, "email"));
        assert!(!log.add_tag("missing", "x"));
    }

    #[test]
    fn test_toggle_favorite() {
        let mut log = log_with(1, Utc::now());
        let id = log.items()[0].id.clone();
        assert_eq!(log.toggle_favorite(&id), Some(true));
        assert_eq!(log.toggle_favorite(&id), Some(false));
        assert_eq!(log.toggle_favorite("missing"), None);
    }

    #[test]
    fn test_view_sorts_favorites_first_then_newest() {
        let now = Utc::now();
        let mut log = log_with(3, now);
        let oldest = log.items()[2].id.clone();
        log.toggle_favorite(&oldest);

        let view = log.view(&HistoryFilter::default(), now);
        let prompts: Vec<&str> = view.iter().map(|i| i.original_prompt.as_str()).collect();
        assert_eq!(prompts, vec!["prompt 0", "prompt 2", "prompt 1"]);
    }

    #[test]
    fn test_view_filters_combine() {
        let now = Utc::now();
        let mut log = HistoryLog::default();
        let mut old = item_at("**Write** a haiku", now - Duration::days(10));
        old.category = Category::Writing;
        log.push(old);
        let mut recent = item_at("Fix my SQL", now - Duration::hours(2));
        recent.category = Category::Programming;
        recent.tags.push("database".into());
        log.push(recent);

        let search = HistoryFilter {
            search: "WRITE A".into(),
            ..HistoryFilter::default()
        };
        assert_eq!(log.view(&search, now).len(), 1);

        let by_tag = HistoryFilter {
            search: "datab".into(),
            ..HistoryFilter::default()
        };
        assert_eq!(log.view(&by_tag, now)[0].original_prompt, "Fix my SQL");

        let today = HistoryFilter {
            date: DateRange::Today,
            ..HistoryFilter::default()
        };
        assert_eq!(log.view(&today, now).len(), 1);

        let month_writing = HistoryFilter {
            date: DateRange::LastMonth,
            category: Some(Category::Writing),
            ..HistoryFilter::default()
        };
        assert_eq!(log.view(&month_writing, now).len(), 1);

        let favorites = HistoryFilter {
            favorites_only: true,
            ..HistoryFilter::default()
        };
        assert!(log.view(&favorites, now).is_empty());
    }

    #[test]
    fn test_export_writes_dated_file() {
        let tmp = TempDir::new().unwrap();
        let now = Utc::now();
        let log = log_with(2, now);
        let view = log.view(&HistoryFilter::default(), now);
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        let path = export(&view, tmp.path(), date).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "promptsmith_history_2024-03-09.json"
        );
        let written: Vec<HistoryItem> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0].original_prompt, "prompt 1");
    }

    #[test]
    fn test_legacy_items_without_tags_decode() {
        let json = r#"[{"id":"1-a","originalPrompt":"x","category":"Writing","outputs":[],"timestamp":1}]"#;
        let log: HistoryLog = serde_json::from_str(json).unwrap();
        assert!(!log.items()[0].is_favorite);
        assert!(log.items()[0].tags.is_empty());
    }
}
