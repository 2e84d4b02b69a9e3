//! App-state snapshotter
//!
//! Pulls a bounded snapshot of locally available application data into a
//! serializable context fragment. Every source is read independently and
//! defensively: a missing or malformed record is omitted and the partial
//! snapshot stays valid.

use crate::registry::ContextRegistry;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Cap applied to the visible-page excerpt when it is read.
const PAGE_EXCERPT_READ_CAP: usize = 5_000;
/// Cap applied when the excerpt is folded into a prompt.
const PAGE_EXCERPT_PROMPT_CAP: usize = 3_000;

pub const KEY_FEASIBILITY: &str = "feasibility_reports";
pub const KEY_COURSES: &str = "courses";
pub const KEY_QUIZZES: &str = "quizzes";
pub const KEY_CONVERSATIONAL_MODE: &str = "conversational_mode";
pub const KEY_SIGNUP_EMAIL: &str = "signup_email";

/// Host-provided surface over locally stored records and the page the user
/// is looking at. The engine never touches storage directly.
pub trait StateReader: Send + Sync {
    /// Raw stored value for a named record, if present.
    fn record(&self, key: &str) -> Option<String>;

    /// Visible text of the currently displayed page, if the host exposes it.
    fn visible_text(&self) -> Option<String>;
}

/// In-memory reader for hosts that proxy their own storage, and for tests.
#[derive(Default)]
pub struct MemoryStateReader {
    records: HashMap<String, String>,
    visible_text: Option<String>,
}

impl MemoryStateReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_record(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.records.insert(key.into(), value.into());
    }

    pub fn set_visible_text(&mut self, text: impl Into<String>) {
        self.visible_text = Some(text.into());
    }
}

impl StateReader for MemoryStateReader {
    fn record(&self, key: &str) -> Option<String> {
        self.records.get(key).cloned()
    }

    fn visible_text(&self) -> Option<String> {
        self.visible_text.clone()
    }
}

/// Bounded snapshot of local app state for one turn.
#[derive(Debug, Clone)]
pub struct AppSnapshot {
    pub feasibility: Vec<Value>,
    pub courses: Vec<Value>,
    pub quizzes: Vec<Value>,
    pub conversational_mode: bool,
    pub user_email: Option<String>,
    pub page_context: String,
    pub page_excerpt: String,
    pub timestamp: DateTime<Utc>,
}

impl AppSnapshot {
    /// Read every source, swallowing individual failures.
    pub fn collect(reader: &dyn StateReader, registry: &ContextRegistry, route: &str) -> Self {
        let feasibility = read_json_array(reader, KEY_FEASIBILITY);
        let courses = read_json_array(reader, KEY_COURSES);
        let quizzes = read_json_array(reader, KEY_QUIZZES);

        let conversational_mode = reader
            .record(KEY_CONVERSATIONAL_MODE)
            .map(|v| v.trim() == "true")
            .unwrap_or(false);

        let user_email = reader
            .record(KEY_SIGNUP_EMAIL)
            .filter(|v| !v.trim().is_empty());

        let page_context = registry
            .lookup_by_route(route)
            .map(|ctx| ctx.id.clone())
            .unwrap_or_else(|| "general".to_string());

        let page_excerpt = reader
            .visible_text()
            .map(|text| truncate_chars(&text, PAGE_EXCERPT_READ_CAP))
            .unwrap_or_default();

        Self {
            feasibility,
            courses,
            quizzes,
            conversational_mode,
            user_email,
            page_context,
            page_excerpt,
            timestamp: Utc::now(),
        }
    }

    /// Format into the prompt section block. Sections with no data are
    /// omitted entirely.
    pub fn format_for_prompt(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        sections.push("=== USER CONTEXT ===".to_string());
        if let Some(email) = &self.user_email {
            sections.push(format!("User Email: {}", email));
        }
        sections.push(format!(
            "Conversational Mode: {}",
            if self.conversational_mode {
                "Enabled"
            } else {
                "Disabled"
            }
        ));
        sections.push(format!("Current Page: {}", self.page_context));

        if !self.feasibility.is_empty() {
            sections.push("\n=== BUSINESS FEASIBILITY DATA ===".to_string());
            sections.push(format!("Total Ideas Analyzed: {}", self.feasibility.len()));
            for (idx, item) in self.feasibility.iter().take(3).enumerate() {
                sections.push(format!(
                    "Idea {}: {} ({}, Score: {})",
                    idx + 1,
                    str_field(item, "idea"),
                    str_field(item, "verdict"),
                    item.get("score").cloned().unwrap_or(Value::Null),
                ));
            }
        }

        if !self.courses.is_empty() {
            sections.push("\n=== LEARNING PROGRESS ===".to_string());
            sections.push(format!("Courses Accessed: {}", self.courses.len()));
            for course in self.courses.iter().take(3) {
                sections.push(format!(
                    "- {}: {}",
                    str_field(course, "title"),
                    str_field(course, "description"),
                ));
            }
        }

        if !self.quizzes.is_empty() {
            let completed = self
                .quizzes
                .iter()
                .filter(|q| q.get("submitted").and_then(Value::as_bool).unwrap_or(false))
                .count();
            sections.push("\n=== QUIZ PERFORMANCE ===".to_string());
            sections.push(format!(
                "Quizzes Completed: {}/{}",
                completed,
                self.quizzes.len()
            ));
        }

        if !self.page_excerpt.is_empty() {
            sections.push("\n=== CURRENT PAGE CONTENT ===".to_string());
            sections.push(truncate_chars(&self.page_excerpt, PAGE_EXCERPT_PROMPT_CAP));
        }

        sections.join("\n")
    }
}

fn read_json_array(reader: &dyn StateReader, key: &str) -> Vec<Value> {
    let Some(raw) = reader.record(key) else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<Value>>(&raw) {
        Ok(values) => values,
        Err(error) => {
            debug!(%key, %error, "skipping malformed stored record");
            Vec::new()
        }
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("unknown")
}

/// Truncate on a char boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}
