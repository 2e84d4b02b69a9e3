//! Core data models for the assistant engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

//
// ================= Messages =================
//

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single message in a topic's conversation log.
///
/// Created once, never mutated; ordering within a topic is insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Owning topic id
    pub context: String,
    /// Tool ids referenced by this reply, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

impl Message {
    pub fn new(role: MessageRole, content: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            context: context.into(),
            tools: None,
        }
    }

    pub fn with_tools(mut self, tools: Option<Vec<String>>) -> Self {
        self.tools = tools;
        self
    }
}

//
// ================= Enrichment =================
//

/// One fragment of external text, keyed by its source URL or search query.
#[derive(Debug, Clone)]
pub struct WebFragment {
    pub source: String,
    pub text: String,
}

/// Transient per-turn context handed to the provider chain.
///
/// Built fresh for every turn and discarded once the reply is appended.
#[derive(Debug, Clone, Default)]
pub struct EnrichmentBundle {
    /// Formatted local app-state snapshot
    pub app_context: Option<String>,
    /// Formatted KPI/insight bundle from the agent backend
    pub knowledge: Option<String>,
    /// External text fragments (fetched pages, search summaries)
    pub web: Vec<WebFragment>,
    /// Free-text system instruction for this turn
    pub system: String,
}

impl EnrichmentBundle {
    /// Join the non-system fragments into the single context block the
    /// adapters fold into their envelopes. `None` when nothing succeeded.
    pub fn combined_context(&self) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(app) = &self.app_context {
            parts.push(app);
        }
        if let Some(knowledge) = &self.knowledge {
            parts.push(knowledge);
        }
        let web_parts: Vec<String> = self
            .web
            .iter()
            .map(|f| format!("Source: {}\n{}", f.source, f.text))
            .collect();
        parts.extend(web_parts.iter().map(|s| s.as_str()));

        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n---\n\n"))
        }
    }
}

//
// ================= Web Search =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

//
// ================= Agent Backend =================
//

/// Payload of the backend status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub is_running: bool,
    #[serde(default)]
    pub last_updates: HashMap<String, String>,
    #[serde(default)]
    pub pending_tasks: u32,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(default)]
    pub memory_size: u32,
}

/// One KPI row from the backend query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiRow {
    pub name: String,
    pub current: serde_json::Value,
    #[serde(default)]
    pub unit: Option<String>,
    pub target: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub summary: String,
}

/// Per-module KPI values and short insight summaries used as enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBundle {
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub kpis: Vec<KpiRow>,
    #[serde(default)]
    pub insights: Vec<Insight>,
}

impl KnowledgeBundle {
    /// Format into a bounded prompt fragment: at most 20 KPI lines and 10
    /// insight lines. Empty bundles format to `None`.
    pub fn format_for_prompt(&self, fallback_module: &str) -> Option<String> {
        if self.kpis.is_empty() && self.insights.is_empty() {
            return None;
        }

        let kpi_lines: Vec<String> = self
            .kpis
            .iter()
            .take(20)
            .map(|k| {
                let unit = k
                    .unit
                    .as_deref()
                    .map(|u| format!(" {}", u))
                    .unwrap_or_default();
                format!("- {}: {}{} (target {})", k.name, k.current, unit, k.target)
            })
            .collect();
        let insight_lines: Vec<String> = self
            .insights
            .iter()
            .take(10)
            .map(|i| format!("- {}", i.summary))
            .collect();

        let mut sections = vec![format!(
            "Module: {}",
            self.module.as_deref().unwrap_or(fallback_module)
        )];
        if !kpi_lines.is_empty() {
            sections.push(format!("KPIs:\n{}", kpi_lines.join("\n")));
        }
        if !insight_lines.is_empty() {
            sections.push(format!("Insights:\n{}", insight_lines.join("\n")));
        }

        Some(sections.join("\n\n"))
    }
}
