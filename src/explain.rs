//! Explain-on-click bridge
//!
//! A dependency-injected registry marking UI elements as explainable. The
//! host reports clicks as a path of element snapshots from the click target
//! up to the root; the registry walks up until it finds a registered
//! element, gathers a bounded description, merges any caller-supplied data,
//! and forwards the result to the installed sink as a synthetic user turn.
//!
//! Auto-registration is an explicit, debounced re-scan hook the host calls
//! after render events; the registry never watches the UI tree itself.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

/// Visible-text budget per forwarded element.
const TEXT_CAP: usize = 1_500;
/// At most this many numeric tokens are forwarded.
const MAX_NUMBERS: usize = 20;
/// Minimum spacing between auto-scans.
const SCAN_DEBOUNCE: Duration = Duration::from_secs(1);

lazy_static! {
    static ref NUMBER_RE: Regex =
        Regex::new(r"[-+]?[0-9]*\.?[0-9]+%?|\$[\d,.]+").unwrap();
}

/// Stable key for one UI element, derived from the host's element path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementKey(Uuid);

impl ElementKey {
    pub fn from_path(path: &str) -> Self {
        let hash = Sha256::digest(path.as_bytes());
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&hash[..16]);

        // Set UUID version (4) and variant (RFC4122) bits.
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;

        Self(Uuid::from_bytes(bytes))
    }
}

/// Raw facts the host reports about one element on the click path.
#[derive(Debug, Clone, Default)]
pub struct ElementSnapshot {
    /// Host-stable element path, e.g. a DOM path or widget id.
    pub path: String,
    pub tag: String,
    pub classes: String,
    pub text: String,
    pub title: Option<String>,
    pub aria_label: Option<String>,
    pub dataset: HashMap<String, String>,
    pub nearest_heading: Option<String>,
    /// Target is (or sits inside) an input control.
    pub in_input_control: bool,
    /// Target sits inside the assistant's own UI.
    pub in_assistant_ui: bool,
    /// Element explicitly opted out of explanation.
    pub opted_out: bool,
}

/// What the bridge hands to the sink: a description plus bounded facts.
#[derive(Debug, Clone)]
pub struct ExplainPrompt {
    pub description: String,
    pub data: Value,
}

struct Registration {
    description: String,
    data: Value,
}

type Sink = Box<dyn Fn(ExplainPrompt) + Send + Sync>;

pub struct ExplainRegistry {
    elements: HashMap<ElementKey, Registration>,
    sink: Option<Sink>,
    last_scan: Option<Instant>,
}

impl ExplainRegistry {
    pub fn new() -> Self {
        Self {
            elements: HashMap::new(),
            sink: None,
            last_scan: None,
        }
    }

    /// Mark an element explainable. Re-registering replaces the entry.
    pub fn register(&mut self, path: &str, description: impl Into<String>, data: Option<Value>) {
        self.elements.insert(
            ElementKey::from_path(path),
            Registration {
                description: description.into(),
                data: data.unwrap_or(Value::Null),
            },
        );
    }

    pub fn unregister(&mut self, path: &str) {
        self.elements.remove(&ElementKey::from_path(path));
    }

    pub fn is_registered(&self, path: &str) -> bool {
        self.elements.contains_key(&ElementKey::from_path(path))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Install the forwarding sink. With no sink installed, intercepted
    /// clicks are dropped.
    pub fn set_sink(&mut self, sink: impl Fn(ExplainPrompt) + Send + Sync + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Process a click reported as a path of snapshots ordered from the
    /// click target up to the root. Returns whether the click was
    /// intercepted (a registered element was reached and not suppressed).
    pub fn handle_click(&self, path: &[ElementSnapshot]) -> bool {
        let Some(target) = path.first() else {
            return false;
        };
        if target.in_input_control || target.in_assistant_ui {
            return false;
        }

        for element in path {
            if element.opted_out {
                return false;
            }
            let Some(registration) = self.elements.get(&ElementKey::from_path(&element.path))
            else {
                continue;
            };

            let description = if registration.description.is_empty() {
                format!("{} element", element.tag.to_uppercase())
            } else {
                registration.description.clone()
            };
            let data = merge(&registration.data, gather_facts(element));

            if let Some(sink) = &self.sink {
                sink(ExplainPrompt { description, data });
            } else {
                debug!(element = %element.path, "explain click dropped: no sink installed");
            }
            return true;
        }

        false
    }

    /// Debounced auto-registration of common UI patterns (charts, metric
    /// tiles, tables, status badges). Returns how many elements were newly
    /// registered; a call inside the debounce window registers nothing.
    pub fn auto_scan(&mut self, elements: &[ElementSnapshot]) -> usize {
        let now = Instant::now();
        if let Some(last) = self.last_scan {
            if now.duration_since(last) < SCAN_DEBOUNCE {
                return 0;
            }
        }
        self.last_scan = Some(now);

        let mut registered = 0;
        for element in elements {
            if element.opted_out || self.is_registered(&element.path) {
                continue;
            }
            let Some((description, data)) = classify(element) else {
                continue;
            };
            self.register(&element.path, description, Some(data));
            registered += 1;
        }
        registered
    }
}

impl Default for ExplainRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Pattern-match one element against the auto-registration heuristics.
fn classify(element: &ElementSnapshot) -> Option<(String, Value)> {
    let classes = element.classes.to_lowercase();
    let tag = element.tag.to_lowercase();
    let text = element.text.trim();

    if tag == "canvas" || tag == "svg" || classes.contains("chart") || classes.contains("graph") {
        let label = if element.classes.is_empty() {
            element.tag.clone()
        } else {
            element.classes.clone()
        };
        return Some((
            "Chart or visualization".to_string(),
            json!({ "type": "chart", "element": label }),
        ));
    }

    if (classes.contains("metric") || classes.contains("card") || classes.contains("stat"))
        && NUMBER_RE.is_match(text)
    {
        let preview: String = text.chars().take(50).collect();
        return Some((
            format!("Metric card: {}...", preview),
            json!({ "type": "metric", "value": text }),
        ));
    }

    if tag == "table" || classes.contains("table") {
        return Some(("Data table".to_string(), json!({ "type": "table" })));
    }

    if (classes.contains("badge") || classes.contains("status") || classes.contains("tag"))
        && !text.is_empty()
    {
        return Some((
            format!("Status indicator: {}", text),
            json!({ "type": "badge", "status": text }),
        ));
    }

    None
}

/// Bounded description of the clicked element.
fn gather_facts(element: &ElementSnapshot) -> Value {
    let text: String = element.text.trim().chars().take(TEXT_CAP).collect();
    let numbers: Vec<String> = NUMBER_RE
        .find_iter(&text)
        .take(MAX_NUMBERS)
        .map(|m| m.as_str().to_string())
        .collect();

    json!({
        "tag": element.tag,
        "classes": element.classes,
        "title": element.title.clone().unwrap_or_default(),
        "aria": element.aria_label.clone().unwrap_or_default(),
        "dataset": element.dataset,
        "text": text,
        "parentHeading": element.nearest_heading.clone().unwrap_or_default(),
        "numbers": numbers,
    })
}

/// Caller-supplied data first, gathered facts layered on top.
fn merge(base: &Value, facts: Value) -> Value {
    let mut merged: Map<String, Value> = match base {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    if let Value::Object(fact_map) = facts {
        for (key, value) in fact_map {
            merged.insert(key, value);
        }
    }
    Value::Object(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn snapshot(path: &str) -> ElementSnapshot {
        ElementSnapshot {
            path: path.to_string(),
            tag: "div".to_string(),
            ..Default::default()
        }
    }

    fn sink_capture(registry: &mut ExplainRegistry) -> Arc<Mutex<Vec<ExplainPrompt>>> {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let captured_clone = captured.clone();
        registry.set_sink(move |prompt| {
            captured_clone.lock().unwrap().push(prompt);
        });
        captured
    }

    #[test]
    fn test_click_on_registered_element_forwards_facts() {
        let mut registry = ExplainRegistry::new();
        let captured = sink_capture(&mut registry);
        registry.register(
            "main/revenue-tile",
            "Revenue metric tile",
            Some(json!({ "module": "revenue-strategy" })),
        );

        let mut element = snapshot("main/revenue-tile");
        element.text = "Monthly revenue $12,400 up 8.5%".to_string();
        element.nearest_heading = Some("Revenue Overview".to_string());

        assert!(registry.handle_click(&[element]));

        let prompts = captured.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].description, "Revenue metric tile");
        assert_eq!(prompts[0].data["module"], "revenue-strategy");
        assert_eq!(prompts[0].data["parentHeading"], "Revenue Overview");
        let numbers = prompts[0].data["numbers"].as_array().unwrap();
        assert!(numbers.iter().any(|n| n == "$12,400"));
        assert!(numbers.iter().any(|n| n == "8.5%"));
    }

    #[test]
    fn test_click_walks_up_to_registered_ancestor() {
        let mut registry = ExplainRegistry::new();
        let captured = sink_capture(&mut registry);
        registry.register("page/chart", "Chart or visualization", None);

        let path = vec![snapshot("page/chart/legend/item-3"), snapshot("page/chart")];
        assert!(registry.handle_click(&path));
        assert_eq!(captured.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_click_without_registered_ancestor_is_ignored() {
        let registry = ExplainRegistry::new();
        assert!(!registry.handle_click(&[snapshot("page/somewhere")]));
    }

    #[test]
    fn test_input_and_assistant_clicks_never_intercepted() {
        let mut registry = ExplainRegistry::new();
        let captured = sink_capture(&mut registry);
        registry.register("form/amount", "Amount field", None);

        let mut input = snapshot("form/amount");
        input.in_input_control = true;
        assert!(!registry.handle_click(&[input]));

        let mut chat = snapshot("form/amount");
        chat.in_assistant_ui = true;
        assert!(!registry.handle_click(&[chat]));

        assert!(captured.lock().unwrap().is_empty());
    }

    #[test]
    fn test_opted_out_subtree_suppresses_click() {
        let mut registry = ExplainRegistry::new();
        let captured = sink_capture(&mut registry);
        registry.register("page/panel", "Panel", None);

        let mut middle = snapshot("page/panel/inner");
        middle.opted_out = true;
        let path = vec![snapshot("page/panel/inner/leaf"), middle, snapshot("page/panel")];
        assert!(!registry.handle_click(&path));
        assert!(captured.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_sink_is_a_noop_but_still_intercepts() {
        let mut registry = ExplainRegistry::new();
        registry.register("page/tile", "Tile", None);
        assert!(registry.handle_click(&[snapshot("page/tile")]));
    }

    #[test]
    fn test_unregister_removes_element() {
        let mut registry = ExplainRegistry::new();
        registry.register("page/tile", "Tile", None);
        assert!(registry.is_registered("page/tile"));
        registry.unregister("page/tile");
        assert!(!registry.is_registered("page/tile"));
    }

    #[test]
    fn test_auto_scan_registers_common_patterns() {
        let mut registry = ExplainRegistry::new();

        let mut chart = snapshot("page/chart-1");
        chart.tag = "svg".to_string();
        let mut metric = snapshot("page/metric-1");
        metric.classes = "metric-card".to_string();
        metric.text = "Compliance score 87%".to_string();
        let mut table = snapshot("page/table-1");
        table.tag = "table".to_string();
        let mut badge = snapshot("page/badge-1");
        badge.classes = "status-badge".to_string();
        badge.text = "Overdue".to_string();
        let plain = snapshot("page/paragraph");

        let count = registry.auto_scan(&[chart, metric, table, badge, plain]);
        assert_eq!(count, 4);
        assert!(registry.is_registered("page/chart-1"));
        assert!(registry.is_registered("page/badge-1"));
        assert!(!registry.is_registered("page/paragraph"));
    }

    #[test]
    fn test_auto_scan_is_debounced_and_idempotent() {
        let mut registry = ExplainRegistry::new();
        let mut chart = snapshot("page/chart-1");
        chart.tag = "canvas".to_string();

        assert_eq!(registry.auto_scan(std::slice::from_ref(&chart)), 1);
        // Second call lands inside the debounce window.
        assert_eq!(registry.auto_scan(std::slice::from_ref(&chart)), 0);
    }

    #[test]
    fn test_auto_scan_skips_opted_out() {
        let mut registry = ExplainRegistry::new();
        let mut chart = snapshot("page/chart-1");
        chart.tag = "svg".to_string();
        chart.opted_out = true;

        assert_eq!(registry.auto_scan(&[chart]), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_element_key_is_stable() {
        assert_eq!(
            ElementKey::from_path("page/tile"),
            ElementKey::from_path("page/tile")
        );
        assert_ne!(
            ElementKey::from_path("page/tile"),
            ElementKey::from_path("page/other")
        );
    }
}
