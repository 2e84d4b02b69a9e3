//! Action descriptors and their executor
//!
//! The agent backend returns an open-ended list of instructions describing
//! local UI effects. Known kinds are modeled as a closed sum type; anything
//! unrecognized is carried as `Unknown` and skipped. The executor must
//! never fail hard on a malformed entry and never abort the rest of the
//! list - robustness to unknown descriptors is a correctness requirement.

use crate::registry::{DashboardTool, ToolCatalog};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

/// One structured instruction from the agent backend.
#[derive(Debug, Clone)]
pub enum Action {
    Navigate { to: String },
    OpenTool { tool: String },
    Toast { message: String },
    SetTheme { theme: Theme },
    RefreshData,
    /// Unrecognized or malformed descriptor, kept verbatim and skipped.
    Unknown(Value),
}

impl Action {
    /// Tolerant decoding: the tag may live under "type" or "name", and
    /// parameters have historical aliases. Anything that does not resolve
    /// to a well-formed known kind becomes `Unknown`.
    pub fn from_value(raw: &Value) -> Self {
        let kind = raw
            .get("type")
            .or_else(|| raw.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("");

        match kind {
            "navigate" => {
                let to = raw
                    .get("to")
                    .or_else(|| raw.get("route"))
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .unwrap_or("");
                if to.is_empty() {
                    Action::Unknown(raw.clone())
                } else {
                    Action::Navigate { to: to.to_string() }
                }
            }
            "open_tool" => {
                let tool = raw
                    .get("tool")
                    .or_else(|| raw.get("toolId"))
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if tool.is_empty() {
                    Action::Unknown(raw.clone())
                } else {
                    Action::OpenTool {
                        tool: tool.to_string(),
                    }
                }
            }
            "toast" => {
                let message = raw
                    .get("message")
                    .or_else(|| raw.get("text"))
                    .and_then(Value::as_str)
                    .unwrap_or("Done");
                Action::Toast {
                    message: message.to_string(),
                }
            }
            "set_theme" => match raw.get("theme").and_then(Value::as_str) {
                Some("dark") => Action::SetTheme { theme: Theme::Dark },
                Some("light") => Action::SetTheme {
                    theme: Theme::Light,
                },
                _ => Action::Unknown(raw.clone()),
            },
            "refresh_data" => Action::RefreshData,
            _ => Action::Unknown(raw.clone()),
        }
    }

    /// Decode a backend-supplied list. A non-array yields no actions.
    pub fn parse_list(raw: &Value) -> Vec<Action> {
        raw.as_array()
            .map(|items| items.iter().map(Action::from_value).collect())
            .unwrap_or_default()
    }
}

/// Process-wide publish mechanism for the `refresh_data` signal. The
/// executor does not know which components listen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    RefreshData,
}

#[derive(Clone)]
pub struct SignalBus {
    sender: broadcast::Sender<Signal>,
}

impl SignalBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Signal> {
        self.sender.subscribe()
    }

    pub fn publish(&self, signal: Signal) {
        // No receivers is fine; the signal is advisory.
        let _ = self.sender.send(signal);
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Host-provided surface for the local effects the executor performs.
pub trait UiBridge: Send + Sync {
    fn navigate(&self, route: &str);
    fn open_tool(&self, tool: &DashboardTool);
    fn toast(&self, message: &str);
    fn set_theme(&self, theme: Theme);
}

/// UiBridge for headless hosts: effects are only traced. A real UI installs
/// its own bridge.
pub struct LoggingUiBridge;

impl UiBridge for LoggingUiBridge {
    fn navigate(&self, route: &str) {
        tracing::info!(%route, "ui effect: navigate");
    }

    fn open_tool(&self, tool: &DashboardTool) {
        tracing::info!(tool = %tool.id, "ui effect: open tool");
    }

    fn toast(&self, message: &str) {
        tracing::info!(%message, "ui effect: toast");
    }

    fn set_theme(&self, theme: Theme) {
        tracing::info!(?theme, "ui effect: set theme");
    }
}

/// Small interpreter over the backend's instruction set.
pub struct ActionExecutor {
    catalog: Arc<ToolCatalog>,
    ui: Arc<dyn UiBridge>,
    bus: SignalBus,
}

impl ActionExecutor {
    pub fn new(catalog: Arc<ToolCatalog>, ui: Arc<dyn UiBridge>, bus: SignalBus) -> Self {
        Self { catalog, ui, bus }
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    /// Dispatch each descriptor in list order. Unknown and unresolvable
    /// entries are skipped without affecting the rest.
    pub fn execute(&self, actions: &[Action]) {
        for action in actions {
            match action {
                Action::Navigate { to } => self.ui.navigate(to),
                Action::OpenTool { tool } => match self.catalog.get(tool) {
                    Some(entry) if entry.is_available => self.ui.open_tool(entry),
                    _ => debug!(tool = %tool, "open_tool skipped: not in catalog or unavailable"),
                },
                Action::Toast { message } => self.ui.toast(message),
                Action::SetTheme { theme } => self.ui.set_theme(*theme),
                Action::RefreshData => self.bus.publish(Signal::RefreshData),
                Action::Unknown(raw) => {
                    debug!(descriptor = %raw, "skipping unknown action descriptor");
                }
            }
        }
    }

    /// Decode and execute a raw backend list in one step.
    pub fn execute_raw(&self, raw: &Value) {
        self.execute(&Action::parse_list(raw));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingUi {
        events: Mutex<Vec<String>>,
    }

    impl RecordingUi {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl UiBridge for RecordingUi {
        fn navigate(&self, route: &str) {
            self.push(format!("navigate:{}", route));
        }

        fn open_tool(&self, tool: &DashboardTool) {
            self.push(format!("open_tool:{}", tool.id));
        }

        fn toast(&self, message: &str) {
            self.push(format!("toast:{}", message));
        }

        fn set_theme(&self, theme: Theme) {
            self.push(format!("set_theme:{:?}", theme));
        }
    }

    fn executor() -> (ActionExecutor, Arc<RecordingUi>) {
        let ui = Arc::new(RecordingUi::default());
        let executor = ActionExecutor::new(
            Arc::new(ToolCatalog::default()),
            ui.clone(),
            SignalBus::new(),
        );
        (executor, ui)
    }

    #[test]
    fn test_from_value_known_kinds() {
        assert!(matches!(
            Action::from_value(&json!({"type": "navigate", "to": "/pricing-strategy"})),
            Action::Navigate { .. }
        ));
        assert!(matches!(
            Action::from_value(&json!({"name": "open_tool", "toolId": "budget-planner"})),
            Action::OpenTool { .. }
        ));
        assert!(matches!(
            Action::from_value(&json!({"type": "set_theme", "theme": "dark"})),
            Action::SetTheme { theme: Theme::Dark }
        ));
        assert!(matches!(
            Action::from_value(&json!({"type": "refresh_data"})),
            Action::RefreshData
        ));
    }

    #[test]
    fn test_from_value_malformed_and_unknown() {
        assert!(matches!(
            Action::from_value(&json!({"type": "navigate"})),
            Action::Unknown(_)
        ));
        assert!(matches!(
            Action::from_value(&json!({"type": "set_theme", "theme": "blue"})),
            Action::Unknown(_)
        ));
        assert!(matches!(
            Action::from_value(&json!({"type": "launch_rocket"})),
            Action::Unknown(_)
        ));
        assert!(matches!(Action::from_value(&json!(42)), Action::Unknown(_)));
    }

    #[test]
    fn test_toast_defaults_message() {
        let Action::Toast { message } = Action::from_value(&json!({"type": "toast"})) else {
            panic!("expected toast");
        };
        assert_eq!(message, "Done");
    }

    #[test]
    fn test_unknown_entry_is_skipped_in_order() {
        let (executor, ui) = executor();
        let actions = Action::parse_list(&json!([
            {"type": "toast", "message": "saved"},
            {"type": "do_magic", "sparkle": true},
            {"type": "navigate", "to": "/loan-funding"},
        ]));
        executor.execute(&actions);

        assert_eq!(
            ui.events(),
            vec!["toast:saved".to_string(), "navigate:/loan-funding".to_string()]
        );
    }

    #[test]
    fn test_open_tool_resolves_against_catalog() {
        let (executor, ui) = executor();
        executor.execute(&Action::parse_list(&json!([
            {"type": "open_tool", "tool": "forecast-wizard"},
            {"type": "open_tool", "tool": "no-such-tool"},
        ])));

        assert_eq!(ui.events(), vec!["open_tool:forecast-wizard".to_string()]);
    }

    #[test]
    fn test_refresh_data_publishes_signal() {
        let (executor, _ui) = executor();
        let mut receiver = executor.bus().subscribe();

        executor.execute(&[Action::RefreshData]);
        assert_eq!(receiver.try_recv().unwrap(), Signal::RefreshData);
    }

    #[test]
    fn test_parse_list_non_array() {
        assert!(Action::parse_list(&json!({"type": "toast"})).is_empty());
        assert!(Action::parse_list(&json!(null)).is_empty());
    }
}
