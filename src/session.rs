//! Per-topic conversation sessions
//!
//! One ordered message log per module context, created lazily and held in
//! memory for the process lifetime. A topic moves Unvisited -> Seeded the
//! first time it is activated (explicitly or via route detection); the
//! transition inserts exactly one assistant welcome message and never
//! happens again unless the log is cleared.

use crate::models::{Message, MessageRole};
use crate::registry::{ContextRegistry, ModuleContext};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// How a topic became active; decides the welcome phrasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activation {
    Initial,
    Explicit,
    RouteDetected,
    Cleared,
}

pub struct SessionStore {
    registry: Arc<ContextRegistry>,
    logs: HashMap<String, Vec<Message>>,
    active: String,
}

impl SessionStore {
    /// Create a store with the catalog's first context active and seeded.
    pub fn new(registry: Arc<ContextRegistry>) -> Self {
        let active = registry.default_context().id.clone();
        let mut store = Self {
            registry,
            logs: HashMap::new(),
            active,
        };
        let default = store.registry.default_context().clone();
        store.seed_if_empty(&default, Activation::Initial);
        store
    }

    pub fn active_topic(&self) -> &str {
        &self.active
    }

    pub fn active_context(&self) -> &ModuleContext {
        // The active id always comes from the registry.
        self.registry
            .lookup_by_id(&self.active)
            .unwrap_or_else(|| self.registry.default_context())
    }

    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    /// Messages for a topic, oldest first. Unvisited topics yield an empty
    /// slice.
    pub fn messages(&self, topic_id: &str) -> &[Message] {
        self.logs.get(topic_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append at the tail of the topic's log.
    pub fn append(&mut self, topic_id: &str, message: Message) {
        self.logs
            .entry(topic_id.to_string())
            .or_default()
            .push(message);
    }

    /// Explicitly switch the active topic. Returns false when the id is not
    /// in the catalog; the store is unchanged in that case.
    pub fn activate(&mut self, topic_id: &str) -> bool {
        let Some(ctx) = self.registry.lookup_by_id(topic_id).cloned() else {
            return false;
        };
        self.active = ctx.id.clone();
        self.seed_if_empty(&ctx, Activation::Explicit);
        true
    }

    /// Compare the route against the catalog; switch and seed when it
    /// resolves to a different topic. Returns the newly active topic id.
    pub fn detect_from_route(&mut self, path: &str) -> Option<String> {
        let ctx = self.registry.lookup_by_route(path)?.clone();
        if ctx.id == self.active {
            return None;
        }
        debug!(topic = %ctx.id, route = %path, "route change switched active topic");
        self.active = ctx.id.clone();
        self.seed_if_empty(&ctx, Activation::RouteDetected);
        Some(ctx.id)
    }

    /// Reset a topic's log and immediately reseed it, so an initialized
    /// topic is never left empty.
    pub fn clear(&mut self, topic_id: &str) {
        let Some(ctx) = self.registry.lookup_by_id(topic_id).cloned() else {
            return;
        };
        self.logs.insert(ctx.id.clone(), Vec::new());
        self.seed_if_empty(&ctx, Activation::Cleared);
    }

    fn seed_if_empty(&mut self, ctx: &ModuleContext, activation: Activation) {
        let log = self.logs.entry(ctx.id.clone()).or_default();
        if !log.is_empty() {
            return;
        }

        let content = match activation {
            Activation::Initial => format!(
                "Hello! I'm your business assistant for {}. I can help explain data, \
                 answer questions, and provide insights. What would you like to know?",
                ctx.name
            ),
            Activation::Explicit => format!(
                "Welcome to {}! I can help you with {}. What questions do you have?",
                ctx.name,
                ctx.description.to_lowercase()
            ),
            Activation::RouteDetected => format!(
                "I've switched to {} mode. I can now help you with {}. \
                 What would you like to know?",
                ctx.name,
                ctx.description.to_lowercase()
            ),
            Activation::Cleared => format!(
                "Hi! I'm your business assistant. I'm currently in {} mode. \
                 How can I help you today?",
                ctx.name
            ),
        };

        log.push(Message::new(MessageRole::Assistant, content, ctx.id.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(ContextRegistry::default()))
    }

    #[test]
    fn test_default_topic_seeded_once() {
        let store = store();
        assert_eq!(store.active_topic(), "economic-forecasting");
        assert_eq!(store.messages("economic-forecasting").len(), 1);
        assert_eq!(
            store.messages("economic-forecasting")[0].role,
            MessageRole::Assistant
        );
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let mut store = store();
        for _ in 0..5 {
            assert!(store.activate("tax-compliance"));
        }
        assert_eq!(store.messages("tax-compliance").len(), 1);
    }

    #[test]
    fn test_activate_unknown_topic_is_noop() {
        let mut store = store();
        assert!(!store.activate("not-a-topic"));
        assert_eq!(store.active_topic(), "economic-forecasting");
        assert!(store.messages("not-a-topic").is_empty());
    }

    #[test]
    fn test_route_auto_switch_seeds_new_topic_only() {
        let mut store = store();
        store.append(
            "economic-forecasting",
            Message::new(MessageRole::User, "hello", "economic-forecasting"),
        );
        let before = store.messages("economic-forecasting").len();

        let switched = store.detect_from_route("/pricing-strategy");
        assert_eq!(switched.as_deref(), Some("pricing-strategy"));
        assert_eq!(store.messages("pricing-strategy").len(), 1);

        // Navigating back must not reseed or lose prior messages.
        let back = store.detect_from_route("/");
        assert_eq!(back.as_deref(), Some("economic-forecasting"));
        assert_eq!(store.messages("economic-forecasting").len(), before);

        // Same route again is not a switch.
        assert!(store.detect_from_route("/").is_none());
    }

    #[test]
    fn test_unknown_route_keeps_active_topic() {
        let mut store = store();
        assert!(store.detect_from_route("/settings/profile").is_none());
        assert_eq!(store.active_topic(), "economic-forecasting");
    }

    #[test]
    fn test_clear_reseeds() {
        let mut store = store();
        store.activate("loan-funding");
        store.append(
            "loan-funding",
            Message::new(MessageRole::User, "compare my loan offers", "loan-funding"),
        );
        assert_eq!(store.messages("loan-funding").len(), 2);

        store.clear("loan-funding");
        let log = store.messages("loan-funding");
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role, MessageRole::Assistant);
    }

    #[test]
    fn test_append_preserves_order() {
        let mut store = store();
        let user = Message::new(MessageRole::User, "what is my tax due?", "tax-compliance");
        let reply = Message::new(MessageRole::Assistant, "Your tax due is...", "tax-compliance");
        store.activate("tax-compliance");
        store.append("tax-compliance", user.clone());
        store.append("tax-compliance", reply.clone());

        let log = store.messages("tax-compliance");
        assert_eq!(log[log.len() - 2].id, user.id);
        assert_eq!(log[log.len() - 1].id, reply.id);
    }
}
