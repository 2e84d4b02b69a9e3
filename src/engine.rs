//! Turn engine
//!
//! Assembles one conversational turn end to end: a user utterance (typed,
//! suggestion click, or explain-on-click) is appended to its topic log,
//! enriched with local app state and optional web/backend context, answered
//! through the provider fallback chain, and the reply is appended behind it.
//! Every failure path ends in a renderable reply; there is no fatal error
//! class in this pipeline.

use crate::actions::{ActionExecutor, SignalBus, UiBridge};
use crate::backend::AgentBackendClient;
use crate::config::Config;
use crate::models::{EnrichmentBundle, Message, MessageRole, WebFragment};
use crate::providers::ProviderChain;
use crate::registry::{ContextRegistry, ToolCatalog};
use crate::session::SessionStore;
use crate::snapshot::{AppSnapshot, StateReader};
use crate::web::WebContextFetcher;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// The one user-visible failure message; surfaced only when every reply
/// path is exhausted.
pub const DEGRADED_REPLY: &str =
    "Sorry, I couldn't reach the AI right now. Please try again in a moment.";

const AGENT_COMMAND_PREFIX: &str = "/agent";

pub struct ChatEngine {
    sessions: SessionStore,
    chain: ProviderChain,
    web: WebContextFetcher,
    backend: Option<AgentBackendClient>,
    reader: Arc<dyn StateReader>,
    executor: ActionExecutor,
    current_route: String,
}

impl ChatEngine {
    pub fn new(config: &Config, reader: Arc<dyn StateReader>, ui: Arc<dyn UiBridge>) -> Self {
        let chain = ProviderChain::from_config(config);
        Self::with_chain(config, reader, ui, chain)
    }

    /// Build with an explicit provider chain; hosts and tests use this to
    /// inject custom adapters.
    pub fn with_chain(
        config: &Config,
        reader: Arc<dyn StateReader>,
        ui: Arc<dyn UiBridge>,
        chain: ProviderChain,
    ) -> Self {
        let registry = Arc::new(ContextRegistry::default());
        let catalog = Arc::new(ToolCatalog::default());
        let sessions = SessionStore::new(registry.clone());
        let current_route = registry.default_context().route.clone();

        Self {
            sessions,
            chain,
            web: WebContextFetcher::new(config),
            backend: AgentBackendClient::from_config(config),
            reader,
            executor: ActionExecutor::new(catalog, ui, SignalBus::new()),
            current_route,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn backend(&self) -> Option<&AgentBackendClient> {
        self.backend.as_ref()
    }

    pub fn signal_bus(&self) -> &SignalBus {
        self.executor.bus()
    }

    /// The host reports every navigation here; a route that resolves to a
    /// different topic switches and seeds it. Returns the new topic id.
    pub fn notify_route_change(&mut self, path: &str) -> Option<String> {
        self.current_route = path.to_string();
        self.sessions.detect_from_route(path)
    }

    pub fn activate_topic(&mut self, topic_id: &str) -> bool {
        self.sessions.activate(topic_id)
    }

    pub fn clear_topic(&mut self, topic_id: &str) {
        self.sessions.clear(topic_id)
    }

    /// A suggestion click is just a normal turn.
    pub async fn handle_suggestion(&mut self, suggestion: &str) -> Option<Message> {
        self.send_message(suggestion, None).await
    }

    /// Run one turn. Returns the assistant reply, or `None` for blank
    /// input. The target topic is resolved up front so the eventual reply
    /// lands in the topic that owned the turn even if the user navigates
    /// away mid-flight.
    pub async fn send_message(&mut self, content: &str, topic: Option<&str>) -> Option<Message> {
        let content = content.trim();
        if content.is_empty() {
            return None;
        }

        let target = topic
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(self.sessions.active_topic())
            .to_string();
        let ctx = self
            .sessions
            .registry()
            .lookup_by_id(&target)
            .unwrap_or_else(|| self.sessions.active_context())
            .clone();

        self.sessions
            .append(&target, Message::new(MessageRole::User, content, &target));

        // Explicit agent-control turns bypass the fallback chain entirely.
        if content.to_lowercase().starts_with(AGENT_COMMAND_PREFIX) {
            if let Some(backend) = self.backend.clone() {
                let clean = content[AGENT_COMMAND_PREFIX.len()..].trim();
                let reply_text = match backend.command(clean, &target).await {
                    Ok(outcome) => {
                        info!(actions = outcome.actions.len(), "agent command completed");
                        self.executor.execute(&outcome.actions);
                        outcome.reply
                    }
                    Err(error) => {
                        warn!(%error, "agent command failed");
                        DEGRADED_REPLY.to_string()
                    }
                };
                let reply = Message::new(MessageRole::Assistant, reply_text, &target)
                    .with_tools(tag_tools(content));
                self.sessions.append(&target, reply.clone());
                return Some(reply);
            }
        }

        let enrichment = self.build_enrichment(content, &ctx.name, &ctx.id, &target).await;
        let history = self.sessions.messages(&target).to_vec();

        let mut reply_text = self.chain.generate(&history, &enrichment).await;

        // Legacy backend reply, consulted strictly after chain exhaustion.
        if reply_text.is_none() {
            if let Some(backend) = &self.backend {
                reply_text = match backend.generate_response(&history, &target).await {
                    Ok(text) => Some(text),
                    Err(error) => {
                        warn!(%error, "backend reply fallback failed");
                        None
                    }
                };
            }
        }

        let reply_text = reply_text.unwrap_or_else(|| DEGRADED_REPLY.to_string());
        let reply = Message::new(MessageRole::Assistant, reply_text, &target)
            .with_tools(tag_tools(content));
        self.sessions.append(&target, reply.clone());
        Some(reply)
    }

    /// Treat a clicked UI element as a synthetic user turn asking for an
    /// explanation. Only the assistant reply is appended to the log.
    pub async fn explain_element(&mut self, description: &str, data: Option<Value>) -> Message {
        let ctx = self.sessions.active_context().clone();
        let target = ctx.id.clone();

        let synthetic = Message::new(
            MessageRole::User,
            format!(
                "Explain this UI element: {}. If helpful, relate it to {}.",
                description, ctx.name
            ),
            &target,
        );
        let mut history = self.sessions.messages(&target).to_vec();
        history.push(synthetic);

        let mut enrichment = EnrichmentBundle {
            system: format!(
                "You are the assistant embedded in a web app. The user clicked an element \
                 described as: \"{}\". Provide a concise explanation relevant to the current \
                 module ({}). If numbers or metrics are present in data, interpret them and \
                 cite the values you used. Avoid hallucinations.",
                description, ctx.name
            ),
            ..Default::default()
        };
        if let Some(data) = data {
            let details: String = data.to_string().chars().take(6_000).collect();
            enrichment.web.push(WebFragment {
                source: "clicked-element".to_string(),
                text: format!("Clicked element details (JSON):\n{}", details),
            });
        }

        let reply_text = self.chain.generate(&history, &enrichment).await.unwrap_or_else(|| {
            format!(
                "You clicked on \"{}\". I can help explain the data and insights on your \
                 screen. Could you be more specific about what you'd like to understand?",
                description
            )
        });

        let reply = Message::new(MessageRole::Assistant, reply_text, &target);
        self.sessions.append(&target, reply.clone());
        reply
    }

    /// Snapshot, knowledge and web context for one turn. The snapshot is a
    /// local read; knowledge and web are awaited concurrently. Everything
    /// fails soft and the bundle is always usable.
    async fn build_enrichment(
        &self,
        utterance: &str,
        module_name: &str,
        module_id: &str,
        target: &str,
    ) -> EnrichmentBundle {
        let snapshot =
            AppSnapshot::collect(self.reader.as_ref(), self.sessions.registry(), &self.current_route);

        let knowledge_fut = async {
            match &self.backend {
                Some(backend) => backend.knowledge_fragment(target).await,
                None => None,
            }
        };
        let web_fut = self.web.gather(utterance);
        let (knowledge, web) = tokio::join!(knowledge_fut, web_fut);

        EnrichmentBundle {
            app_context: Some(snapshot.format_for_prompt()),
            knowledge,
            web,
            system: format!(
                "You are the assistant for this business dashboard: you support businesses \
                 by gathering and processing macro and in-business information across the \
                 application. The current module is \"{}\" ({}).\n\nUse in-app knowledge \
                 (KPIs and insights) and any provided web context to ground your answer. Be \
                 precise, cite metrics you use, and tailor recommendations to the user's \
                 request and the module.",
                module_name, module_id
            ),
        }
    }
}

/// Attach a tool id when the utterance names one of the embedded tools.
/// Keyword containment only; the tag shape is the contract, not the terms.
fn tag_tools(content: &str) -> Option<Vec<String>> {
    let lower = content.to_lowercase();
    if lower.contains("calculator") {
        Some(vec!["economic-calculator".to_string()])
    } else if lower.contains("forecast") {
        Some(vec!["forecast-wizard".to_string()])
    } else if lower.contains("budget") {
        Some(vec!["budget-planner".to_string()])
    } else {
        None
    }
}
