//! Provider fallback chain
//!
//! A fixed, ordered list of upstream language-model adapters. Each adapter
//! owns its own request/response schema translation; the chain treats them
//! uniformly as (history, enrichment) -> text or failure.
//!
//! Attempts are strictly sequential and stop at the first usable answer.
//! That ordering is a design contract: a later adapter must never run once
//! an earlier one has succeeded, and adapters are never tried out of
//! configured order.

pub mod gemini;
pub mod openai_compat;

use crate::config::Config;
use crate::error::Result;
use crate::models::{EnrichmentBundle, Message};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub use gemini::GeminiAdapter;
pub use openai_compat::OpenAiChatAdapter;

/// Translation layer between the shared request shape and one upstream API.
#[async_trait::async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether credentials/configuration for this adapter are present.
    /// Unconfigured adapters are skipped without counting as a failure.
    fn is_configured(&self) -> bool;

    async fn generate(
        &self,
        history: &[Message],
        enrichment: &EnrichmentBundle,
    ) -> Result<String>;
}

pub struct ProviderChain {
    adapters: Vec<Arc<dyn ProviderAdapter>>,
}

impl ProviderChain {
    pub fn new(adapters: Vec<Arc<dyn ProviderAdapter>>) -> Self {
        Self { adapters }
    }

    /// The production chain, in priority order: Groq, OpenAI, Gemini.
    pub fn from_config(config: &Config) -> Self {
        Self::new(vec![
            Arc::new(OpenAiChatAdapter::new(
                "groq",
                config.groq.clone(),
                config.provider_timeout,
            )),
            Arc::new(OpenAiChatAdapter::new(
                "openai",
                config.openai.clone(),
                config.provider_timeout,
            )),
            Arc::new(GeminiAdapter::new(
                config.gemini_api_key.clone(),
                config.gemini_model.clone(),
                config.provider_timeout,
            )),
        ])
    }

    /// Try each configured adapter in order; return the first non-empty
    /// reply. `None` when every configured adapter is exhausted.
    pub async fn generate(
        &self,
        history: &[Message],
        enrichment: &EnrichmentBundle,
    ) -> Option<String> {
        for adapter in &self.adapters {
            if !adapter.is_configured() {
                debug!(provider = adapter.name(), "adapter unconfigured, skipping");
                continue;
            }

            match adapter.generate(history, enrichment).await {
                Ok(text) if !text.trim().is_empty() => {
                    info!(provider = adapter.name(), "provider reply accepted");
                    return Some(text);
                }
                Ok(_) => {
                    warn!(provider = adapter.name(), "provider returned empty text");
                }
                Err(error) => {
                    warn!(provider = adapter.name(), %error, "provider attempt failed");
                }
            }
        }

        None
    }
}

/// Fold the per-turn context into the system preamble shared by every
/// adapter envelope.
pub(crate) fn system_preamble(enrichment: &EnrichmentBundle) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    let system = enrichment.system.trim();
    if !system.is_empty() {
        parts.push(system.to_string());
    }
    if let Some(context) = enrichment.combined_context() {
        parts.push(format!("Relevant context (summarized):\n{}", context));
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use crate::models::MessageRole;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Succeed(&'static str),
        Fail,
        Empty,
    }

    struct MockAdapter {
        name: &'static str,
        configured: bool,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl MockAdapter {
        fn new(name: &'static str, configured: bool, behavior: Behavior) -> Self {
            Self {
                name,
                configured,
                behavior,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ProviderAdapter for MockAdapter {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn generate(
            &self,
            _history: &[Message],
            _enrichment: &EnrichmentBundle,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed(text) => Ok(text.to_string()),
                Behavior::Fail => Err(AssistantError::ProviderError("unavailable".into())),
                Behavior::Empty => Ok("   ".to_string()),
            }
        }
    }

    fn history() -> Vec<Message> {
        vec![Message::new(MessageRole::User, "hello", "economic-forecasting")]
    }

    #[tokio::test]
    async fn test_first_success_stops_the_chain() {
        let a = Arc::new(MockAdapter::new("a", true, Behavior::Fail));
        let b = Arc::new(MockAdapter::new("b", true, Behavior::Succeed("from b")));
        let c = Arc::new(MockAdapter::new("c", true, Behavior::Succeed("from c")));
        let chain = ProviderChain::new(vec![a.clone(), b.clone(), c.clone()]);

        let reply = chain.generate(&history(), &EnrichmentBundle::default()).await;
        assert_eq!(reply.as_deref(), Some("from b"));
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
        assert_eq!(c.call_count(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_none() {
        let a = Arc::new(MockAdapter::new("a", true, Behavior::Fail));
        let b = Arc::new(MockAdapter::new("b", true, Behavior::Empty));
        let c = Arc::new(MockAdapter::new("c", true, Behavior::Fail));
        let chain = ProviderChain::new(vec![a.clone(), b.clone(), c.clone()]);

        let reply = chain.generate(&history(), &EnrichmentBundle::default()).await;
        assert!(reply.is_none());
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
        assert_eq!(c.call_count(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_adapters_are_skipped_silently() {
        let a = Arc::new(MockAdapter::new("a", false, Behavior::Succeed("never")));
        let b = Arc::new(MockAdapter::new("b", true, Behavior::Succeed("from b")));
        let chain = ProviderChain::new(vec![a.clone(), b.clone()]);

        let reply = chain.generate(&history(), &EnrichmentBundle::default()).await;
        assert_eq!(reply.as_deref(), Some("from b"));
        assert_eq!(a.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_chain_is_exhausted() {
        let chain = ProviderChain::new(vec![]);
        assert!(chain
            .generate(&history(), &EnrichmentBundle::default())
            .await
            .is_none());
    }

    #[test]
    fn test_system_preamble_folds_context() {
        let enrichment = EnrichmentBundle {
            app_context: Some("app data".to_string()),
            knowledge: None,
            web: vec![],
            system: "You are the assistant.".to_string(),
        };
        let preamble = system_preamble(&enrichment).unwrap();
        assert!(preamble.starts_with("You are the assistant."));
        assert!(preamble.contains("Relevant context (summarized):"));
        assert!(preamble.contains("app data"));
    }

    #[test]
    fn test_system_preamble_empty() {
        assert!(system_preamble(&EnrichmentBundle::default()).is_none());
    }
}
