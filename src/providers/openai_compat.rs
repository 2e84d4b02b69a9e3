//! OpenAI-compatible chat adapter
//!
//! Covers both Groq and OpenAI, which share the flat role/content message
//! envelope. Uses a long-lived reqwest::Client for connection pooling.

use crate::config::ChatProviderConfig;
use crate::error::AssistantError;
use crate::models::{EnrichmentBundle, Message, MessageRole};
use crate::providers::{system_preamble, ProviderAdapter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const TEMPERATURE: f32 = 0.3;

pub struct OpenAiChatAdapter {
    name: &'static str,
    client: Client,
    config: ChatProviderConfig,
}

impl OpenAiChatAdapter {
    pub fn new(name: &'static str, config: ChatProviderConfig, timeout: Duration) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            name,
            client,
            config,
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for OpenAiChatAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn generate(
        &self,
        history: &[Message],
        enrichment: &EnrichmentBundle,
    ) -> crate::Result<String> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            AssistantError::ProviderError(format!("{}: API key not configured", self.name))
        })?;

        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: TEMPERATURE,
            messages: build_messages(history, enrichment),
        };

        info!(provider = self.name, model = %self.config.model, "calling chat completions API");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = self.name, "chat request failed: {}", e);
                AssistantError::ProviderError(format!("{} request failed: {}", self.name, e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = self.name, %status, "chat API error response: {}", body);
            return Err(AssistantError::ProviderError(format!(
                "{} returned {}: {}",
                self.name, status, body
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            AssistantError::ProviderError(format!("{} response parse error: {}", self.name, e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                AssistantError::ProviderError(format!("{}: response missing content", self.name))
            })
    }
}

/// Flat role/content list: one leading system message carrying the preamble
/// and context, then the conversation turns.
fn build_messages(history: &[Message], enrichment: &EnrichmentBundle) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(system) = system_preamble(enrichment) {
        messages.push(ChatMessage {
            role: "system",
            content: system,
        });
    }
    for msg in history {
        messages.push(ChatMessage {
            role: match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "assistant",
            },
            content: msg.content.clone(),
        });
    }
    messages
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enrichment() -> EnrichmentBundle {
        EnrichmentBundle {
            app_context: None,
            knowledge: None,
            web: vec![],
            system: "You are the assistant.".to_string(),
        }
    }

    #[test]
    fn test_build_messages_roles_and_order() {
        let history = vec![
            Message::new(MessageRole::Assistant, "Welcome!", "tax-compliance"),
            Message::new(MessageRole::User, "What is my compliance score?", "tax-compliance"),
        ];

        let messages = build_messages(&history, &enrichment());
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].role, "user");
        assert_eq!(messages[2].content, "What is my compliance score?");
    }

    #[test]
    fn test_build_messages_without_system() {
        let history = vec![Message::new(MessageRole::User, "hi", "economic-forecasting")];
        let messages = build_messages(&history, &EnrichmentBundle::default());
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, "user");
    }

    #[test]
    fn test_request_serialization() {
        let request = ChatCompletionRequest {
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: TEMPERATURE,
            messages: vec![ChatMessage {
                role: "user",
                content: "What is NPV?".to_string(),
            }],
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("What is NPV?"));
        assert!(json.contains("llama-3.3-70b-versatile"));
    }

    #[test]
    fn test_response_parsing_missing_content() {
        let parsed: ChatCompletionResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
