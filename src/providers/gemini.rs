//! Gemini adapter
//!
//! Gemini's envelope differs from the OpenAI shape: the system preamble
//! travels in a dedicated `system_instruction` field and conversation turns
//! go in a `contents` list with the assistant role mapped to "model".

use crate::error::AssistantError;
use crate::models::{EnrichmentBundle, Message, MessageRole};
use crate::providers::{system_preamble, ProviderAdapter};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const TEMPERATURE: f32 = 0.3;
const MAX_OUTPUT_TOKENS: i32 = 1024;

pub struct GeminiAdapter {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl GeminiAdapter {
    pub fn new(api_key: Option<String>, model: String, timeout: Duration) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            model,
        }
    }
}

#[async_trait::async_trait]
impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(
        &self,
        history: &[Message],
        enrichment: &EnrichmentBundle,
    ) -> crate::Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AssistantError::ProviderError("gemini: API key not configured".to_string())
        })?;

        let url = format!(
            "{}/{}:generateContent?key={}",
            BASE_URL, self.model, api_key
        );
        let request = build_request(history, enrichment);

        info!(model = %self.model, "calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                AssistantError::ProviderError(format!("gemini request failed: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", body);
            return Err(AssistantError::ProviderError(format!(
                "gemini returned {}: {}",
                status, body
            )));
        }

        let payload: GeminiResponse = response.json().await.map_err(|e| {
            AssistantError::ProviderError(format!("gemini response parse error: {}", e))
        })?;

        let text = payload
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .filter(|t| !t.trim().is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AssistantError::ProviderError(
                "gemini: empty response".to_string(),
            ));
        }

        Ok(text)
    }
}

fn build_request(history: &[Message], enrichment: &EnrichmentBundle) -> GeminiRequest {
    let contents = history
        .iter()
        .map(|msg| Content {
            role: match msg.role {
                MessageRole::User => "user",
                MessageRole::Assistant => "model",
            },
            parts: vec![Part {
                text: msg.content.clone(),
            }],
        })
        .collect();

    let system_instruction = system_preamble(enrichment).map(|text| SystemInstruction {
        parts: vec![Part { text }],
    });

    GeminiRequest {
        contents,
        system_instruction,
        generation_config: GenerationConfig {
            temperature: TEMPERATURE,
            max_output_tokens: MAX_OUTPUT_TOKENS,
        },
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: i32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_maps_assistant_to_model() {
        let history = vec![
            Message::new(MessageRole::User, "Is my budget realistic?", "financial-advisory"),
            Message::new(MessageRole::Assistant, "Let's look at it.", "financial-advisory"),
        ];
        let request = build_request(&history, &EnrichmentBundle::default());

        assert_eq!(request.contents.len(), 2);
        assert_eq!(request.contents[0].role, "user");
        assert_eq!(request.contents[1].role, "model");
        assert!(request.system_instruction.is_none());
    }

    #[test]
    fn test_build_request_carries_system_instruction() {
        let enrichment = EnrichmentBundle {
            app_context: Some("page excerpt".to_string()),
            knowledge: None,
            web: vec![],
            system: "You are the assistant.".to_string(),
        };
        let history = vec![Message::new(MessageRole::User, "hi", "economic-forecasting")];
        let request = build_request(&history, &enrichment);

        let instruction = request.system_instruction.unwrap();
        assert!(instruction.parts[0].text.contains("page excerpt"));
    }

    #[test]
    fn test_request_serialization_uses_camel_case_config() {
        let history = vec![Message::new(MessageRole::User, "hello", "economic-forecasting")];
        let request = build_request(&history, &EnrichmentBundle::default());

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("generationConfig"));
        assert!(json.contains("maxOutputTokens"));
        assert!(!json.contains("system_instruction"));
    }

    #[test]
    fn test_response_parsing_joins_parts() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{"text": "first"}, {"text": "second"}] }
            }]
        }"#;
        let parsed: GeminiResponse = serde_json::from_str(raw).unwrap();
        let joined: Vec<&str> = parsed.candidates[0]
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        assert_eq!(joined, vec!["first", "second"]);
    }
}
