//! Agent backend client
//!
//! HTTP client over the optional agent backend: lifecycle control
//! (start/stop/status), the command endpoint used by explicit `/agent`
//! turns, the per-module knowledge query used as enrichment, and the
//! legacy generate-response reply fallback.
//!
//! An absent base URL means no client is constructed and every dependent
//! feature is silently disabled.

use crate::actions::Action;
use crate::config::Config;
use crate::error::AssistantError;
use crate::models::{AgentStatus, KnowledgeBundle, Message, MessageRole};
use crate::Result;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Reply from the command endpoint: text plus any planned UI actions.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub reply: String,
    pub actions: Vec<Action>,
}

#[derive(Clone)]
pub struct AgentBackendClient {
    client: Client,
    base_url: String,
}

impl AgentBackendClient {
    /// `None` when no backend URL is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let base_url = config.backend_base_url.clone()?;
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .timeout(config.provider_timeout)
            .build()
            .ok()?;

        info!(%base_url, "agent backend configured");
        Some(Self { client, base_url })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AssistantError::BackendError(format!("backend request failed for {}: {}", path, e))
            })?;

        let status = response.status();
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| AssistantError::BackendError(format!("invalid JSON response: {}", e)))?;

        if !status.is_success() {
            return Err(AssistantError::BackendError(format!(
                "backend returned {} for {}: {}",
                status, path, body
            )));
        }

        Ok(body)
    }

    pub async fn start(&self) -> Result<Value> {
        self.post_json("/assistant/agent/start/", &json!({})).await
    }

    pub async fn stop(&self) -> Result<Value> {
        self.post_json("/assistant/agent/stop/", &json!({})).await
    }

    pub async fn status(&self) -> Result<AgentStatus> {
        let url = format!("{}/assistant/agent/status/", self.base_url);
        let response = self.client.get(&url).send().await.map_err(|e| {
            AssistantError::BackendError(format!("status request failed: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AssistantError::BackendError(format!(
                "status returned {}",
                response.status()
            )));
        }

        response
            .json::<AgentStatus>()
            .await
            .map_err(|e| AssistantError::BackendError(format!("invalid status payload: {}", e)))
    }

    /// Free-text command with a module-context hint. The reply may carry
    /// action descriptors for the executor.
    pub async fn command(&self, message: &str, module: &str) -> Result<CommandOutcome> {
        let body = json!({
            "message": message,
            "context": { "module": module },
        });
        let payload = self.post_json("/assistant/agent/command/", &body).await?;
        Ok(parse_command_outcome(&payload))
    }

    /// Per-module KPI and insight bundle.
    pub async fn query(&self, module: &str) -> Result<KnowledgeBundle> {
        let payload = self
            .post_json("/assistant/agent/query/", &json!({ "module": module }))
            .await?;
        serde_json::from_value(payload)
            .map_err(|e| AssistantError::BackendError(format!("invalid query payload: {}", e)))
    }

    /// Fail-soft knowledge enrichment: `None` on any failure.
    pub async fn knowledge_fragment(&self, module: &str) -> Option<String> {
        match self.query(module).await {
            Ok(bundle) => bundle.format_for_prompt(module),
            Err(error) => {
                debug!(%module, %error, "knowledge query failed, continuing without it");
                None
            }
        }
    }

    /// Legacy reply endpoint, consulted only after the provider chain is
    /// exhausted.
    pub async fn generate_response(&self, history: &[Message], module: &str) -> Result<String> {
        let messages: Vec<Value> = history
            .iter()
            .map(|msg| {
                json!({
                    "type": match msg.role {
                        MessageRole::User => "user",
                        MessageRole::Assistant => "assistant",
                    },
                    "content": msg.content,
                    "context": msg.context,
                })
            })
            .collect();

        let body = json!({
            "messages": messages,
            "context": module,
            "currentData": {},
        });
        let payload = self.post_json("/assistant/generate-response/", &body).await?;

        payload
            .get("response")
            .and_then(Value::as_str)
            .map(|s| s.to_string())
            .ok_or_else(|| {
                AssistantError::BackendError("generate-response missing reply text".to_string())
            })
    }
}

/// Pull reply text and actions out of the command payload. A reply that is
/// not a plain string is carried as its JSON rendering.
fn parse_command_outcome(payload: &Value) -> CommandOutcome {
    let result = payload.get("result").unwrap_or(payload);

    let reply = match result.get("response") {
        Some(Value::String(text)) => text.clone(),
        _ => result.to_string(),
    };
    let actions = result
        .get("actions")
        .map(Action::parse_list)
        .unwrap_or_default();

    CommandOutcome { reply, actions }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_outcome_with_actions() {
        let payload = json!({
            "result": {
                "response": "Opening the budget planner.",
                "actions": [
                    { "type": "open_tool", "tool": "budget-planner" },
                    { "type": "mystery" }
                ]
            }
        });

        let outcome = parse_command_outcome(&payload);
        assert_eq!(outcome.reply, "Opening the budget planner.");
        assert_eq!(outcome.actions.len(), 2);
        assert!(matches!(outcome.actions[0], Action::OpenTool { .. }));
        assert!(matches!(outcome.actions[1], Action::Unknown(_)));
    }

    #[test]
    fn test_parse_command_outcome_structured_reply() {
        let payload = json!({ "result": { "response": { "summary": "done" } } });
        let outcome = parse_command_outcome(&payload);
        assert!(outcome.reply.contains("summary"));
        assert!(outcome.actions.is_empty());
    }

    #[test]
    fn test_parse_command_outcome_flat_payload() {
        let payload = json!({ "response": "ok" });
        let outcome = parse_command_outcome(&payload);
        assert_eq!(outcome.reply, "ok");
    }

    #[test]
    fn test_agent_status_deserializes_with_defaults() {
        let status: AgentStatus = serde_json::from_value(json!({
            "is_running": true,
            "last_updates": { "pricing-strategy": "2024-05-01T10:00:00Z" }
        }))
        .unwrap();
        assert!(status.is_running);
        assert_eq!(status.pending_tasks, 0);
        assert_eq!(status.last_updates.len(), 1);
    }

    #[test]
    fn test_unconfigured_backend_yields_no_client() {
        let config = Config::offline();
        assert!(AgentBackendClient::from_config(&config).is_none());
    }
}
