//! REST facade for the assistant engine
//!
//! Exposes the engine to an external UI process. The engine sits behind one
//! async mutex, which makes the at-most-one-turn-in-flight usage contract
//! concrete: a second turn arriving while one is outstanding queues behind
//! it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::engine::ChatEngine;
use crate::explain::{ElementSnapshot, ExplainRegistry};
use std::collections::HashMap;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    /// Target topic id; defaults to the active topic.
    pub context: Option<String>,
    /// Current route, reported so the engine can auto-detect the topic.
    pub route: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub description: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct RouteChangeRequest {
    pub route: String,
}

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    pub elements: Vec<ElementFacts>,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    /// Snapshots ordered from the click target up to the root.
    pub path: Vec<ElementFacts>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub path: String,
    pub description: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct UnregisterRequest {
    pub path: String,
}

/// Wire shape of one element snapshot reported by the UI.
#[derive(Debug, Deserialize)]
pub struct ElementFacts {
    pub path: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub classes: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub dataset: HashMap<String, String>,
    #[serde(default)]
    pub nearest_heading: Option<String>,
    #[serde(default)]
    pub in_input_control: bool,
    #[serde(default)]
    pub in_assistant_ui: bool,
    #[serde(default)]
    pub opted_out: bool,
}

impl From<ElementFacts> for ElementSnapshot {
    fn from(facts: ElementFacts) -> Self {
        ElementSnapshot {
            path: facts.path,
            tag: facts.tag,
            classes: facts.classes,
            text: facts.text,
            title: facts.title,
            aria_label: facts.aria_label,
            dataset: facts.dataset,
            nearest_heading: facts.nearest_heading,
            in_input_control: facts.in_input_control,
            in_assistant_ui: facts.in_assistant_ui,
            opted_out: facts.opted_out,
        }
    }
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub engine: Arc<Mutex<ChatEngine>>,
    pub registry: Arc<std::sync::Mutex<ExplainRegistry>>,
}

/// =============================
/// Handlers
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn chat(
    State(state): State<ApiState>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    info!(message = %req.message, "received chat request");

    let mut engine = state.engine.lock().await;
    if let Some(route) = req.route.as_deref() {
        engine.notify_route_change(route);
    }

    match engine.send_message(&req.message, req.context.as_deref()).await {
        Some(reply) => {
            let topic = reply.context.clone();
            (
                StatusCode::OK,
                Json(ApiResponse::success(serde_json::json!({
                    "reply": reply,
                    "topic": topic,
                }))),
            )
        }
        None => (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Message is empty".into())),
        ),
    }
}

async fn explain(
    State(state): State<ApiState>,
    Json(req): Json<ExplainRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let mut engine = state.engine.lock().await;
    let reply = engine.explain_element(&req.description, req.data).await;

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "reply": reply }))),
    )
}

async fn route_change(
    State(state): State<ApiState>,
    Json(req): Json<RouteChangeRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let mut engine = state.engine.lock().await;
    let switched = engine.notify_route_change(&req.route);

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "switched_to": switched,
            "active": engine.sessions().active_topic(),
        }))),
    )
}

async fn list_topics(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    let engine = state.engine.lock().await;
    let contexts = engine.sessions().registry().all().to_vec();

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "topics": contexts,
            "active": engine.sessions().active_topic(),
        }))),
    )
}

async fn topic_messages(
    State(state): State<ApiState>,
    Path(topic_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let engine = state.engine.lock().await;
    let messages = engine.sessions().messages(&topic_id).to_vec();

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "topic": topic_id,
            "messages": messages,
        }))),
    )
}

async fn activate_topic(
    State(state): State<ApiState>,
    Path(topic_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let mut engine = state.engine.lock().await;
    if engine.activate_topic(&topic_id) {
        (
            StatusCode::OK,
            Json(ApiResponse::success(serde_json::json!({ "active": topic_id }))),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Unknown topic: {}", topic_id))),
        )
    }
}

async fn clear_topic(
    State(state): State<ApiState>,
    Path(topic_id): Path<String>,
) -> (StatusCode, Json<ApiResponse>) {
    let mut engine = state.engine.lock().await;
    engine.clear_topic(&topic_id);

    let messages = engine.sessions().messages(&topic_id).to_vec();
    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({
            "topic": topic_id,
            "messages": messages,
        }))),
    )
}

async fn explainables_register(
    State(state): State<ApiState>,
    Json(req): Json<RegisterRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let mut registry = state.registry.lock().expect("explain registry poisoned");
    registry.register(&req.path, req.description, req.data);

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "registered": req.path }))),
    )
}

async fn explainables_unregister(
    State(state): State<ApiState>,
    Json(req): Json<UnregisterRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let mut registry = state.registry.lock().expect("explain registry poisoned");
    registry.unregister(&req.path);

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "unregistered": req.path }))),
    )
}

async fn explainables_scan(
    State(state): State<ApiState>,
    Json(req): Json<ScanRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let elements: Vec<ElementSnapshot> = req.elements.into_iter().map(Into::into).collect();
    let mut registry = state.registry.lock().expect("explain registry poisoned");
    let registered = registry.auto_scan(&elements);

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "registered": registered }))),
    )
}

async fn explainables_click(
    State(state): State<ApiState>,
    Json(req): Json<ClickRequest>,
) -> (StatusCode, Json<ApiResponse>) {
    let path: Vec<ElementSnapshot> = req.path.into_iter().map(Into::into).collect();
    let intercepted = {
        let registry = state.registry.lock().expect("explain registry poisoned");
        registry.handle_click(&path)
    };

    (
        StatusCode::OK,
        Json(ApiResponse::success(serde_json::json!({ "intercepted": intercepted }))),
    )
}

async fn agent_start(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    agent_lifecycle(state, "start").await
}

async fn agent_stop(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    agent_lifecycle(state, "stop").await
}

async fn agent_lifecycle(state: ApiState, op: &str) -> (StatusCode, Json<ApiResponse>) {
    let engine = state.engine.lock().await;
    let Some(backend) = engine.backend().cloned() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error("Agent backend not configured".into())),
        );
    };
    drop(engine);

    let result = match op {
        "start" => backend.start().await,
        _ => backend.stop().await,
    };
    match result {
        Ok(payload) => (StatusCode::OK, Json(ApiResponse::success(payload))),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error(format!("Agent {} failed: {}", op, e))),
        ),
    }
}

async fn agent_status(State(state): State<ApiState>) -> (StatusCode, Json<ApiResponse>) {
    let engine = state.engine.lock().await;
    let Some(backend) = engine.backend().cloned() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse::error("Agent backend not configured".into())),
        );
    };
    drop(engine);

    match backend.status().await {
        Ok(status) => (StatusCode::OK, Json(ApiResponse::success(status))),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(ApiResponse::error(format!("Agent status failed: {}", e))),
        ),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(
    engine: Arc<Mutex<ChatEngine>>,
    registry: Arc<std::sync::Mutex<ExplainRegistry>>,
) -> Router {
    let state = ApiState { engine, registry };

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/explain", post(explain))
        .route("/api/route", post(route_change))
        .route("/api/topics", get(list_topics))
        .route("/api/topics/:id/messages", get(topic_messages))
        .route("/api/topics/:id/activate", post(activate_topic))
        .route("/api/topics/:id/clear", post(clear_topic))
        .route("/api/explainables/register", post(explainables_register))
        .route("/api/explainables/unregister", post(explainables_unregister))
        .route("/api/explainables/scan", post(explainables_scan))
        .route("/api/explainables/click", post(explainables_click))
        .route("/api/agent/start", post(agent_start))
        .route("/api/agent/stop", post(agent_stop))
        .route("/api/agent/status", get(agent_status))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    engine: Arc<Mutex<ChatEngine>>,
    registry: Arc<std::sync::Mutex<ExplainRegistry>>,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(engine, registry);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_success_envelope() {
        let response = ApiResponse::success(serde_json::json!({ "ok": true }));
        assert!(response.success);
        assert!(response.error.is_none());
        assert_eq!(response.data.unwrap()["ok"], true);
    }

    #[test]
    fn test_api_response_error_envelope() {
        let response = ApiResponse::error("boom".into());
        assert!(!response.success);
        assert_eq!(response.error.as_deref(), Some("boom"));
        assert!(response.data.is_none());
    }

    #[test]
    fn test_element_facts_wire_defaults() {
        let facts: ElementFacts = serde_json::from_value(serde_json::json!({
            "path": "page/chart-1",
            "tag": "svg"
        }))
        .unwrap();
        let snapshot: ElementSnapshot = facts.into();
        assert_eq!(snapshot.path, "page/chart-1");
        assert_eq!(snapshot.tag, "svg");
        assert!(!snapshot.in_input_control);
        assert!(snapshot.dataset.is_empty());
    }
}
