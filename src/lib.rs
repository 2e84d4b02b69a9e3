//! Assistant Orchestrator
//!
//! Conversational orchestration engine for an embedded business-dashboard
//! assistant:
//! - Owns per-topic conversation sessions with one-time welcome seeding
//! - Enriches each turn with local app state and optional web context
//! - Answers through an ordered provider fallback chain (Groq, OpenAI,
//!   Gemini), stopping at the first usable reply
//! - Routes explicit `/agent` turns to a dedicated backend and interprets
//!   the structured actions its replies carry
//! - Lets any part of the UI be marked explainable and turns clicks on
//!   those elements into synthetic turns
//!
//! The surrounding UI is an external collaborator: it reports navigation,
//! clicks and utterances, and renders the message logs and action effects
//! this engine produces.

pub mod actions;
pub mod api;
pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod explain;
pub mod models;
pub mod providers;
pub mod registry;
pub mod session;
pub mod snapshot;
pub mod web;

pub use error::Result;

// Re-export common types
pub use config::Config;
pub use engine::{ChatEngine, DEGRADED_REPLY};
pub use models::*;
pub use registry::{ContextRegistry, ModuleContext, ToolCatalog};
