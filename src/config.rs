//! Environment-driven configuration
//!
//! Every upstream surface is optional: a missing key or URL means the
//! corresponding adapter is unavailable and gets skipped, never an error.

use std::env;
use std::time::Duration;

const DEFAULT_GROQ_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const DEFAULT_GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";

const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com";
const DEFAULT_READER_ENDPOINT: &str = "https://r.jina.ai";

/// Configuration for one OpenAI-compatible chat provider.
#[derive(Debug, Clone)]
pub struct ChatProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

/// Snapshot of all engine configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq: ChatProviderConfig,
    pub openai: ChatProviderConfig,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,

    /// Agent backend base URL; `None` disables commands, knowledge
    /// enrichment and the legacy reply fallback.
    pub backend_base_url: Option<String>,

    /// Empty string disables the corresponding web-context step.
    pub search_endpoint: String,
    pub reader_endpoint: String,

    pub provider_timeout: Duration,
    pub fetch_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            groq: ChatProviderConfig {
                api_key: non_empty(env::var("GROQ_API_KEY").ok()),
                model: env::var("GROQ_MODEL")
                    .unwrap_or_else(|_| DEFAULT_GROQ_MODEL.to_string()),
                api_base: env::var("GROQ_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_GROQ_API_BASE.to_string()),
            },
            openai: ChatProviderConfig {
                api_key: non_empty(env::var("OPENAI_API_KEY").ok()),
                model: env::var("OPENAI_MODEL")
                    .unwrap_or_else(|_| DEFAULT_OPENAI_MODEL.to_string()),
                api_base: env::var("OPENAI_API_BASE")
                    .unwrap_or_else(|_| DEFAULT_OPENAI_API_BASE.to_string()),
            },
            gemini_api_key: non_empty(env::var("GEMINI_API_KEY").ok()),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),

            backend_base_url: non_empty(env::var("ASSISTANT_BACKEND_URL").ok())
                .map(|url| url.trim_end_matches('/').to_string()),

            search_endpoint: env::var("WEB_SEARCH_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_SEARCH_ENDPOINT.to_string()),
            reader_endpoint: env::var("PAGE_READER_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_READER_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),

            provider_timeout: Duration::from_secs(
                parse_secs(env::var("PROVIDER_TIMEOUT_SECS").ok()).unwrap_or(20),
            ),
            fetch_timeout: Duration::from_secs(
                parse_secs(env::var("FETCH_TIMEOUT_SECS").ok()).unwrap_or(12),
            ),
        }
    }

    /// Configuration with no upstreams at all. Every turn degrades to the
    /// canned reply; useful for tests and offline demos.
    pub fn offline() -> Self {
        Self {
            groq: ChatProviderConfig {
                api_key: None,
                model: DEFAULT_GROQ_MODEL.to_string(),
                api_base: DEFAULT_GROQ_API_BASE.to_string(),
            },
            openai: ChatProviderConfig {
                api_key: None,
                model: DEFAULT_OPENAI_MODEL.to_string(),
                api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            },
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            backend_base_url: None,
            search_endpoint: String::new(),
            reader_endpoint: String::new(),
            provider_timeout: Duration::from_secs(20),
            fetch_timeout: Duration::from_secs(12),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn parse_secs(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.trim().parse().ok())
}
