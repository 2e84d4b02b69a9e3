//! Web-context fetcher
//!
//! Two independent, advisory enrichment decisions per turn: fetching page
//! text for URLs the user pasted, and a keyword-gated web search. Network
//! failures here always degrade to "no fragment" and never surface to the
//! user.

use crate::config::Config;
use crate::models::{SearchResult, WebFragment};
use crate::snapshot::truncate_chars;
use futures::future::join_all;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

/// Character budget for fetched page text.
const PAGE_TEXT_BUDGET: usize = 8_000;
/// At most this many pasted URLs are fetched per turn.
const MAX_URL_FETCHES: usize = 2;
/// At most this many search results are folded into the summary.
const MAX_SEARCH_RESULTS: usize = 2;

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r"(?i)https?://[^\s)]+").unwrap();
}

/// Terms suggesting the utterance wants current external information.
const SEARCH_INDICATORS: &[&str] = &[
    "what is",
    "how to",
    "latest",
    "current",
    "recent",
    "news",
    "trends",
    "statistics",
    "data",
    "market",
    "price",
    "rate",
    "forecast",
    "predict",
    "compare",
    "difference between",
    "best",
    "top",
    "guide",
    "tutorial",
];

/// Literal URLs in the utterance, de-duplicated, order preserved.
pub fn extract_urls(input: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    URL_RE
        .find_iter(input)
        .map(|m| m.as_str().to_string())
        .filter(|url| seen.insert(url.clone()))
        .collect()
}

/// Keyword gate for the optional search step. The exact term list is a
/// heuristic, not a contract; only the gate-then-enrich shape is.
pub fn should_search(query: &str) -> bool {
    let lower = query.to_lowercase();
    SEARCH_INDICATORS
        .iter()
        .any(|indicator| lower.contains(indicator))
}

pub struct WebContextFetcher {
    client: Client,
    search_endpoint: String,
    reader_endpoint: String,
}

impl WebContextFetcher {
    pub fn new(config: &Config) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .timeout(config.fetch_timeout)
            .build()
            .unwrap_or_default();

        Self {
            client,
            search_endpoint: config.search_endpoint.clone(),
            reader_endpoint: config.reader_endpoint.clone(),
        }
    }

    /// Build the turn's web fragments: up to two pasted URLs fetched
    /// concurrently, plus one search summary when the heuristic fires.
    /// Everything fails soft.
    pub async fn gather(&self, utterance: &str) -> Vec<WebFragment> {
        let mut fragments = Vec::new();

        let urls = extract_urls(utterance);
        if !urls.is_empty() {
            let fetches = urls
                .iter()
                .take(MAX_URL_FETCHES)
                .map(|url| self.fetch_page_text(url));
            for (url, text) in urls.iter().zip(join_all(fetches).await) {
                if let Some(text) = text {
                    fragments.push(WebFragment {
                        source: url.clone(),
                        text,
                    });
                }
            }
        }

        if should_search(utterance) {
            if let Some(summary) = self.search_summary(utterance).await {
                fragments.push(WebFragment {
                    source: format!("search: {}", utterance.trim()),
                    text: summary,
                });
            }
        }

        fragments
    }

    /// Fetch rendered page text through the text-extraction reader proxy,
    /// truncated to the fixed character budget. `None` on any failure or
    /// when no reader endpoint is configured.
    pub async fn fetch_page_text(&self, raw_url: &str) -> Option<String> {
        if self.reader_endpoint.trim().is_empty() {
            return None;
        }
        let mut url = raw_url.trim().to_string();
        if !url.to_lowercase().starts_with("http://") && !url.to_lowercase().starts_with("https://")
        {
            url = format!("https://{}", url);
        }
        let reader_url = format!("{}/{}", self.reader_endpoint, url);

        let response = match self
            .client
            .get(&reader_url)
            .header("Accept", "text/plain, text/markdown, */*")
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(error) => {
                debug!(%raw_url, %error, "page fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(%raw_url, status = %response.status(), "page fetch returned non-success");
            return None;
        }

        let text = response.text().await.ok()?;
        if text.trim().is_empty() {
            return None;
        }
        Some(truncate_chars(&text, PAGE_TEXT_BUDGET))
    }

    /// Lightweight instant-answer search. Empty on any failure or when no
    /// search endpoint is configured.
    pub async fn search(&self, query: &str) -> Vec<SearchResult> {
        if self.search_endpoint.trim().is_empty() {
            return Vec::new();
        }
        let response = match self
            .client
            .get(format!("{}/", self.search_endpoint.trim_end_matches('/')))
            .query(&[("q", query), ("format", "json"), ("no_redirect", "1")])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(error) => {
                debug!(%query, %error, "web search failed");
                return Vec::new();
            }
        };
        if !response.status().is_success() {
            return Vec::new();
        }

        match response.json::<Value>().await {
            Ok(payload) => parse_instant_answer(&payload),
            Err(error) => {
                debug!(%query, %error, "web search returned invalid JSON");
                Vec::new()
            }
        }
    }

    /// Summarize up to two search results into one prompt fragment.
    pub async fn search_summary(&self, query: &str) -> Option<String> {
        let results = self.search(query).await;
        summarize_results(&results)
    }
}

/// Parse the instant-answer shape: an abstract plus related topics.
fn parse_instant_answer(payload: &Value) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if let Some(abstract_text) = payload.get("AbstractText").and_then(Value::as_str) {
        if !abstract_text.is_empty() {
            results.push(SearchResult {
                title: payload
                    .get("AbstractTitle")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .unwrap_or("Search Summary")
                    .to_string(),
                url: payload
                    .get("AbstractURL")
                    .and_then(Value::as_str)
                    .filter(|u| !u.is_empty())
                    .unwrap_or("https://duckduckgo.com")
                    .to_string(),
                snippet: abstract_text.to_string(),
            });
        }
    }

    if let Some(topics) = payload.get("RelatedTopics").and_then(Value::as_array) {
        for topic in topics.iter().take(3) {
            let (Some(text), Some(url)) = (
                topic.get("Text").and_then(Value::as_str),
                topic.get("FirstURL").and_then(Value::as_str),
            ) else {
                continue;
            };
            results.push(SearchResult {
                title: text
                    .split_whitespace()
                    .next()
                    .unwrap_or("Related")
                    .to_string(),
                url: url.to_string(),
                snippet: text.to_string(),
            });
        }
    }

    results
}

fn summarize_results(results: &[SearchResult]) -> Option<String> {
    if results.is_empty() {
        return None;
    }

    let mut summary = String::from("### Relevant Web Information\n");
    for result in results.iter().take(MAX_SEARCH_RESULTS) {
        summary.push_str(&format!("\n**{}** ({})\n", result.title, result.url));
        summary.push_str(&format!("{}\n", result.snippet));
    }
    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_urls_dedup_preserves_order() {
        let input = "see https://a.example/x and https://b.example then https://a.example/x again";
        let urls = extract_urls(input);
        assert_eq!(urls, vec!["https://a.example/x", "https://b.example"]);
    }

    #[test]
    fn test_extract_urls_none() {
        assert!(extract_urls("no links here").is_empty());
    }

    #[test]
    fn test_should_search_positive() {
        assert!(should_search("What is the latest inflation rate?"));
        assert!(should_search("compare my pricing to the market"));
    }

    #[test]
    fn test_should_search_negative() {
        assert!(!should_search("thanks, that helps"));
        assert!(!should_search("open the budget planner"));
    }

    #[test]
    fn test_parse_instant_answer() {
        let payload = json!({
            "AbstractText": "Inflation is a general increase in prices.",
            "AbstractTitle": "Inflation",
            "AbstractURL": "https://en.example.org/inflation",
            "RelatedTopics": [
                { "Text": "Deflation is the opposite of inflation.", "FirstURL": "https://en.example.org/deflation" },
                { "NoText": true },
            ]
        });

        let results = parse_instant_answer(&payload);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Inflation");
        assert_eq!(results[1].url, "https://en.example.org/deflation");
    }

    #[test]
    fn test_parse_instant_answer_empty_payload() {
        assert!(parse_instant_answer(&json!({})).is_empty());
    }

    #[test]
    fn test_summarize_results_caps_at_two() {
        let results: Vec<SearchResult> = (0..4)
            .map(|i| SearchResult {
                title: format!("Result {}", i),
                url: format!("https://example.org/{}", i),
                snippet: "snippet".to_string(),
            })
            .collect();

        let summary = summarize_results(&results).unwrap();
        assert!(summary.contains("Result 0"));
        assert!(summary.contains("Result 1"));
        assert!(!summary.contains("Result 2"));
    }

    #[test]
    fn test_summarize_results_empty_is_none() {
        assert!(summarize_results(&[]).is_none());
    }
}
