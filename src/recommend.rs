// SPDX-License-Identifier: PMPL-1.0-or-later
//! LLM-backed remediation advice for individual issues.
//!
//! A [`CompletionClient`] turns a prompt into markdown; the markdown is
//! parsed loosely into a summary, ordered steps and code examples.

use crate::config::RecommendationConfig;
use crate::error::{Error, Result};
use crate::issue::AccessibilityIssue;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::{debug, warn};

const SYSTEM_PROMPT: &str = "You are a web accessibility expert. Give concise, practical WCAG remediation advice with code examples.";

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?P<lang>[\w+-]*)[ \t]*\n(?P<code>.*?)```").expect("valid regex"));

static LIST_ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:\d+[.)]|[-*+])\s+(?P<text>.+)$").expect("valid regex"));

/// Produces a completion for a prompt
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat completions client
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &RecommendationConfig, api_key: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
        })
    }

    /// Read the API key from the configured environment variable
    pub fn from_env(config: &RecommendationConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(format!("{} is not set", config.api_key_env))
        })?;
        Self::new(config, api_key)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Completion(format!("HTTP {}: {}", status, body)));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| Error::Completion("response has no message content".into()))
    }
}

/// A fenced code block from the advice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeExample {
    pub language: Option<String>,
    pub code: String,
}

/// Structured advice for one issue
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub issue_id: String,
    pub summary: String,
    pub steps: Vec<String>,
    pub code_examples: Vec<CodeExample>,
}

/// Prompt describing an issue and the expected answer shape
pub fn build_prompt(issue: &AccessibilityIssue) -> String {
    let mut prompt = format!(
        "Accessibility issue \"{}\" ({} impact)\nWCAG criteria: {}\nProblem: {}\n",
        issue.id,
        issue.impact,
        if issue.wcag_criteria.is_empty() {
            "unspecified".to_string()
        } else {
            issue.wcag_criteria.join(", ")
        },
        issue.description
    );

    if !issue.nodes.is_empty() {
        prompt.push_str("Affected elements:\n");
        for node in issue.nodes.iter().take(3) {
            prompt.push_str(&format!("- {}\n", node));
        }
    }

    prompt.push_str(
        "\nStart with a one-paragraph summary, then a numbered list of fix steps, then code examples in fenced blocks.",
    );
    prompt
}

/// Parse loosely structured markdown advice
pub fn parse_recommendation(issue_id: &str, markdown: &str) -> Recommendation {
    let code_examples = CODE_FENCE
        .captures_iter(markdown)
        .map(|c| CodeExample {
            language: Some(c["lang"].to_string()).filter(|l| !l.is_empty()),
            code: c["code"].trim_end().to_string(),
        })
        .collect();

    let prose = CODE_FENCE.replace_all(markdown, "\n");

    let mut summary_lines = Vec::new();
    let mut steps = Vec::new();
    let mut summary_done = false;

    for line in prose.lines() {
        let trimmed = line.trim();
        if let Some(item) = LIST_ITEM.captures(line) {
            steps.push(item["text"].trim().to_string());
            summary_done |= !summary_lines.is_empty();
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            summary_done |= !summary_lines.is_empty();
            continue;
        }
        if !summary_done {
            summary_lines.push(trimmed);
        }
    }

    Recommendation {
        issue_id: issue_id.to_string(),
        summary: summary_lines.join(" "),
        steps,
        code_examples,
    }
}

/// Advice for the most severe issues, at most `max_issues`. Failed
/// completions are logged and skipped.
pub async fn recommend(
    client: &dyn CompletionClient,
    issues: &[AccessibilityIssue],
    max_issues: usize,
) -> Vec<Recommendation> {
    let mut ranked: Vec<&AccessibilityIssue> = issues.iter().collect();
    ranked.sort_by(|a, b| b.impact.cmp(&a.impact));

    let mut recommendations = Vec::new();
    for issue in ranked.into_iter().take(max_issues) {
        match client.complete(&build_prompt(issue)).await {
            Ok(markdown) => {
                debug!("Got recommendation for {}", issue.id);
                recommendations.push(parse_recommendation(&issue.id, &markdown));
            }
            Err(e) => warn!("No recommendation for {}: {}", issue.id, e),
        }
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Impact;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADVICE: &str = "## Summary\nThe image has no text alternative.\nScreen readers announce the file name.\n\n1. Add an alt attribute.\n2. Describe the image's purpose.\n- Use alt=\"\" for decorative images\n\n```html\n<img src=\"cat.jpg\" alt=\"A cat\">\n```\n";

    fn issue() -> AccessibilityIssue {
        AccessibilityIssue::new("image-alt", Impact::Critical, "Images must have alternative text")
            .with_wcag(&["1.1.1"])
            .with_node("<img src=\"cat.jpg\">")
    }

    fn config(server: &MockServer) -> RecommendationConfig {
        RecommendationConfig {
            endpoint: format!("{}/v1/", server.uri()),
            ..RecommendationConfig::default()
        }
    }

    #[test]
    fn test_build_prompt() {
        let prompt = build_prompt(&issue());
        assert!(prompt.contains("\"image-alt\" (critical impact)"));
        assert!(prompt.contains("WCAG criteria: 1.1.1"));
        assert!(prompt.contains("- <img src=\"cat.jpg\">"));
    }

    #[test]
    fn test_parse_recommendation() {
        let rec = parse_recommendation("image-alt", ADVICE);
        assert_eq!(
            rec.summary,
            "The image has no text alternative. Screen readers announce the file name."
        );
        assert_eq!(rec.steps.len(), 3);
        assert_eq!(rec.steps[0], "Add an alt attribute.");
        assert_eq!(rec.code_examples.len(), 1);
        assert_eq!(rec.code_examples[0].language.as_deref(), Some("html"));
        assert_eq!(rec.code_examples[0].code, "<img src=\"cat.jpg\" alt=\"A cat\">");
    }

    #[test]
    fn test_parse_unstructured_text() {
        let rec = parse_recommendation("x", "Just add a label.");
        assert_eq!(rec.summary, "Just add a label.");
        assert!(rec.steps.is_empty());
        assert!(rec.code_examples.is_empty());
    }

    #[tokio::test]
    async fn test_openai_client() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": ADVICE}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server), "test-key").unwrap();
        let recs = recommend(&client, &[issue()], 5).await;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].issue_id, "image-alt");
    }

    #[tokio::test]
    async fn test_missing_content_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server), "k").unwrap();
        assert!(matches!(client.complete("hi").await, Err(Error::Completion(_))));
    }

    #[tokio::test]
    async fn test_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(&config(&server), "k").unwrap();
        let err = client.complete("hi").await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }
}
