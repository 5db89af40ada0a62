//! Chat assistant for questions about a single DTO.
//!
//! Each question is sent as an independent chat completion with the record
//! serialized into the prompt; no conversation history is sent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::CoreError;
use crate::catalog::CatalogRecord;
use crate::config::{
    AssistantConfig, ENV_ASSISTANT_API_VERSION, ENV_ASSISTANT_BASE, ENV_ASSISTANT_DEPLOYMENT,
    ENV_ASSISTANT_KEY,
};

const SYSTEM_PROMPT: &str = "You are a SMART AI DTO Analysis assistant. Answer user queries based on the DTO context provided.";

const NO_RESPONSE: &str = "No response from AI.";

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    messages: [Message<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

/// Client for a chat-completions deployment.
#[derive(Clone)]
pub struct AssistantClient {
    client: reqwest::Client,
    url: String,
    key: String,
}

impl AssistantClient {
    /// Build a client. Every setting must be non-empty.
    pub fn new(client: reqwest::Client, config: &AssistantConfig) -> Result<Self, CoreError> {
        let missing: Vec<&str> = [
            (ENV_ASSISTANT_BASE, &config.base),
            (ENV_ASSISTANT_KEY, &config.key),
            (ENV_ASSISTANT_DEPLOYMENT, &config.deployment),
            (ENV_ASSISTANT_API_VERSION, &config.api_version),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();
        if !missing.is_empty() {
            return Err(CoreError::Configuration(missing.join(", ")));
        }

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            config.base.trim_end_matches('/'),
            config.deployment,
            config.api_version
        );
        Ok(Self {
            client,
            url,
            key: config.key.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Ask `query` about `record`. Returns the raw completion text.
    pub async fn ask(&self, query: &str, record: &CatalogRecord) -> Result<String, CoreError> {
        let context = serde_json::to_string(record)
            .map_err(|e| CoreError::remote(None, format!("cannot encode DTO context: {e}")))?;
        let prompt = build_prompt(&context, query.trim());
        let body = CompletionRequest {
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: 512,
            temperature: 0.2,
            top_p: 0.95,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };

        log::debug!("asking assistant about {}", record.id);
        let resp = self
            .client
            .post(&self.url)
            .header("api-key", &self.key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoreError::remote(None, format!("assistant request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            log::warn!("assistant returned {status}: {detail}");
            return Err(CoreError::remote(
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or_default(),
            ));
        }

        let data: Value = resp.json().await?;
        Ok(completion_text(&data))
    }
}

fn build_prompt(context: &str, query: &str) -> String {
    format!(
        "You are an expert technical writer. Given the following extracted technical parameters and any relevant text, be technical and concise.\nDTO Context: {context}\nUser Query: {query}"
    )
}

fn completion_text(data: &Value) -> String {
    data.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_RESPONSE)
        .to_string()
}

static RULES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-{3,}\s*").unwrap());
static HEADINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"#+\s*").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

/// Strip markdown decoration from a completion for plain-text display.
pub fn clean_text(text: &str) -> String {
    let text = RULES.replace_all(text, "\n");
    let text = HEADINGS.replace_all(&text, "");
    let text = text.replace("**", "").replace('*', "").replace('|', " ");
    let text = BLANK_LINES.replace_all(&text, "\n");
    let text = SPACES.replace_all(&text, " ");
    text.trim().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
}

/// Conversation shown on the details screen.
#[derive(Debug, Default, Clone)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    pending: bool,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && !self.pending
    }

    /// Record a user question. Returns the trimmed query to send, or `None`
    /// for a blank query or while an answer is outstanding.
    pub fn submit(&mut self, input: &str) -> Option<String> {
        let query = input.trim();
        if query.is_empty() || self.pending {
            return None;
        }
        self.messages.push(ChatMessage {
            sender: Sender::User,
            text: input.to_string(),
        });
        self.pending = true;
        Some(query.to_string())
    }

    /// Record the outcome of the outstanding question.
    pub fn resolve(&mut self, result: Result<String, CoreError>) {
        let text = match result {
            Ok(answer) => clean_text(&answer),
            Err(err) => {
                log::error!("assistant request failed: {err}");
                format!("Error: {err}")
            }
        };
        self.messages.push(ChatMessage {
            sender: Sender::Assistant,
            text,
        });
        self.pending = false;
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AssistantConfig {
        AssistantConfig {
            base: "https://example.openai.azure.com/".into(),
            key: "k".into(),
            deployment: "gpt".into(),
            api_version: "2024-02-01".into(),
        }
    }

    #[test]
    fn builds_deployment_url() {
        let client = AssistantClient::new(reqwest::Client::new(), &config()).unwrap();
        assert_eq!(
            client.url(),
            "https://example.openai.azure.com/openai/deployments/gpt/chat/completions?api-version=2024-02-01"
        );
    }

    #[test]
    fn missing_settings_are_named() {
        let mut cfg = config();
        cfg.key = " ".into();
        cfg.api_version.clear();
        let err = AssistantClient::new(reqwest::Client::new(), &cfg)
            .err()
            .unwrap();
        assert_eq!(
            err.to_string(),
            "AZURE_OPENAI_KEY, AZURE_OPENAI_VERSION is not configured"
        );
    }

    #[test]
    fn prompt_embeds_context_and_query() {
        let prompt = build_prompt(r#"{"id":"a"}"#, "What is the rated current?");
        assert!(prompt.starts_with("You are an expert technical writer."));
        assert!(prompt.contains("\nDTO Context: {\"id\":\"a\"}\n"));
        assert!(prompt.ends_with("User Query: What is the rated current?"));
    }

    #[test]
    fn completion_text_falls_back() {
        let data = serde_json::json!({"choices": [{"message": {"content": "63 A"}}]});
        assert_eq!(completion_text(&data), "63 A");
        assert_eq!(completion_text(&serde_json::json!({"choices": []})), NO_RESPONSE);
        let empty = serde_json::json!({"choices": [{"message": {"content": ""}}]});
        assert_eq!(completion_text(&empty), NO_RESPONSE);
    }

    #[test]
    fn clean_text_strips_markdown() {
        let raw = "## Summary\n\n**Rated current:** 63 A\n---\n| Poles | 3 |\n\n\n* item";
        assert_eq!(clean_text(raw), "Summary\nRated current: 63 A Poles 3 item");
    }

    #[test]
    fn clean_text_keeps_single_newlines() {
        assert_eq!(clean_text("line one\nline two"), "line one\nline two");
        assert_eq!(clean_text("  padded  "), "padded");
    }

    #[test]
    fn transcript_ignores_blank_and_overlapping_queries() {
        let mut chat = ChatTranscript::new();
        assert!(chat.is_empty());
        assert_eq!(chat.submit("   "), None);
        assert_eq!(chat.submit(" rated current? ").as_deref(), Some("rated current?"));
        assert!(chat.is_pending());
        assert_eq!(chat.submit("again"), None);
        assert_eq!(chat.messages().len(), 1);
        assert_eq!(chat.messages()[0].sender, Sender::User);
    }

    #[test]
    fn transcript_records_answers_and_errors() {
        let mut chat = ChatTranscript::new();
        chat.submit("q1");
        chat.resolve(Ok("**63 A**".into()));
        assert!(!chat.is_pending());
        assert_eq!(chat.messages()[1].text, "63 A");

        chat.submit("q2");
        chat.resolve(Err(CoreError::remote(Some(401), "Unauthorized")));
        let last = chat.messages().last().unwrap();
        assert_eq!(last.sender, Sender::Assistant);
        assert_eq!(last.text, "Error: failed to fetch: HTTP 401 - Unauthorized");
    }
}
