use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::services::generator::GenerateError;

pub const FALLBACK_ERROR: &str = "Failed to generate script";

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[cfg(target_arch = "wasm32")]
pub trait LlmBounds {}
#[cfg(target_arch = "wasm32")]
impl<T> LlmBounds for T {}

#[cfg(not(target_arch = "wasm32"))]
pub trait LlmBounds: Send + Sync {}
#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync> LlmBounds for T {}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait LlmClient: LlmBounds + Debug {
    async fn chat(&self, system: &str, user: &str) -> Result<String>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String, // "anthropic" or "openai"
    pub anthropic: Option<AnthropicConfig>,
    pub openai: Option<OpenAIConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            anthropic: None,
            openai: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_anthropic_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_anthropic_model(),
            max_tokens: default_max_tokens(),
            base_url: default_anthropic_base_url(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_openai_model")]
    pub model: String,
    pub base_url: Option<String>,
}

fn default_provider() -> String {
    "anthropic".to_string()
}
fn default_anthropic_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}
fn default_max_tokens() -> u32 {
    4096
}
fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}
fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn non_blank(key: Option<String>) -> Option<String> {
    key.filter(|k| !k.trim().is_empty())
}

impl LlmConfig {
    /// Fills missing API keys from `CLAUDE_API_KEY` / `OPENAI_API_KEY`.
    pub fn fill_from_env(&mut self) {
        if let Some(key) = non_blank(std::env::var("CLAUDE_API_KEY").ok()) {
            let cfg = self.anthropic.get_or_insert_with(Default::default);
            if non_blank(cfg.api_key.clone()).is_none() {
                cfg.api_key = Some(key);
            }
        }
        if let Some(key) = non_blank(std::env::var("OPENAI_API_KEY").ok()) {
            if let Some(cfg) = self.openai.as_mut() {
                if non_blank(cfg.api_key.clone()).is_none() {
                    cfg.api_key = Some(key);
                }
            }
        }
    }
}

pub fn create_llm(config: &LlmConfig) -> Result<Box<dyn LlmClient>, GenerateError> {
    match config.provider.as_str() {
        "anthropic" => {
            let cfg = config.anthropic.clone().unwrap_or_default();
            let api_key = non_blank(cfg.api_key.clone()).ok_or(GenerateError::MissingCredential)?;
            Ok(Box::new(AnthropicClient::new(&api_key, &cfg)))
        }
        "openai" => {
            let cfg = config.openai.as_ref().ok_or(GenerateError::MissingCredential)?;
            let api_key = non_blank(cfg.api_key.clone()).ok_or(GenerateError::MissingCredential)?;
            Ok(Box::new(OpenAIClient::new(&api_key, &cfg.model, cfg.base_url.as_deref())))
        }
        other => Err(GenerateError::Configuration(format!(
            "Unknown LLM provider: {}",
            other
        ))),
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Pulls `error.message` out of an upstream error body.
pub fn upstream_message(body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|e| e.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_ERROR.to_string())
}

// --- Anthropic ---

#[derive(Debug)]
pub struct AnthropicClient {
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: &str, cfg: &AnthropicConfig) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: cfg.model.clone(),
            max_tokens: cfg.max_tokens,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

impl AnthropicResponse {
    fn into_text(self) -> Result<String> {
        let text: String = self
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect();
        if text.is_empty() {
            let reason = self.stop_reason.as_deref().unwrap_or("unknown");
            return Err(anyhow!("Anthropic response empty. Stop reason: {}", reason));
        }
        Ok(text)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl LlmClient for AnthropicClient {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/messages", self.base_url);

        let request_body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(system.to_string()).filter(|s| !s.is_empty()),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let mut request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION);
        if cfg!(target_arch = "wasm32") {
            request = request.header("anthropic-dangerous-direct-browser-access", "true");
        }

        log::debug!("Anthropic request: model={}", self.model);
        let resp = request.json(&request_body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            log::warn!("Anthropic API error {}: {}", status, error_text);
            return Err(anyhow!(upstream_message(&error_text)));
        }

        let response_text = resp.text().await?;
        let result: AnthropicResponse = serde_json::from_str(&response_text)
            .map_err(|e| anyhow!("Failed to parse Anthropic response: {}", e))?;
        result.into_text()
    }
}

// --- OpenAI ---

#[derive(Debug)]
pub struct OpenAIClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl LlmClient for OpenAIClient {
    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::new();
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user.to_string(),
        });

        let request_body = OpenAIRequest {
            model: self.model.clone(),
            messages,
        };

        let resp = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            return Err(anyhow!(upstream_message(&error_text)));
        }

        let result: OpenAIResponse = resp.json().await?;
        result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI response empty or missing content"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_response_parsing_success() {
        let json = r#"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [
                { "type": "text", "text": "TITLE: Jonah\n" },
                { "type": "text", "text": "JONAH: Not Nineveh!" }
            ],
            "stop_reason": "end_turn"
        }"#;

        let result: AnthropicResponse = serde_json::from_str(json).unwrap();
        assert_eq!(result.into_text().unwrap(), "TITLE: Jonah\nJONAH: Not Nineveh!");
    }

    #[test]
    fn test_anthropic_response_without_text() {
        let json = r#"{ "content": [], "stop_reason": "max_tokens" }"#;

        let result: AnthropicResponse = serde_json::from_str(json).unwrap();
        let err = result.into_text().unwrap_err();
        assert!(err.to_string().contains("max_tokens"));
    }

    #[test]
    fn test_upstream_message_extraction() {
        let body = r#"{"type":"error","error":{"type":"invalid_request_error","message":"max_tokens: too large"}}"#;
        assert_eq!(upstream_message(body), "max_tokens: too large");
        assert_eq!(upstream_message("<html>502</html>"), FALLBACK_ERROR);
        assert_eq!(upstream_message(r#"{"error":{}}"#), FALLBACK_ERROR);
        assert_eq!(upstream_message(""), FALLBACK_ERROR);
    }

    #[test]
    fn test_openai_response_parsing_success() {
        let json = r#"{
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "NARRATOR: Hello." },
                "finish_reason": "stop"
            }]
        }"#;

        let result: OpenAIResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            result.choices[0].message.content.as_deref(),
            Some("NARRATOR: Hello.")
        );
    }

    #[test]
    fn test_create_llm_requires_key() {
        let config = LlmConfig {
            provider: "anthropic".to_string(),
            anthropic: Some(AnthropicConfig {
                api_key: Some("  ".to_string()),
                ..Default::default()
            }),
            openai: None,
        };
        assert!(matches!(
            create_llm(&config),
            Err(GenerateError::MissingCredential)
        ));

        let config = LlmConfig {
            provider: "anthropic".to_string(),
            anthropic: Some(AnthropicConfig {
                api_key: Some("sk-ant-test".to_string()),
                ..Default::default()
            }),
            openai: None,
        };
        assert!(create_llm(&config).is_ok());
    }

    #[test]
    fn test_create_llm_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            create_llm(&config),
            Err(GenerateError::Configuration(_))
        ));
    }
}
