//! Model gateway: one chat-completions call in, raw text out.
//!
//! The engine only ever talks to `dyn ModelGateway`. The production
//! implementation is an OpenAI-compatible client pointed at OpenRouter.
//! Calls are instrumented and log model names, latencies and token usage (not contents).
//!
//! NOTE: We never log the API key. There is no retry and no client timeout here;
//! both belong to the caller.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::error::EngineError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
  System,
  User,
  Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
  pub role: Role,
  #[serde(rename = "content")]
  pub text: String,
}

impl ChatMessage {
  pub fn system(text: impl Into<String>) -> Self {
    Self { role: Role::System, text: text.into() }
  }

  pub fn user(text: impl Into<String>) -> Self {
    Self { role: Role::User, text: text.into() }
  }
}

/// Sampling options for a single call.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationOptions {
  pub model: String,
  /// Clamped into [0, 1] by `new`.
  pub temperature: f32,
  pub max_tokens: u32,
}

impl GenerationOptions {
  pub fn new(model: impl Into<String>, temperature: f32, max_tokens: u32) -> Self {
    Self { model: model.into(), temperature: temperature.clamp(0.0, 1.0), max_tokens }
  }
}

/// Anything that can turn a conversation into text.
#[async_trait]
pub trait ModelGateway: Send + Sync {
  async fn generate(&self, messages: &[ChatMessage], options: &GenerationOptions) -> Result<String, EngineError>;
}

/// Connection settings injected at construction; nothing is read from the environment here.
#[derive(Clone)]
pub struct GatewayConfig {
  pub api_key: Option<String>,
  pub base_url: String,
  /// Sent as `HTTP-Referer` (OpenRouter app attribution).
  pub referer: String,
  pub app_title: String,
}

impl std::fmt::Debug for GatewayConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("GatewayConfig")
      .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
      .field("base_url", &self.base_url)
      .field("referer", &self.referer)
      .field("app_title", &self.app_title)
      .finish()
  }
}

impl Default for GatewayConfig {
  fn default() -> Self {
    Self {
      api_key: None,
      base_url: "https://openrouter.ai/api/v1".into(),
      referer: "http://localhost:3000".into(),
      app_title: "OpenLesson".into(),
    }
  }
}

#[derive(Clone)]
pub struct OpenRouterGateway {
  client: reqwest::Client,
  config: GatewayConfig,
}

impl OpenRouterGateway {
  pub fn new(config: GatewayConfig) -> Self {
    Self { client: reqwest::Client::new(), config }
  }

  pub fn has_credential(&self) -> bool {
    self.config.api_key.is_some()
  }

  pub fn base_url(&self) -> &str {
    &self.config.base_url
  }
}

#[async_trait]
impl ModelGateway for OpenRouterGateway {
  #[instrument(level = "info", skip(self, messages), fields(model = %options.model, temperature = options.temperature, messages = messages.len()))]
  async fn generate(&self, messages: &[ChatMessage], options: &GenerationOptions) -> Result<String, EngineError> {
    let api_key = self
      .config
      .api_key
      .as_deref()
      .ok_or_else(|| EngineError::GatewayUnavailable("OPENROUTER_API_KEY is not set".into()))?;

    let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
    let req = ChatCompletionRequest {
      model: &options.model,
      messages,
      temperature: options.temperature,
      max_tokens: options.max_tokens,
    };

    let start = std::time::Instant::now();
    let res = self.client.post(&url)
      .header(USER_AGENT, "openlesson-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", api_key))
      .header("HTTP-Referer", &self.config.referer)
      .header("X-Title", &self.config.app_title)
      .json(&req).send().await
      .map_err(|e| {
        error!(elapsed = ?start.elapsed(), error = %e, "Model request failed to complete");
        EngineError::GatewayUnavailable(e.to_string())
      })?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let message = extract_upstream_error(&body).unwrap_or(body);
      error!(elapsed = ?start.elapsed(), %status, "Model request rejected upstream");
      return Err(EngineError::GatewayRejected { status: Some(status.as_u16()), message });
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| EngineError::GatewayUnavailable(format!("unreadable response body: {e}")))?;
    if let Some(err) = body.error {
      return Err(EngineError::GatewayRejected { status: None, message: err.message });
    }
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "Model usage");
    }
    let text = body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default();

    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Model response received");
    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
  model: &'a str,
  messages: &'a [ChatMessage],
  temperature: f32,
  max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
  #[serde(default)] error: Option<EObj>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}
#[derive(Deserialize)]
struct EObj { message: String }

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_upstream_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn temperature_is_clamped() {
    assert_eq!(GenerationOptions::new("m", 1.7, 10).temperature, 1.0);
    assert_eq!(GenerationOptions::new("m", -0.2, 10).temperature, 0.0);
  }

  #[test]
  fn messages_serialize_with_role_and_content() {
    let v = serde_json::to_value(ChatMessage::system("be strict")).unwrap();
    assert_eq!(v, serde_json::json!({"role": "system", "content": "be strict"}));
  }

  #[test]
  fn debug_output_redacts_the_key() {
    let cfg = GatewayConfig { api_key: Some("sk-or-secret".into()), ..GatewayConfig::default() };
    let shown = format!("{cfg:?}");
    assert!(!shown.contains("sk-or-secret"));
    assert!(shown.contains("<redacted>"));
  }

  #[test]
  fn upstream_error_message_is_extracted() {
    let body = r#"{"error":{"message":"Invalid model","code":400}}"#;
    assert_eq!(extract_upstream_error(body).as_deref(), Some("Invalid model"));
    assert_eq!(extract_upstream_error("<html>bad gateway</html>"), None);
  }

  #[tokio::test]
  async fn missing_credential_is_unavailable_without_network() {
    let gw = OpenRouterGateway::new(GatewayConfig::default());
    assert!(!gw.has_credential());
    let err = gw
      .generate(&[ChatMessage::user("hi")], &GenerationOptions::new("m", 0.5, 16))
      .await
      .unwrap_err();
    assert!(matches!(err, EngineError::GatewayUnavailable(_)));
  }
}
