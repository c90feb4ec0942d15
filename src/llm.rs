//! Text-generation provider seam
//!
//! The orchestrator talks to a `TextProvider`. `ClaudeClient` is the
//! production implementation over the Anthropic messages API; tests script
//! their own providers.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::Config;

const API_VERSION: &str = "2023-06-01";

/// ---------------------------------------------------------------------------
/// Error Types
/// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
  #[error("provider unavailable: API key not configured")]
  Unavailable,

  #[error("Request failed: {0}")]
  Request(String),

  #[error("API error: {0}")]
  Api(String),

  #[error("Parse error: {0}")]
  Parse(String),
}

/// ---------------------------------------------------------------------------
/// Provider Trait
/// ---------------------------------------------------------------------------

/// One text-generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
  pub system_instruction: String,
  pub user_prompt: String,
  pub temperature: f32,
  pub max_output_tokens: u32,
}

#[async_trait]
pub trait TextProvider: Send + Sync {
  fn name(&self) -> &str;

  /// False when the provider cannot be called at all (e.g. no credentials).
  fn is_available(&self) -> bool;

  async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

/// ---------------------------------------------------------------------------
/// Claude API Types
/// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
  model: &'a str,
  max_tokens: u32,
  temperature: f32,
  system: &'a str,
  messages: Vec<ClaudeMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
  role: &'a str,
  content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
  content: Vec<ContentBlock>,
  usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
  #[serde(rename = "type")]
  content_type: String,
  text: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Usage {
  pub input_tokens: u32,
  pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorResponse {
  error: ClaudeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
  message: String,
}

/// ---------------------------------------------------------------------------
/// Claude Client
/// ---------------------------------------------------------------------------

pub struct ClaudeClient {
  client: Client,
  api_key: Option<String>,
  api_url: Url,
  model: String,
}

impl ClaudeClient {
  pub fn new(api_key: Option<String>, api_url: Url, model: impl Into<String>) -> Self {
    Self {
      client: Client::new(),
      api_key,
      api_url,
      model: model.into(),
    }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(config.api_key.clone(), config.api_url.clone(), config.model.clone())
  }

  /// Call Claude with a system prompt and user message
  pub async fn complete(
    &self,
    system_prompt: &str,
    user_message: &str,
    temperature: f32,
    max_tokens: u32,
  ) -> Result<(String, Usage), LlmError> {
    let api_key = self.api_key.as_deref().ok_or(LlmError::Unavailable)?;

    let request = ClaudeRequest {
      model: &self.model,
      max_tokens,
      temperature,
      system: system_prompt,
      messages: vec![ClaudeMessage {
        role: "user",
        content: user_message,
      }],
    };

    let response = self
      .client
      .post(self.api_url.clone())
      .header("x-api-key", api_key)
      .header("anthropic-version", API_VERSION)
      .header("content-type", "application/json")
      .json(&request)
      .send()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    let status = response.status();
    let body = response
      .text()
      .await
      .map_err(|e| LlmError::Request(e.to_string()))?;

    if !status.is_success() {
      if let Ok(error_resp) = serde_json::from_str::<ClaudeErrorResponse>(&body) {
        return Err(LlmError::Api(error_resp.error.message));
      }
      return Err(LlmError::Api(format!("HTTP {}: {}", status, body)));
    }

    let claude_response: ClaudeResponse =
      serde_json::from_str(&body).map_err(|e| LlmError::Parse(e.to_string()))?;

    let text = claude_response
      .content
      .iter()
      .find(|c| c.content_type == "text")
      .and_then(|c| c.text.clone())
      .ok_or_else(|| LlmError::Parse("No text content in response".to_string()))?;

    Ok((text, claude_response.usage))
  }
}

#[async_trait]
impl TextProvider for ClaudeClient {
  fn name(&self) -> &str {
    &self.model
  }

  fn is_available(&self) -> bool {
    self.api_key.is_some()
  }

  async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
    let (text, usage) = self
      .complete(
        &request.system_instruction,
        &request.user_prompt,
        request.temperature,
        request.max_output_tokens,
      )
      .await?;

    tracing::debug!(
      model = %self.model,
      input_tokens = usage.input_tokens,
      output_tokens = usage.output_tokens,
      "Generation complete"
    );

    Ok(text)
  }
}

/// Extract a JSON object from generated text (handles markdown code blocks)
pub fn extract_json(text: &str) -> Result<String, LlmError> {
  let trimmed = text.trim();
  if trimmed.starts_with('{') {
    return Ok(trimmed.to_string());
  }

  if let Some(start) = text.find("```json") {
    let start = start + 7;
    if let Some(end) = text[start..].find("```") {
      return Ok(text[start..start + end].trim().to_string());
    }
  }

  if let Some(start) = text.find("```") {
    let start = start + 3;
    // Skip a language tag on the fence line
    let content_start = text[start..].find('\n').map(|i| start + i + 1).unwrap_or(start);
    if let Some(end) = text[content_start..].find("```") {
      return Ok(text[content_start..content_start + end].trim().to_string());
    }
  }

  if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
    if start < end {
      return Ok(text[start..=end].to_string());
    }
  }

  Err(LlmError::Parse("Could not extract JSON from response".to_string()))
}

/// ---------------------------------------------------------------------------
/// Tests
/// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_request() -> GenerationRequest {
    GenerationRequest {
      system_instruction: "Return JSON.".to_string(),
      user_prompt: "Narrate ENDURANCE/FLUSH.".to_string(),
      temperature: 0.4,
      max_output_tokens: 256,
    }
  }

  fn client_for(server: &mockito::ServerGuard, api_key: Option<&str>) -> ClaudeClient {
    let url = Url::parse(&format!("{}/v1/messages", server.url())).unwrap();
    ClaudeClient::new(api_key.map(str::to_string), url, "claude-test")
  }

  #[test]
  fn test_extract_json_direct() {
    let input = r#"{"sessionFocus": "Walk", "avoidCue": "No impact"}"#;
    let result = extract_json(input).unwrap();
    assert!(result.contains("sessionFocus"));
  }

  #[test]
  fn test_extract_json_code_block() {
    let input = r#"Here's the narration:

```json
{"sessionFocus": "Steady ride"}
```

Hope that helps!"#;
    let result = extract_json(input).unwrap();
    assert_eq!(result, r#"{"sessionFocus": "Steady ride"}"#);
  }

  #[test]
  fn test_extract_json_embedded_braces() {
    let input = r#"The narration is {"headline": "Welcome"} as shown."#;
    let result = extract_json(input).unwrap();
    assert_eq!(result, r#"{"headline": "Welcome"}"#);
  }

  #[test]
  fn test_extract_json_rejects_plain_text() {
    assert!(matches!(extract_json("no json here"), Err(LlmError::Parse(_))));
  }

  #[tokio::test]
  async fn test_generate_returns_first_text_block() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("POST", "/v1/messages")
      .match_header("x-api-key", "sk-test")
      .match_header("anthropic-version", API_VERSION)
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(
        r#"{"content":[{"type":"text","text":"{\"sessionFocus\":\"Walk\"}"}],
           "model":"claude-test","stop_reason":"end_turn",
           "usage":{"input_tokens":12,"output_tokens":8}}"#,
      )
      .create_async()
      .await;

    let client = client_for(&server, Some("sk-test"));
    let text = client.generate(&sample_request()).await.unwrap();

    assert_eq!(text, r#"{"sessionFocus":"Walk"}"#);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_api_error_message_is_surfaced() {
    let mut server = mockito::Server::new_async().await;
    server
      .mock("POST", "/v1/messages")
      .with_status(529)
      .with_body(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
      .create_async()
      .await;

    let client = client_for(&server, Some("sk-test"));
    let err = client.generate(&sample_request()).await.unwrap_err();

    assert_eq!(err, LlmError::Api("Overloaded".to_string()));
  }

  #[tokio::test]
  async fn test_missing_key_is_unavailable_without_a_request() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/v1/messages").expect(0).create_async().await;

    let client = client_for(&server, None);
    assert!(!client.is_available());
    assert_eq!(client.generate(&sample_request()).await, Err(LlmError::Unavailable));
    mock.assert_async().await;
  }
}
