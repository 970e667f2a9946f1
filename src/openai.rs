//! Minimal OpenAI-compatible client for our use-cases.
//!
//! We only call chat.completions in forced-JSON mode. Replies must be a JSON
//! object with a `schema_version` field; malformed JSON is retried a bounded
//! number of times. Calls are instrumented and log model names, latencies and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::prompts::LlmPrompt;
use crate::util::{strip_code_fences, trunc_for_log};

const DEFAULT_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Error)]
pub enum LlmError {
  #[error("LLM is not configured (OPENAI_API_KEY unset)")]
  Disabled,
  #[error("LLM request failed: {0}")]
  Transport(#[from] reqwest::Error),
  #[error("LLM HTTP {status}: {message}")]
  Api { status: u16, message: String },
  #[error("LLM returned malformed JSON: {0}")]
  InvalidJson(String),
  #[error("LLM response is missing schema_version")]
  MissingSchemaVersion,
}

/// A validated model reply.
#[derive(Clone, Debug)]
pub struct LlmJson {
  pub schema_version: String,
  pub value: Value,
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub max_attempts: u32,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let timeout_secs = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|v| v.parse::<u64>().ok())
      .unwrap_or(60);
    let max_attempts = std::env::var("LLM_MAX_ATTEMPTS")
      .ok()
      .and_then(|v| v.parse::<u32>().ok())
      .unwrap_or(DEFAULT_MAX_ATTEMPTS);

    match Self::new(api_key, base_url, model, Duration::from_secs(timeout_secs), max_attempts) {
      Ok(oa) => Some(oa),
      Err(e) => {
        error!(target: "ielts_backend", error = %e, "Failed to build HTTP client for OpenAI");
        None
      }
    }
  }

  pub fn new(
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
    max_attempts: u32,
  ) -> Result<Self, LlmError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    Ok(Self { client, api_key, base_url, model, max_attempts: max_attempts.max(1) })
  }

  /// One chat completion in JSON mode; returns the raw message content.
  #[instrument(level = "debug", skip(self, prompt), fields(model = %self.model))]
  async fn chat_json_raw(&self, prompt: &LlmPrompt) -> Result<String, LlmError> {
    let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: prompt.system.clone() },
        ChatMessageReq { role: "user".into(), content: prompt.user.clone() },
      ],
      temperature: prompt.temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: Some(prompt.max_tokens),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "ielts-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 300));
      return Err(LlmError::Api { status, message });
    }

    let body: ChatCompletionResponse = res.json().await?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    Ok(body.choices.into_iter().next()
      .and_then(|c| c.message.content)
      .unwrap_or_default())
  }

  /// JSON completion with re-asks on malformed JSON and the `schema_version` check.
  #[instrument(
    level = "info",
    skip(self, prompt),
    fields(model = %self.model, user_len = prompt.user.len(), max_tokens = prompt.max_tokens)
  )]
  pub async fn complete_json(&self, prompt: &LlmPrompt) -> Result<LlmJson, LlmError> {
    let start = Instant::now();
    let mut attempt = 0;
    loop {
      attempt += 1;
      let text = self.chat_json_raw(prompt).await?;
      match parse_llm_json(&text) {
        Ok(value) => {
          let schema_version = require_schema_version(&value)?;
          info!(elapsed = ?start.elapsed(), attempt, response_len = text.len(), %schema_version, "Model JSON accepted");
          return Ok(LlmJson { schema_version, value });
        }
        Err(e) if attempt < self.max_attempts => {
          warn!(attempt, error = %e, preview = %trunc_for_log(&text, 120), "Malformed model JSON; retrying");
        }
        Err(e) => {
          error!(elapsed = ?start.elapsed(), attempt, error = %e, "Malformed model JSON; giving up");
          return Err(e);
        }
      }
    }
  }
}

/// Parse a model reply into a JSON object, tolerating a markdown code fence.
pub fn parse_llm_json(text: &str) -> Result<Value, LlmError> {
  let value: Value = serde_json::from_str(strip_code_fences(text))
    .map_err(|e| LlmError::InvalidJson(e.to_string()))?;
  if !value.is_object() {
    return Err(LlmError::InvalidJson("top-level value is not an object".into()));
  }
  Ok(value)
}

/// `schema_version` as a string; absent, null or empty is a contract violation.
pub fn require_schema_version(value: &Value) -> Result<String, LlmError> {
  match value.get("schema_version") {
    Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
    Some(Value::Number(n)) => Ok(n.to_string()),
    _ => Err(LlmError::MissingSchemaVersion),
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
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

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
