//! Minimal GigaChat client for the generation calls.
//!
//! We only call chat/completions with a single user message and read back
//! plain text. Calls are instrumented and log model name and response sizes
//! (not contents).
//!
//! NOTE: We never log the credential and we keep payload truncations short.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, info};

use crate::config::GigachatSettings;

/// One failed chat call. The retry loop classifies failures from the
/// rendered text, so `Status` puts the numeric code and any Retry-After
/// header into its message.
#[derive(Debug, Error)]
pub enum ChatError {
  #[error("GigaChat HTTP {status}: {detail}")]
  Status { status: u16, detail: String },
  #[error("GigaChat transport error: {0}")]
  Transport(String),
}

/// Long-lived client handle. Built once at startup and shared via state;
/// holds the reqwest connection pool.
#[derive(Clone)]
pub struct GigaChat {
  pub client: reqwest::Client,
  pub credential: String,
  pub base_url: String,
  pub model: String,
}

impl GigaChat {
  pub fn new(settings: &GigachatSettings, credential: String) -> Result<Self, ChatError> {
    let client = reqwest::Client::builder()
      .timeout(settings.timeout())
      // the production endpoint's CA is absent from common trust stores
      .danger_accept_invalid_certs(settings.insecure_tls)
      .build()
      .map_err(|e| ChatError::Transport(e.to_string()))?;

    Ok(Self {
      client,
      credential,
      base_url: settings.base_url.clone(),
      model: settings.model.clone(),
    })
  }

  /// Plain-text chat completion with a single user message.
  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  pub async fn chat(&self, prompt: &str) -> Result<String, ChatError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![ChatMessageReq { role: "user".into(), content: prompt.into() }],
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "kurso-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.credential))
      .json(&req).send().await
      .map_err(|e| ChatError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let retry_after = res.headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
      let body = res.text().await.unwrap_or_default();
      let mut detail = extract_service_error(&body).unwrap_or(body);
      if let Some(ra) = retry_after {
        if detail.is_empty() {
          detail = format!("Retry-After: {}", ra);
        } else {
          detail = format!("{}; Retry-After: {}", detail, ra);
        }
      }
      return Err(ChatError::Status { status: status.as_u16(), detail });
    }

    let body: ChatCompletionResponse =
      res.json().await.map_err(|e| ChatError::Transport(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "GigaChat usage");
    }
    let text = body.choices.get(0)
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

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

/// Try to extract a clean error message from a service error body.
/// GigaChat answers both `{"error":{"message":...}}` and flat `{"message":...}`.
fn extract_service_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  #[derive(Deserialize)]
  struct EFlat { message: String }
  if let Ok(w) = serde_json::from_str::<EWrap>(body) {
    return Some(w.error.message);
  }
  serde_json::from_str::<EFlat>(body).ok().map(|f| f.message)
}
