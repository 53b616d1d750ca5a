//! OpenAI adapter (text completion).
//!
//! Implements the `crb-core` completion port over the legacy
//! `/v1/completions` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crb_core::{
    errors::Error,
    model::{CompletionClient, CompletionError, MAX_OUTPUT_TOKENS},
    Result,
};

#[derive(Clone, Debug)]
pub struct OpenAiClient {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("reqwest client build: {e}")))?;
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(
        &self,
        prompt: &str,
        temperature: f64,
    ) -> std::result::Result<String, CompletionError> {
        let body = CompletionBody {
            model: &self.model,
            prompt,
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature,
        };

        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(self.timeout)
                } else {
                    CompletionError::Backend(format!("openai request error: {e}"))
                }
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(self.timeout)
            } else {
                CompletionError::Backend(format!("openai body error: {e}"))
            }
        })?;

        if !status.is_success() {
            return Err(classify_error(status.as_u16(), &text));
        }

        parse_completion(&text)
    }
}

/// Extract `choices[0].text` from a successful response body.
fn parse_completion(body: &str) -> std::result::Result<String, CompletionError> {
    let v: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| CompletionError::Backend(format!("openai json error: {e}")))?;

    let Some(choice) = v.get("choices").and_then(|c| c.get(0)) else {
        return Err(CompletionError::Backend(
            "openai response has no choices".to_string(),
        ));
    };

    Ok(choice
        .get("text")
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .to_string())
}

/// Map an error response to a completion error.
///
/// The backend reports context-window overflow as an `invalid_request_error`;
/// every such rejection is treated as "prompt too long".
fn classify_error(status: u16, body: &str) -> CompletionError {
    let v: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let err = v.as_ref().and_then(|v| v.get("error"));
    let kind = err
        .and_then(|e| e.get("type"))
        .and_then(|t| t.as_str())
        .unwrap_or("");
    let code = err
        .and_then(|e| e.get("code"))
        .and_then(|t| t.as_str())
        .unwrap_or("");
    let message = err
        .and_then(|e| e.get("message"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.chars().take(200).collect());

    if kind == "invalid_request_error" || code == "context_length_exceeded" {
        tracing::debug!(status, code, "completion rejected as invalid request");
        return CompletionError::TooLong(message);
    }

    CompletionError::Backend(format!("openai completion failed: {status} {message}"))
}
