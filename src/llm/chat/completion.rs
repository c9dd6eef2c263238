use async_trait::async_trait;
use log::{ debug, info, warn };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE } };
use serde::{ Deserialize, Serialize };
use serde_json::Value;
use std::sync::Arc;

use super::ChatClient;
use crate::error::{ CompletionError, GENERIC_UPSTREAM_MESSAGE };
use crate::llm::CompletionConfig;
use crate::llm::rate_limit::RateLimiter;
use crate::models::chat::{ Message, Role };

/// Upstream view of a transcript entry: role and content only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    temperature: f32,
    max_tokens: u32,
}

pub struct CompletionClient {
    http: HttpClient,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    limiter: Arc<RateLimiter>,
}

impl CompletionClient {
    pub fn new(
        endpoint: String,
        model: String,
        temperature: f32,
        max_tokens: u32,
        limiter: Arc<RateLimiter>
    ) -> Result<Self, CompletionError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http,
            endpoint,
            model,
            temperature,
            max_tokens,
            limiter,
        })
    }

    pub fn from_config(
        config: &CompletionConfig,
        limiter: Arc<RateLimiter>
    ) -> Result<Self, CompletionError> {
        info!(
            "Completion client configured: Model={}, Endpoint={}, Quota={}/{}s",
            config.model,
            config.endpoint,
            limiter.max_requests(),
            limiter.window().as_secs()
        );
        Self::new(
            config.endpoint.clone(),
            config.model.clone(),
            config.temperature,
            config.max_tokens,
            limiter
        )
    }
}

#[async_trait]
impl ChatClient for CompletionClient {
    async fn send(
        &self,
        transcript: &[Message],
        credential: &str
    ) -> Result<String, CompletionError> {
        if credential.trim().is_empty() {
            return Err(CompletionError::CredentialMissing);
        }
        if transcript.is_empty() {
            return Err(CompletionError::EmptyTranscript);
        }
        self.limiter.try_acquire()?;

        let req = ChatCompletionRequest {
            model: &self.model,
            messages: project_transcript(transcript),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        debug!("Sending {} messages to {}", req.messages.len(), self.endpoint);

        let resp = self.http
            .post(&self.endpoint)
            .bearer_auth(credential)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            let message = upstream_error_message(&body);
            warn!("Completion request failed with status {}: {}", status, message);
            return Err(CompletionError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = serde_json
            ::from_str(&body)
            .map_err(|e| CompletionError::Transport(format!("Invalid completion payload: {}", e)))?;
        Ok(first_choice_content(&payload))
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }

    fn get_base_url(&self) -> Option<String> {
        Some(self.endpoint.clone())
    }
}

/// Drops ids and timestamps, keeps order, role and content untouched.
pub fn project_transcript(transcript: &[Message]) -> Vec<WireMessage> {
    transcript
        .iter()
        .map(|msg| WireMessage {
            role: msg.role,
            content: msg.content.clone(),
        })
        .collect()
}

/// `choices[0].message.content`, or an empty string when the payload has
/// some other shape.
pub fn first_choice_content(payload: &Value) -> String {
    payload
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Best-effort `error.message` from a failed response body.
pub fn upstream_error_message(body: &str) -> String {
    serde_json
        ::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_UPSTREAM_MESSAGE.to_string())
}
