use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use crate::config::AzureOpenAiConfig;
use crate::metrics::track_upstream_call;
use crate::models::DegradedKind;
use crate::utils::retry::{retry_async_when, RetryConfig};

const SERVICE_LABEL: &str = "azure_openai";

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// Network, auth, timeout or non-2xx failure talking to the model
    #[error("Chat completion service unavailable: {message}")]
    Unavailable { message: String, transient: bool },

    /// The model answered, but not in the shape we asked for
    #[error("Chat completion response malformed: {0}")]
    Malformed(String),
}

impl UpstreamError {
    pub fn degraded_kind(&self) -> DegradedKind {
        match self {
            UpstreamError::Unavailable { .. } => DegradedKind::UpstreamUnavailable,
            UpstreamError::Malformed(_) => DegradedKind::UpstreamMalformed,
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, UpstreamError::Unavailable { transient: true, .. })
    }

    fn unavailable(message: impl Into<String>, transient: bool) -> Self {
        UpstreamError::Unavailable {
            message: message.into(),
            transient,
        }
    }
}

/// A single system+user prompt exchange.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Returns the raw text of the first choice.
    async fn complete(&self, request: &ChatRequest) -> Result<String, UpstreamError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct AzureOpenAiClient {
    http: Client,
    config: AzureOpenAiConfig,
}

impl AzureOpenAiClient {
    pub fn new(config: AzureOpenAiConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn completions_url(&self) -> Result<Url, UpstreamError> {
        let mut base = self.config.endpoint.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let mut url = Url::parse(&base)
            .and_then(|base| {
                base.join(&format!(
                    "openai/deployments/{}/chat/completions",
                    self.config.deployment
                ))
            })
            .map_err(|e| UpstreamError::unavailable(format!("Invalid endpoint: {}", e), false))?;

        url.query_pairs_mut()
            .append_pair("api-version", &self.config.api_version);
        Ok(url)
    }

    async fn complete_once(&self, request: &ChatRequest) -> Result<String, UpstreamError> {
        let url = self.completions_url()?;

        let body = CompletionBody {
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: request.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .http
            .post(url)
            .header("api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                UpstreamError::unavailable(
                    format!("Failed to call Azure OpenAI: {}", e),
                    e.is_timeout() || e.is_connect(),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UpstreamError::unavailable(
                format!("Azure OpenAI returned error {}: {}", status, error_text),
                is_transient_status(status),
            ));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(format!("Invalid completion payload: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| UpstreamError::Malformed("Completion had no content".to_string()))
    }
}

#[async_trait]
impl ChatCompletion for AzureOpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, UpstreamError> {
        if !self.config.is_configured() {
            return Err(UpstreamError::unavailable(
                "Azure OpenAI credentials are not configured",
                false,
            ));
        }

        retry_async_when(
            RetryConfig::upstream(self.config.max_attempts),
            UpstreamError::is_transient,
            || track_upstream_call(SERVICE_LABEL, self.complete_once(request)),
        )
        .await
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

lazy_static! {
    static ref FENCED_JSON: Regex = Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").unwrap();
}

/// Parses a model reply into `T`, tolerating Markdown code fences and chatter
/// around the JSON object.
pub fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> Result<T, UpstreamError> {
    let candidate = if let Some(captures) = FENCED_JSON.captures(reply) {
        captures.get(1).map(|m| m.as_str()).unwrap_or(reply)
    } else {
        match (reply.find('{'), reply.rfind('}')) {
            (Some(start), Some(end)) if start < end => &reply[start..=end],
            _ => reply,
        }
    };

    serde_json::from_str(candidate)
        .map_err(|e| UpstreamError::Malformed(format!("Reply is not the expected JSON: {}", e)))
}
