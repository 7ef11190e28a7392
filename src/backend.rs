//! Client for the question answering service.
//!
//! The service exposes a single `POST` endpoint that takes
//! `{"question": ..., "use_llm": ...}` and answers with
//! `{"answer": ..., "source": ..., "confidence": ...}`. Requests carry the
//! pre-shared key in the `X-API-KEY` header.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BackendConfig;

#[derive(Debug, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
    pub use_llm: bool,
}

/// Body returned by the answering service.
///
/// Only `answer` reaches the conversation. `source` and `confidence` are
/// kept for logging.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AskResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl AskResponse {
    /// The answer text, if the service sent a non-empty one.
    pub fn answer_text(&self) -> Option<&str> {
        self.answer.as_deref().filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Broad class of an ask failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request could not be sent or the response could not be received.
    Transport,
    /// A response arrived but was unusable.
    Protocol,
}

#[derive(Debug, Error)]
pub enum AskError {
    #[error("could not reach backend: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend returned {status}{}", fmt_detail(.detail))]
    Status {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("backend response was not valid JSON: {0}")]
    Protocol(#[from] serde_json::Error),
}

impl AskError {
    pub fn kind(&self) -> FailureKind {
        match self {
            AskError::Transport(_) => FailureKind::Transport,
            AskError::Status { .. } | AskError::Protocol(_) => FailureKind::Protocol,
        }
    }
}

/// Anything that can answer a question.
///
/// [`BackendClient`] is the HTTP implementation; tests substitute their own.
#[async_trait]
pub trait Answerer: Send + Sync {
    async fn ask(&self, question: &str) -> Result<AskResponse, AskError>;
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    use_llm: bool,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> reqwest::Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint_url.clone(),
            api_key: config.api_key.clone(),
            use_llm: config.use_llm,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Probe the service root, which reports `{"status": "running"}` when up.
    ///
    /// Returns the reported status string.
    pub async fn health(&self) -> Result<String, AskError> {
        let url = self.endpoint.join("/").unwrap_or_else(|_| self.endpoint.clone());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(AskError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(AskError::Transport)?;

        if !status.is_success() {
            return Err(AskError::Status {
                status,
                detail: error_detail(&body),
            });
        }

        let health: HealthResponse = serde_json::from_str(&body)?;
        Ok(health.status)
    }
}

#[async_trait]
impl Answerer for BackendClient {
    async fn ask(&self, question: &str) -> Result<AskResponse, AskError> {
        let request = AskRequest {
            question,
            use_llm: self.use_llm,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("X-API-KEY", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(AskError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(AskError::Transport)?;

        if !status.is_success() {
            return Err(AskError::Status {
                status,
                detail: error_detail(&body),
            });
        }

        let answer: AskResponse = serde_json::from_str(&body)?;
        tracing::debug!(
            source = ?answer.source,
            confidence = ?answer.confidence,
            has_answer = answer.answer_text().is_some(),
            "backend answered"
        );
        Ok(answer)
    }
}

fn fmt_detail(detail: &Option<String>) -> String {
    detail.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
}

/// Pull the `detail` message out of a FastAPI-style error body.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
