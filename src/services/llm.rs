//! Text-generation collaborator for tutor replies
//!
//! The tutor hands over a system instruction plus the learner's raw utterance
//! and gets back reply text and the measured latency. Failures come back as an
//! explicit [`CollaboratorFailure`] so the caller decides on a fallback.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error};

/// Configuration for the text generator
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// OpenAI API key
    pub api_key: String,

    /// Model to use (default: gpt-4o-mini)
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    pub base_url: String,

    /// Max tokens for responses
    pub max_tokens: u32,

    /// Bound on a single request, connect through body
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: 150,
            timeout: Duration::from_secs(10),
        }
    }
}

/// What the tutor asks the collaborator for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub system_instructions: String,
    pub user_text: String,
}

/// Successful generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedReply {
    pub text: String,
    pub latency_ms: u64,
}

/// Why the collaborator produced no reply
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorFailure {
    /// No API key configured; no request was attempted
    #[error("text generator not configured")]
    NotConfigured,

    /// The request exceeded its time bound
    #[error("text generator timed out after {0:?}")]
    Timeout(Duration),

    /// Transport, status or payload failure
    #[error("text generator unavailable: {0}")]
    Unavailable(String),
}

/// Anything that can turn instructions plus an utterance into reply text
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GeneratedReply, CollaboratorFailure>;
}

/// Chat completions request format
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Chat completions response format
#[derive(Debug, Deserialize)]
struct ChatResponse {
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

/// Text generator backed by an OpenAI-compatible chat API
pub struct OpenAiGenerator {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiGenerator {
    /// Create a generator with custom config
    ///
    /// An empty API key is accepted; every call then reports
    /// [`CollaboratorFailure::NotConfigured`] without touching the network.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    /// Create with default config
    pub fn with_default() -> Result<Self> {
        Self::new(LlmConfig::default())
    }

    pub fn is_configured(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    fn classify(&self, err: reqwest::Error) -> CollaboratorFailure {
        if err.is_timeout() {
            CollaboratorFailure::Timeout(self.config.timeout)
        } else {
            CollaboratorFailure::Unavailable(err.to_string())
        }
    }

    /// Make an API call to the chat completions endpoint
    async fn call_api(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, CollaboratorFailure> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: request.system_instructions.clone(),
                },
                Message {
                    role: "user".to_string(),
                    content: request.user_text.clone(),
                },
            ],
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CollaboratorFailure::Unavailable(format!(
                "API request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CollaboratorFailure::Timeout(self.config.timeout)
            } else {
                CollaboratorFailure::Unavailable(format!("Failed to parse response: {}", e))
            }
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| CollaboratorFailure::Unavailable("Empty response from API".to_string()))
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GeneratedReply, CollaboratorFailure> {
        if !self.is_configured() {
            return Err(CollaboratorFailure::NotConfigured);
        }

        debug!("Calling chat completions ({})", self.config.model);
        let started = Instant::now();
        match self.call_api(&request).await {
            Ok(text) => {
                let latency_ms = started.elapsed().as_millis() as u64;
                debug!("Generated reply in {}ms", latency_ms);
                Ok(GeneratedReply { text, latency_ms })
            }
            Err(failure) => {
                error!("Text generation error: {}", failure);
                Err(failure)
            }
        }
    }
}
