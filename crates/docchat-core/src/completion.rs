use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ApiKey;
use crate::error::ServiceError;
use crate::state::ChatMessage;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// A hosted chat-completion API.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Text of the first completion choice.
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String, ServiceError>;
}

#[derive(Serialize)]
struct GroqMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct GroqRequest<'a> {
    model: &'a str,
    messages: Vec<GroqMessage<'a>>,
}

#[derive(Deserialize)]
struct GroqChoice {
    message: GroqResponseMessage,
}

#[derive(Deserialize)]
struct GroqResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct GroqResponse {
    #[serde(default)]
    choices: Vec<GroqChoice>,
}

/// Groq's OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct GroqClient {
    client: Client,
    api_key: ApiKey,
    base_url: String,
}

impl GroqClient {
    pub fn new(api_key: ApiKey) -> Self {
        Self::with_base_url(api_key, GROQ_API_URL)
    }

    pub fn with_base_url(api_key: ApiKey, base_url: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CompletionService for GroqClient {
    async fn complete(&self, messages: &[ChatMessage], model: &str) -> Result<String, ServiceError> {
        let request = GroqRequest {
            model,
            messages: messages
                .iter()
                .map(|m| GroqMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
        };

        let prompt_chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
        debug!(model, messages = messages.len(), prompt_chars, "requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "completion request failed");
            return Err(ServiceError::Status {
                service: "groq",
                status,
                body,
            });
        }

        let groq_response: GroqResponse = response.json().await?;
        groq_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or(ServiceError::EmptyCompletion)
    }
}
