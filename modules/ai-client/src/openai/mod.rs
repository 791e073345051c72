mod client;
pub(crate) mod types;

use async_trait::async_trait;

use crate::error::{AiError, Result};
use crate::traits::{ChatModel, Message};
use client::{OpenAiClient, OPENAI_API_URL};

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    base_url: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
            max_tokens: None,
            temperature: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| AiError::Config("OPENAI_API_KEY environment variable not set".into()))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Cap output tokens. Unset means the provider default.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Ignored for reasoning models, which only accept the default.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Replace the HTTP client, e.g. one built with a request timeout.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn build_request(&self, messages: Vec<Message>) -> types::ChatRequest {
        let mut request = types::ChatRequest::new(&self.model)
            .messages(messages.into_iter().map(types::WireMessage::from));

        if let Some(limit) = self.max_tokens {
            request = request.token_limit(limit);
        }
        if let Some(temperature) = self.temperature {
            if !types::uses_max_completion_tokens(&self.model) {
                request = request.temperature(temperature);
            }
        }
        request
    }
}

#[async_trait]
impl ChatModel for OpenAi {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: Vec<Message>) -> Result<String> {
        let request = self.build_request(messages);
        let client = OpenAiClient::new(&self.api_key, &self.http, &self.base_url);
        let response = client.chat(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AiError::EmptyCompletion(self.model.clone()))
    }
}
