// OpenAI chat-completions client

use crate::config::OpenAIConfig;
use crate::traits::{ChatClient, ChatOptions, ChatRequest, ChatResponse, TokenUsage};
use crate::types::Message;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{Map, Value};

/// OpenAI client (HTTP direct, no SDK)
pub struct OpenAIClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAIClient {
    /// Create new client with API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(OpenAIConfig::new(api_key))
    }

    pub fn from_config(config: OpenAIConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", config.api_key))
                .context("Invalid API key format")?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            base_url: config.base_url().to_string(),
        })
    }

    /// Build chat completion request payload
    fn build_chat_request(&self, model: &str, messages: Vec<Message>, options: &ChatOptions) -> Value {
        let openai_messages: Vec<Value> = messages
            .into_iter()
            .map(|msg| self.convert_message(msg))
            .collect();

        let mut obj = Map::new();
        obj.insert("model".to_string(), Value::from(model));
        obj.insert("messages".to_string(), Value::Array(openai_messages));

        // o1 and gpt-5 models use different parameter names
        let is_reasoning_model = model.starts_with("o1") || model.starts_with("gpt-5");

        if let Some(temp) = options.temperature {
            // o1 and gpt-5 models don't support temperature
            if !is_reasoning_model {
                obj.insert("temperature".to_string(), serde_json::json!(temp));
            }
        }
        if let Some(max_tokens) = options.max_tokens {
            let token_field = if is_reasoning_model {
                "max_completion_tokens"
            } else {
                "max_tokens"
            };
            obj.insert(token_field.to_string(), serde_json::json!(max_tokens));
        }

        Value::Object(obj)
    }

    /// Convert our Message type to OpenAI format
    fn convert_message(&self, message: Message) -> Value {
        serde_json::json!({
            "role": message.role(),
            "content": message.text(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAIClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let payload = self.build_chat_request(&request.model, request.messages, &request.options);

        tracing::debug!(model = %request.model, "Sending chat completion request");

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&payload)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI API error ({}): {}", status, error_text);
        }

        let body: OpenAIChatResponse = response
            .json()
            .await
            .context("Failed to parse response")?;

        // Convert to provider-agnostic response
        let choice = body.choices.first();
        Ok(ChatResponse {
            content: choice.and_then(|c| c.message.as_ref()).and_then(|m| m.content.clone()),
            usage: body.usage.as_ref().map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.and_then(|c| c.finish_reason.clone()),
        })
    }
}

// ============================================================================
// OPENAI-SPECIFIC RESPONSE TYPES (for Chat Completions)
// ============================================================================

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
