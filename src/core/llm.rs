use crate::config::LLMConfig;
use crate::core::message::{Message, Role};
use crate::core::oracle::CompletionOracle;
use crate::error::OracleError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Chat-completions message as sent over the wire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::Human => "user",
            Role::Ai => "assistant",
            Role::System => "system",
        };
        Self {
            role: role.to_string(),
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

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
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client
pub struct LLMClient {
    client: Client,
    api_key: String,
    config: LLMConfig,
}

impl LLMClient {
    pub fn new(api_key: String, config: LLMConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("[LLMClient] Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            api_key,
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    pub async fn chat(&self, messages: Vec<ChatMessage>) -> Result<String, OracleError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
        };

        let max_retries = self.config.max_retries.max(1);
        let base_delay_ms = self.config.retry_base_delay_ms;

        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                let delay = backoff_delay_ms(base_delay_ms, attempt);
                tracing::warn!(
                    "[LLMClient] Retrying API call (attempt {}/{}) after {}ms delay",
                    attempt + 1,
                    max_retries,
                    delay
                );
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let response = match self
                .client
                .post(self.endpoint())
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::warn!("[LLMClient] HTTP request failed: {}", e);
                    last_error = Some(OracleError::Request(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let error_text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Unknown error".to_string());
                tracing::warn!(
                    "[LLMClient] API returned error status {}: {}",
                    status,
                    error_text
                );
                last_error = Some(OracleError::Status {
                    status: status.as_u16(),
                    body: error_text,
                });
                // Client errors other than rate limiting will not improve on retry
                if status.is_client_error() && status.as_u16() != 429 {
                    break;
                }
                continue;
            }

            let chat_response = match response.json::<ChatResponse>().await {
                Ok(cr) => cr,
                Err(e) => {
                    tracing::warn!("[LLMClient] Failed to decode response body: {}", e);
                    last_error = Some(OracleError::Decode(e.to_string()));
                    continue;
                }
            };

            return chat_response
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content.unwrap_or_default())
                .ok_or(OracleError::EmptyResponse);
        }

        Err(last_error.unwrap_or(OracleError::RetriesExhausted))
    }
}

#[async_trait]
impl CompletionOracle for LLMClient {
    async fn generate(&self, messages: &[Message]) -> Result<Message, OracleError> {
        let wire = messages.iter().map(ChatMessage::from).collect();
        let content = self.chat(wire).await?;
        Ok(Message::ai(content))
    }
}

/// Longest pause between retries
const MAX_RETRY_DELAY_MS: u64 = 60_000;

/// Exponential backoff for the given retry attempt (1-based), capped
fn backoff_delay_ms(base_delay_ms: u64, attempt: u32) -> u64 {
    base_delay_ms
        .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)))
        .min(MAX_RETRY_DELAY_MS)
}
