//! Chat-completions client for item valuation.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use torivahti_core::{ItemRecord, OpenAiSettings, ValuationResult, ValuationStatus};

use crate::error::ValuerError;
use crate::parse::parse_prices;
use crate::prompt::PromptBuilder;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f64 = 0.7;

/// Client for an OpenAI-compatible chat-completions endpoint.
///
/// Valuation is best-effort: a failed request settles the item with an
/// error-status result instead of propagating, so one bad response cannot
/// abort a valuation cycle.
pub struct Valuer {
    client: reqwest::Client,
}

impl Valuer {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self, ValuerError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    /// Values one item. Returns `None` when valuation is disabled or no
    /// API key is configured; otherwise always returns a settled result,
    /// with error status when the API call or response parsing failed.
    pub async fn valuate(
        &self,
        item: &ItemRecord,
        openai: &OpenAiSettings,
        prompt: &dyn PromptBuilder,
    ) -> Option<ValuationResult> {
        if !openai.is_enabled() {
            return None;
        }

        let result = match self.request_valuation(item, openai, prompt).await {
            Ok(text) => {
                let (price_new, price_current) = parse_prices(&text);
                ValuationResult {
                    status: ValuationStatus::Completed,
                    text: Some(text),
                    price_new,
                    price_current,
                    model: Some(openai.model.clone()),
                    timestamp: Utc::now(),
                    message: None,
                }
            }
            Err(e) => {
                tracing::warn!(item_id = %item.id, error = %e, "valuation request failed");
                ValuationResult::error(e.to_string())
            }
        };
        Some(result)
    }

    async fn request_valuation(
        &self,
        item: &ItemRecord,
        openai: &OpenAiSettings,
        prompt: &dyn PromptBuilder,
    ) -> Result<String, ValuerError> {
        let (system, user) = prompt.build_prompt(item);
        let request = ChatRequest {
            model: &openai.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };

        let url = format!("{}/chat/completions", openai.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&openai.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ValuerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: ChatResponse = serde_json::from_slice(&response.bytes().await?)?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ValuerError::EmptyResponse)?;
        Ok(content)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
