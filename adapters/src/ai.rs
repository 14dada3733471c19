//! Model API clients: Anthropic-style messages for summarization/synthesis,
//! OpenAI-style chat completions for URL classification.

use async_trait::async_trait;
use dn_core::traits::{ChatModel, UrlClassifier};
use errors::{DigestError, DigestResult};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> DigestResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(DigestError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ChatModel for AnthropicClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> DigestResult<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "model completion request");
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": max_tokens,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DigestError::ModelApi {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<MessagesResponse>().await?;
        let text = body
            .content
            .iter()
            .find(|block| block.block_type == "text" && !block.text.is_empty())
            .map(|block| block.text.trim().to_string())
            .ok_or(DigestError::EmptyModelResponse)?;
        Ok(text)
    }
}

const CLASSIFIER_INSTRUCTION: &str = "You will be given an array of URLs. Your job is to \
    return the urls that represent valuable content, not the ones that are generic (like \
    google.com, yahoo.com, nytimes.com, cnn.com, etc.), redirects, generic, shortened, and \
    otherwise not useful. Return urls in this JSON format: {\"usefulUrls\": string[]}";

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> DigestResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(DigestError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsefulUrls {
    #[serde(rename = "usefulUrls")]
    useful_urls: Vec<String>,
}

#[async_trait]
impl UrlClassifier for OpenAiClient {
    async fn useful_urls(&self, urls: &[String]) -> DigestResult<Vec<String>> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": CLASSIFIER_INSTRUCTION },
                    {
                        "role": "user",
                        "content": format!(
                            "URLs: {}\nUseful URLs:",
                            serde_json::to_string(urls)?
                        ),
                    },
                ],
                "response_format": { "type": "json_object" },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DigestError::ModelApi {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<ChatCompletionResponse>().await?;
        let content = body
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .ok_or(DigestError::EmptyModelResponse)?;

        // No fallback here: a malformed classification is a hard failure
        // for the run.
        let parsed: UsefulUrls = serde_json::from_str(content).map_err(|e| {
            DigestError::ClassificationParseError {
                reason: e.to_string(),
            }
        })?;
        Ok(parsed.useful_urls)
    }
}

/// Best-effort JSON recovery: take the outermost `{ .. }` span of a model
/// response and try to parse that. Models occasionally wrap their JSON in
/// prose or code fences.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
