use crate::traits::{LlmClient, LlmResponse};
use crate::usage::TokenUsage;
use async_trait::async_trait;
use gleaner_common::{GleanerError, Result};
use gleaner_http::{HttpClient, HttpError};
use serde::{Deserialize, Serialize};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a precise information extraction assistant.";

/// Client for OpenAI-style `chat/completions` endpoints.
///
/// Works against OpenAI itself and compatible hosts such as DeepSeek; only
/// the base URL differs.
pub struct OpenAiCompatClient {
    client: HttpClient,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

impl OpenAiCompatClient {
    /// Create a client for `model` hosted at `base_url` (which should end in `/`).
    pub fn new(base_url: &str, api_key: String, model: String) -> Result<Self> {
        let client = HttpClient::new(base_url)
            .map_err(|e| GleanerError::Llm(format!("HttpClient init failed: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let req = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens,
            temperature,
        };

        let resp: ChatCompletionResponse = self
            .client
            .post_json("chat/completions", Some(&self.api_key), &req)
            .await
            .map_err(http_to_gleaner)?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| GleanerError::Llm("completion returned no choices".to_string()))?;

        if choice.finish_reason.as_deref() == Some("length") {
            tracing::warn!(model = %self.model, "completion truncated at max_tokens");
        }

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            model: resp.model.or_else(|| Some(self.model.clone())),
            usage: resp
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        match self
            .generate("Respond with just 'OK'", None, Some(5), Some(0.0))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("chat completion health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

fn http_to_gleaner(e: HttpError) -> GleanerError {
    GleanerError::Llm(format!("{e}"))
}
