use crate::traits::{LlmClient, LlmResponse};
use crate::usage::TokenUsage;
use async_trait::async_trait;
use gleaner_common::{GleanerError, Result};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

/// Ollama client for local model inference.
///
/// Expects a running Ollama server (see https://github.com/ollama/ollama).
pub struct OllamaClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

impl OllamaClient {
    /// Create a new client and verify server/model availability.
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GleanerError::Llm(format!("Failed to create HTTP client: {e}")))?;

        let ollama_client = Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        };

        let models = ollama_client.fetch_available_models().await?;
        if !models.iter().any(|m| m == &ollama_client.model) {
            tracing::info!(model = %ollama_client.model, "model not found locally, pulling");
            ollama_client.pull_model().await?;
        }

        Ok(ollama_client)
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|_| GleanerError::Llm(OLLAMA_CONNECTION_ERROR.to_string()))?;

        if !resp.status().is_success() {
            return Err(GleanerError::Llm(OLLAMA_CONNECTION_ERROR.to_string()));
        }

        let val: JsonValue = resp
            .json()
            .await
            .map_err(|e| GleanerError::Llm(format!("Failed to parse models response: {e}")))?;

        let models = val
            .get("models")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.get("name").and_then(|n| n.as_str()))
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default();

        Ok(models)
    }

    async fn pull_model(&self) -> Result<()> {
        let url = format!("{}/api/pull", self.base_url);
        let payload = json!({
            "model": self.model,
            "stream": false
        });

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GleanerError::Llm(format!("Failed to pull model: {e}")))?;

        if resp.status().is_success() {
            tracing::info!(model = %self.model, "pulled model");
            Ok(())
        } else {
            Err(GleanerError::Llm(format!(
                "Failed to pull model: HTTP {}",
                resp.status()
            )))
        }
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse> {
        let url = format!("{}/api/generate", self.base_url);

        let mut options = serde_json::Map::new();
        if let Some(temp) = temperature {
            options.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max_tok) = max_tokens {
            options.insert("num_predict".to_string(), json!(max_tok));
        }

        let mut payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": options
        });
        if let Some(sys) = system_prompt {
            payload["system"] = json!(sys);
        }

        let resp = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| GleanerError::Llm(format!("Generate request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(GleanerError::Llm(format!(
                "Generate failed: HTTP {}",
                resp.status()
            )));
        }

        let reply: GenerateReply = resp
            .json()
            .await
            .map_err(|e| GleanerError::Llm(format!("Failed to parse response: {e}")))?;

        let usage = match (reply.prompt_eval_count, reply.eval_count) {
            (None, None) => None,
            (prompt, completion) => Some(TokenUsage::new(
                prompt.unwrap_or(0),
                completion.unwrap_or(0),
            )),
        };

        Ok(LlmResponse {
            text: reply.response,
            model: Some(self.model.clone()),
            usage,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(self.fetch_available_models().await.is_ok())
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
