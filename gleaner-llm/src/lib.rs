//! Provider‑agnostic LLM integration for Gleaner.
//!
//! This crate exposes a common [`traits::LlmClient`] interface, concrete
//! clients for OpenAI‑compatible endpoints (OpenAI, DeepSeek) and Ollama,
//! and the [`strategy::LlmExtractionStrategy`] that turns page text into
//! structured JSON blocks.
//!
//! # Examples
//! ```no_run
//! use gleaner_common::Result;
//! use gleaner_llm::{connect_llm, provider::ProviderId};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<()> {
//! let provider: ProviderId = "deepseek/deepseek-chat".parse()?;
//! let client = connect_llm(&provider, "sk-...").await?;
//! assert_eq!(client.model_name(), "deepseek-chat");
//! # Ok(())
//! # }
//! ```
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod provider;
pub mod schema;
pub mod strategy;
pub mod traits;
pub mod usage;

use gleaner_common::{GleanerError, Result};
use provider::{Provider, ProviderId};
use std::sync::Arc;
use traits::LlmClient;

pub const DEFAULT_LLM_PROVIDER: &str = "openai/gpt-4o-mini";
pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1/";
pub const DEEPSEEK_API_BASE: &str = "https://api.deepseek.com/v1/";
pub const OLLAMA_API_BASE: &str = "http://localhost:11434";

/// Build a ready-to-use client for `provider`.
///
/// The key is forwarded as-is to hosted providers; Ollama ignores it.
pub async fn connect_llm(
    provider: &ProviderId,
    api_key: &str,
) -> Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match provider.provider {
        #[cfg(feature = "openai")]
        Provider::OpenAi => {
            let client = openai::OpenAiCompatClient::new(
                OPENAI_API_BASE,
                api_key.to_string(),
                provider.model.clone(),
            )?;
            Ok(Arc::new(client))
        }
        #[cfg(feature = "openai")]
        Provider::DeepSeek => {
            let client = openai::OpenAiCompatClient::new(
                DEEPSEEK_API_BASE,
                api_key.to_string(),
                provider.model.clone(),
            )?;
            Ok(Arc::new(client))
        }
        #[cfg(feature = "ollama")]
        Provider::Ollama => {
            let client =
                ollama::OllamaClient::new(OLLAMA_API_BASE.to_string(), provider.model.clone())
                    .await?;
            Ok(Arc::new(client))
        }
        #[allow(unreachable_patterns)]
        _ => Err(GleanerError::Config(format!(
            "LLM provider not enabled: {}",
            provider.provider
        ))),
    }
}
