use gleaner_common::GleanerError;
use std::fmt;
use std::str::FromStr;

/// Hosting backend named by the first segment of a provider id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    OpenAi,
    DeepSeek,
    Ollama,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Provider::OpenAi => "openai",
            Provider::DeepSeek => "deepseek",
            Provider::Ollama => "ollama",
        };
        f.write_str(name)
    }
}

/// A `provider/model` identifier such as `openai/gpt-4o-mini`.
///
/// ```
/// use gleaner_llm::provider::{Provider, ProviderId};
///
/// let id: ProviderId = "ollama/llama3.2:3b".parse().unwrap();
/// assert_eq!(id.provider, Provider::Ollama);
/// assert_eq!(id.model, "llama3.2:3b");
/// assert_eq!(id.to_string(), "ollama/llama3.2:3b");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderId {
    pub provider: Provider,
    pub model: String,
}

impl FromStr for ProviderId {
    type Err = GleanerError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (provider, model) = raw.trim().split_once('/').ok_or_else(|| {
            GleanerError::Config(format!(
                "provider id must look like `provider/model`, got `{raw}`"
            ))
        })?;

        let provider = match provider.to_ascii_lowercase().as_str() {
            "openai" => Provider::OpenAi,
            "deepseek" => Provider::DeepSeek,
            "ollama" => Provider::Ollama,
            other => {
                return Err(GleanerError::Config(format!(
                    "unsupported LLM provider `{other}`"
                )))
            }
        };

        if model.is_empty() {
            return Err(GleanerError::Config(format!(
                "provider id `{raw}` is missing a model name"
            )));
        }

        Ok(Self {
            provider,
            model: model.to_string(),
        })
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_provider() {
        let id: ProviderId = crate::DEFAULT_LLM_PROVIDER.parse().unwrap();
        assert_eq!(id.provider, Provider::OpenAi);
        assert_eq!(id.model, "gpt-4o-mini");
    }

    #[test]
    fn provider_segment_is_case_insensitive() {
        let id: ProviderId = "DeepSeek/deepseek-chat".parse().unwrap();
        assert_eq!(id.provider, Provider::DeepSeek);
    }

    #[test]
    fn model_may_contain_slashes() {
        let id: ProviderId = "ollama/library/qwen2".parse().unwrap();
        assert_eq!(id.model, "library/qwen2");
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!("gpt-4o-mini".parse::<ProviderId>().is_err());
        assert!("openai/".parse::<ProviderId>().is_err());
        assert!(matches!(
            "anthropic/claude".parse::<ProviderId>(),
            Err(GleanerError::Config(msg)) if msg.contains("anthropic")
        ));
    }
}
