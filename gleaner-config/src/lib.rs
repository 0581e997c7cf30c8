//! Settings loader for a Gleaner run.
//!
//! Precedence, lowest to highest: built-in defaults, an optional
//! YAML/TOML/JSON file, then process environment variables. String values
//! may reference other environment variables as `${VAR}`.
//!
//! Recognised environment variables: `DEEPSEEK_API_KEY` (required),
//! `LLM_PROVIDER`, `INSTRUCTION_TO_LLM`, `MAX_TOKENS`, `TEMPERATURE`,
//! `OUTPUT_PATH`, `WEBDRIVER_URL`, `HEADLESS`.
use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

pub const API_KEY_VAR: &str = "DEEPSEEK_API_KEY";
pub const DEFAULT_CONFIG_FILE: &str = "gleaner.yaml";
pub const DEFAULT_LLM_PROVIDER: &str = "openai/gpt-4o-mini";
pub const DEFAULT_INSTRUCTION_TO_LLM: &str = "Navigate through this page to extract information about the specific service and map the service name to that information in JSON. Format results in JSON and include the name of the service, information about the service, and price. If there is no price, set it to null.";
pub const DEFAULT_MAX_TOKENS: u32 = 3000;
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_OUTPUT_PATH: &str = "extracted_aeterna_data.json";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_URLS: [&str; 3] = [
    "https://www.aeterna-aesthetics.com/services/facials",
    "https://www.aeterna-aesthetics.com/services/injections",
    "https://www.aeterna-aesthetics.com/services/contouring",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    MissingSecret(&'static str),
    #[error(transparent)]
    Source(#[from] config::ConfigError),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Everything a run needs, resolved once at startup.
#[derive(Clone)]
pub struct ExtractionSettings {
    pub deepseek_api_key: String,
    pub llm_provider: String,
    pub instruction_to_llm: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub urls: Vec<String>,
    pub output_path: PathBuf,
    pub webdriver_url: String,
    pub headless: bool,
}

impl fmt::Debug for ExtractionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionSettings")
            .field("deepseek_api_key", &"<redacted>")
            .field("llm_provider", &self.llm_provider)
            .field("instruction_to_llm", &self.instruction_to_llm)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("urls", &self.urls)
            .field("output_path", &self.output_path)
            .field("webdriver_url", &self.webdriver_url)
            .field("headless", &self.headless)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    llm_provider: String,
    instruction_to_llm: String,
    max_tokens: u32,
    temperature: f32,
    urls: Vec<String>,
    output_path: String,
    webdriver_url: String,
    headless: bool,
}

fn expand_env(raw: &str) -> String {
    let mut cur = raw.to_string();
    if !cur.contains('$') {
        return cur;
    }
    for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
        let expanded = match shellexpand::env(&cur) {
            Ok(cow) => cow.into_owned(),
            Err(_) => cur.clone(),
        };
        if expanded == cur {
            break;
        }
        cur = expanded;
    }
    cur
}

/// The API key is taken verbatim from the environment. Only a key written in
/// a settings file goes through `${VAR}` expansion.
fn api_key(cfg: &Config) -> Result<String, ConfigError> {
    let key = match std::env::var(API_KEY_VAR) {
        Ok(from_env) => from_env.trim().to_string(),
        Err(_) => cfg
            .get_string("deepseek_api_key")
            .map(|from_file| expand_env(from_file.trim()))
            .unwrap_or_default(),
    };
    if key.trim().is_empty() {
        return Err(ConfigError::MissingSecret(API_KEY_VAR));
    }
    Ok(key)
}

impl RawSettings {
    fn resolve(self, deepseek_api_key: String) -> Result<ExtractionSettings, ConfigError> {
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("MAX_TOKENS must be positive".into()));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "TEMPERATURE must be a non-negative number, got {}",
                self.temperature
            )));
        }

        Ok(ExtractionSettings {
            deepseek_api_key,
            llm_provider: expand_env(self.llm_provider.trim()),
            instruction_to_llm: expand_env(&self.instruction_to_llm),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            urls: self.urls.iter().map(|u| expand_env(u.trim())).collect(),
            output_path: PathBuf::from(expand_env(&self.output_path)),
            webdriver_url: expand_env(&self.webdriver_url),
            headless: self.headless,
        })
    }
}

/// Builder hides the `config` crate wiring (defaults + file + env).
pub struct SettingsLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach an optional settings file; the `config` crate infers the format
    /// by suffix. A missing file is skipped.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use gleaner_config::SettingsLoader;
    ///
    /// let settings = SettingsLoader::new()
    ///     .with_yaml_str("deepseek_api_key: sk-inline\nurls: []\n")
    ///     .load()
    ///     .expect("valid settings");
    ///
    /// assert!(settings.urls.is_empty());
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Resolve defaults, files, and the environment into [`ExtractionSettings`].
    ///
    /// Fails with [`ConfigError::MissingSecret`] when no API key is available.
    pub fn load(self) -> Result<ExtractionSettings, ConfigError> {
        let cfg = self
            .builder
            .set_default("llm_provider", DEFAULT_LLM_PROVIDER)?
            .set_default("instruction_to_llm", DEFAULT_INSTRUCTION_TO_LLM)?
            .set_default("max_tokens", i64::from(DEFAULT_MAX_TOKENS))?
            .set_default("temperature", f64::from(DEFAULT_TEMPERATURE))?
            .set_default(
                "urls",
                DEFAULT_URLS.iter().map(|u| u.to_string()).collect::<Vec<_>>(),
            )?
            .set_default("output_path", DEFAULT_OUTPUT_PATH)?
            .set_default("webdriver_url", DEFAULT_WEBDRIVER_URL)?
            .set_default("headless", true)?
            .add_source(Environment::default())
            .build()?;

        // The secret is checked before anything else can fail.
        let key = api_key(&cfg)?;
        let raw: RawSettings = cfg.try_deserialize()?;
        let settings = raw.resolve(key)?;

        tracing::debug!(
            target: "config",
            provider = %settings.llm_provider,
            max_tokens = settings.max_tokens,
            temperature = settings.temperature,
            urls = settings.urls.len(),
            "settings loaded"
        );
        Ok(settings)
    }
}
