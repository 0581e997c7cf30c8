use anyhow::{Context, Result};
use gleaner_common::observability::{LogConfig, init_logging};
use gleaner_config::{ExtractionSettings, SettingsLoader};
use gleaner_crawl::{RunConfig, WebCrawler, crawl_urls, create_run_config, save_extracted_data};
use gleaner_drivers::gleaner_browser::{BrowserConfig, BrowserSession};
use gleaner_llm::connect_llm;
use gleaner_llm::provider::ProviderId;
use gleaner_llm::schema::Product;
use gleaner_llm::strategy::{
    DEFAULT_CHUNK_TOKEN_THRESHOLD, ExtraArgs, ExtractionType, LlmExtractionStrategy, StrategyConfig,
};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Load settings, then start logging.
///
/// A missing API key fails here before the log directory or any other file
/// is created.
pub fn startup(loader: SettingsLoader, log: LogConfig) -> Result<ExtractionSettings> {
    let settings = loader.load()?;
    init_logging(log)?;
    Ok(settings)
}

/// Everything one run needs, wired from settings.
pub struct Pipeline {
    strategy: Arc<LlmExtractionStrategy>,
    crawler: Arc<WebCrawler>,
    run_config: Arc<RunConfig>,
}

fn strategy_config(settings: &ExtractionSettings, provider: ProviderId) -> StrategyConfig {
    StrategyConfig {
        provider,
        api_token: settings.deepseek_api_key.clone(),
        instruction: settings.instruction_to_llm.clone(),
        extraction_type: ExtractionType::Schema,
        schema: Some(Product::json_schema()),
        chunk_token_threshold: DEFAULT_CHUNK_TOKEN_THRESHOLD,
        overlap_rate: 0.0,
        apply_chunking: true,
        extra_args: ExtraArgs {
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        },
    }
}

impl Pipeline {
    pub async fn build(settings: &ExtractionSettings) -> Result<Self> {
        let provider: ProviderId = settings
            .llm_provider
            .parse()
            .with_context(|| format!("unsupported LLM_PROVIDER {:?}", settings.llm_provider))?;
        let client = connect_llm(&provider, &settings.deepseek_api_key).await?;
        let strategy = Arc::new(LlmExtractionStrategy::new(
            strategy_config(settings, provider),
            client,
        ));

        let session = BrowserSession::new(BrowserConfig {
            webdriver_url: settings.webdriver_url.clone(),
            headless: settings.headless,
            verbose: true,
        });

        Ok(Self {
            run_config: Arc::new(create_run_config(Arc::clone(&strategy))),
            crawler: Arc::new(WebCrawler::new(session)),
            strategy,
        })
    }

    pub async fn run(self, urls: &[String], output: &Path) -> Result<()> {
        info!(target: "app", urls = urls.len(), model = %self.strategy.model_name(), "starting crawl");

        let data = crawl_urls(self.crawler, urls, self.run_config).await;
        save_extracted_data(&data, output)?;

        self.strategy.show_usage();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings() -> ExtractionSettings {
        ExtractionSettings {
            deepseek_api_key: "sk-test".into(),
            llm_provider: "deepseek/deepseek-chat".into(),
            instruction_to_llm: "extract services".into(),
            max_tokens: 1200,
            temperature: 0.3,
            urls: vec![],
            output_path: PathBuf::from("out.json"),
            webdriver_url: "http://127.0.0.1:4444".into(),
            headless: true,
        }
    }

    #[test]
    fn strategy_is_configured_from_settings() {
        let s = settings();
        let provider: ProviderId = s.llm_provider.parse().unwrap();
        let cfg = strategy_config(&s, provider.clone());

        assert_eq!(cfg.provider, provider);
        assert_eq!(cfg.api_token, "sk-test");
        assert_eq!(cfg.instruction, "extract services");
        assert_eq!(cfg.extraction_type, ExtractionType::Schema);
        assert_eq!(cfg.schema, Some(Product::json_schema()));
        assert_eq!(cfg.chunk_token_threshold, 1000);
        assert_eq!(cfg.overlap_rate, 0.0);
        assert!(cfg.apply_chunking);
        assert_eq!(cfg.extra_args.max_tokens, 1200);
        assert_eq!(cfg.extra_args.temperature, 0.3);
    }

    #[test]
    fn missing_key_stops_before_log_files_exist() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let log = LogConfig {
            log_dir: Some(log_dir.clone()),
            emit_stderr: false,
            ..LogConfig::default()
        };

        let result = temp_env::with_var_unset("DEEPSEEK_API_KEY", || {
            startup(SettingsLoader::new(), log)
        });

        let err = result.unwrap_err();
        assert!(err.to_string().contains("DEEPSEEK_API_KEY"));
        assert!(!log_dir.exists());
    }

    #[tokio::test]
    async fn empty_url_list_writes_empty_object() -> Result<()> {
        let pipeline = Pipeline::build(&settings()).await?;
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("out.json");

        pipeline.run(&[], &out).await?;

        assert_eq!(std::fs::read_to_string(&out)?, "{}\n");
        Ok(())
    }
}
