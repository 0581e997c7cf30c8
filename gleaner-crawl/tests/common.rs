use async_trait::async_trait;
use gleaner_common::Result as LlmResult;
use gleaner_crawl::{CrawlResult, PageCrawler, RunConfig, create_run_config};
use gleaner_llm::strategy::{
    DEFAULT_CHUNK_TOKEN_THRESHOLD, ExtraArgs, ExtractionType, LlmExtractionStrategy, StrategyConfig,
};
use gleaner_llm::traits::{LlmClient, LlmResponse};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::fmt::MakeWriter;

/// What the scripted crawler does for a given URL.
#[allow(dead_code)]
#[derive(Clone)]
pub enum Script {
    Json(&'static str),
    Reported(&'static str),
    NoContent,
    Broken(&'static str),
    Panic,
    Slow(u64, &'static str),
}

pub struct ScriptedCrawler {
    scripts: HashMap<String, Script>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl ScriptedCrawler {
    pub fn new(scripts: &[(&str, Script)]) -> Arc<Self> {
        Arc::new(Self {
            scripts: scripts
                .iter()
                .map(|(u, s)| (u.to_string(), s.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageCrawler for ScriptedCrawler {
    async fn arun(&self, url: &str, _config: &RunConfig) -> anyhow::Result<CrawlResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.scripts.get(url).cloned() {
            Some(Script::Json(body)) => Ok(CrawlResult::ok(url, body)),
            Some(Script::Reported(msg)) => Ok(CrawlResult::failed(url, msg)),
            Some(Script::NoContent) => Ok(CrawlResult {
                url: url.to_string(),
                success: true,
                extracted_content: None,
                error_message: None,
            }),
            Some(Script::Broken(msg)) => Err(anyhow::anyhow!(msg)),
            Some(Script::Panic) => panic!("crawler blew up on {url}"),
            Some(Script::Slow(ms, body)) => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(CrawlResult::ok(url, body))
            }
            None => Err(anyhow::anyhow!("no script for {url}")),
        }
    }
}

/// LLM client that is never expected to be called by these tests.
struct IdleClient;

#[async_trait]
impl LlmClient for IdleClient {
    async fn generate(
        &self,
        _prompt: &str,
        _system_prompt: Option<&str>,
        _max_tokens: Option<u32>,
        _temperature: Option<f32>,
    ) -> LlmResult<LlmResponse> {
        Ok(LlmResponse {
            text: "[]".into(),
            ..LlmResponse::default()
        })
    }

    async fn health_check(&self) -> LlmResult<bool> {
        Ok(true)
    }

    fn model_name(&self) -> &str {
        "idle"
    }
}

#[allow(dead_code)]
pub fn run_config() -> Arc<RunConfig> {
    let config = StrategyConfig {
        provider: "openai/gpt-4o-mini".parse().unwrap(),
        api_token: "sk-test".into(),
        instruction: "extract services".into(),
        extraction_type: ExtractionType::Schema,
        schema: Some(gleaner_llm::schema::Product::json_schema()),
        chunk_token_threshold: DEFAULT_CHUNK_TOKEN_THRESHOLD,
        overlap_rate: 0.0,
        apply_chunking: true,
        extra_args: ExtraArgs {
            temperature: 0.0,
            max_tokens: 3000,
        },
    };
    let strategy = LlmExtractionStrategy::new(config, Arc::new(IdleClient));
    Arc::new(create_run_config(Arc::new(strategy)))
}

#[allow(dead_code)]
pub fn urls(list: &[&str]) -> Vec<String> {
    list.iter().map(|u| u.to_string()).collect()
}

/// In-memory log sink for asserting on emitted events.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .finish()
    }
}

pub struct CapturedWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CapturedWriter(Arc::clone(&self.0))
    }
}
