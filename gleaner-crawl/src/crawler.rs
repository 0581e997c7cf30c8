use crate::run_config::RunConfig;
use anyhow::Result;
use async_trait::async_trait;
use gleaner_drivers::gleaner_browser::{BrowserPage, BrowserSession};
use serde_json::Value;
use tracing::{debug, warn};

/// Outcome of one fetch + extraction, as reported by a crawler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    pub url: String,
    pub success: bool,
    /// JSON text produced by the extraction strategy.
    pub extracted_content: Option<String>,
    pub error_message: Option<String>,
}

impl CrawlResult {
    pub fn ok(url: impl Into<String>, extracted: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: true,
            extracted_content: Some(extracted.into()),
            error_message: None,
        }
    }

    pub fn failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            success: false,
            extracted_content: None,
            error_message: Some(message.into()),
        }
    }
}

/// Fetches one page and runs the configured extraction over it.
///
/// `Err` means the fetch itself broke (browser, network). An extractor that
/// ran but could not produce data reports `Ok` with `success == false`.
#[async_trait]
pub trait PageCrawler: Send + Sync {
    async fn arun(&self, url: &str, config: &RunConfig) -> Result<CrawlResult>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("crawl failed: {0:#}")]
    Crawl(anyhow::Error),
    #[error("extraction failed: {0}")]
    Failed(String),
    #[error("extraction succeeded but returned no content")]
    MissingContent,
    #[error("extracted content is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    #[error("crawl task panicked: {0}")]
    Panicked(String),
}

/// Fetch `url` and decode the extracted text as JSON.
pub async fn extract(
    crawler: &dyn PageCrawler,
    url: &str,
    config: &RunConfig,
) -> Result<Value, ExtractionError> {
    let result = crawler
        .arun(url, config)
        .await
        .map_err(ExtractionError::Crawl)?;

    if !result.success {
        let message = result
            .error_message
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(ExtractionError::Failed(message));
    }

    let content = result
        .extracted_content
        .ok_or(ExtractionError::MissingContent)?;
    Ok(serde_json::from_str(&content)?)
}

/// Production crawler: a WebDriver browser plus the run's LLM strategy.
#[derive(Debug, Clone)]
pub struct WebCrawler {
    session: BrowserSession,
}

impl WebCrawler {
    pub fn new(session: BrowserSession) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    async fn fetch_text(page: &mut BrowserPage, url: &str, config: &RunConfig) -> Result<String> {
        page.goto(url).await?;
        page.process(url, &config.page_options()).await?;
        let snapshot = page.snapshot().await?;
        debug!(
            target: "crawl.web",
            %url,
            html_bytes = snapshot.html.len(),
            internal_links = snapshot.links.internal.len(),
            external_links = snapshot.links.external.len(),
            "page captured"
        );
        Ok(snapshot.text)
    }
}

#[async_trait]
impl PageCrawler for WebCrawler {
    async fn arun(&self, url: &str, config: &RunConfig) -> Result<CrawlResult> {
        let mut page = self.session.open(&config.page_options()).await?;
        let fetched = Self::fetch_text(&mut page, url, config).await;

        // Always release the WebDriver session, even when the fetch failed.
        if let Err(e) = page.close().await {
            warn!(target: "crawl.web", %url, error = %e, "closing browser session failed");
        }
        let text = fetched?;

        let result = match config.extraction_strategy.extract(url, &text).await {
            Ok(blocks) => CrawlResult::ok(url, serde_json::to_string(&blocks)?),
            Err(e) => CrawlResult::failed(url, e.to_string()),
        };
        Ok(result)
    }
}
