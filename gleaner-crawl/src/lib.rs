//! Page crawling and result collection.
//!
//! - Run configuration handed to every fetch (`run_config`)
//! - The crawler seam and its WebDriver-backed implementation (`crawler`)
//! - Concurrent fan-out over a URL list (`orchestrator`)
//! - Writing the collected results to disk (`output`)

pub mod crawler;
pub mod orchestrator;
pub mod output;
pub mod run_config;

pub use crawler::{CrawlResult, ExtractionError, PageCrawler, WebCrawler, extract};
pub use orchestrator::{ExtractedData, crawl_urls};
pub use output::{DEFAULT_OUTPUT_FILE, save_extracted_data};
pub use run_config::{CacheMode, RunConfig, create_run_config};
