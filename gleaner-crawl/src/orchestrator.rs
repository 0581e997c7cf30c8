//! Concurrent fan-out over a URL list with per-URL failure isolation.

use crate::crawler::{ExtractionError, PageCrawler, extract};
use crate::run_config::RunConfig;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{error, info};

/// URL → decoded extraction result, for URLs that succeeded.
pub type ExtractedData = Map<String, Value>;

/// Fetch and extract every URL concurrently.
///
/// All tasks are spawned before any is awaited and results are matched back
/// to URLs by task id. A failing URL is logged and left out; it never
/// affects the others. When URLs repeat, the last successful one wins.
pub async fn crawl_urls(
    crawler: Arc<dyn PageCrawler>,
    urls: &[String],
    run_config: Arc<RunConfig>,
) -> ExtractedData {
    settle(collect(crawler, urls, run_config).await)
}

/// The fan-out as a whole broke down, as opposed to a single URL failing.
#[derive(Debug, thiserror::Error)]
enum BatchError {
    #[error("task {0} finished but was never launched for a URL")]
    UnknownTask(Id),
    #[error("no outcome was recorded for {0}")]
    MissingOutcome(String),
}

/// A batch-level failure discards every result collected so far.
fn settle(outcome: Result<ExtractedData, BatchError>) -> ExtractedData {
    match outcome {
        Ok(data) => data,
        Err(e) => {
            error!(target: "crawl.orchestrator", error = %e, "error during crawling");
            ExtractedData::new()
        }
    }
}

async fn collect(
    crawler: Arc<dyn PageCrawler>,
    urls: &[String],
    run_config: Arc<RunConfig>,
) -> Result<ExtractedData, BatchError> {
    let mut set = JoinSet::new();
    let mut index_of: HashMap<Id, usize> = HashMap::with_capacity(urls.len());

    for (idx, url) in urls.iter().enumerate() {
        let crawler = Arc::clone(&crawler);
        let config = Arc::clone(&run_config);
        let url = url.clone();
        let handle = set.spawn(async move { extract(crawler.as_ref(), &url, &config).await });
        index_of.insert(handle.id(), idx);
    }

    let mut outcomes: Vec<Option<Result<Value, ExtractionError>>> =
        (0..urls.len()).map(|_| None).collect();

    while let Some(joined) = set.join_next_with_id().await {
        let (id, outcome) = match joined {
            Ok((id, outcome)) => (id, outcome),
            Err(e) => (e.id(), Err(join_failure(e))),
        };
        let idx = *index_of.get(&id).ok_or(BatchError::UnknownTask(id))?;
        outcomes[idx] = Some(outcome);
    }

    let mut data = ExtractedData::new();
    for (url, outcome) in urls.iter().zip(outcomes) {
        match outcome.ok_or_else(|| BatchError::MissingOutcome(url.clone()))? {
            Ok(value) => {
                info!(target: "crawl.orchestrator", %url, "extracted items collected");
                data.insert(url.clone(), value);
            }
            Err(e) => {
                error!(target: "crawl.orchestrator", %url, error = %e, "error crawling url");
            }
        }
    }
    Ok(data)
}

fn join_failure(e: JoinError) -> ExtractionError {
    if e.is_panic() {
        let payload = e.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        ExtractionError::Panicked(message)
    } else {
        ExtractionError::Panicked("task cancelled".to_string())
    }
}
