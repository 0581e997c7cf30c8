use gleaner_drivers::gleaner_browser::PageOptions;
use gleaner_llm::strategy::LlmExtractionStrategy;
use std::sync::Arc;

/// Whether fetches may reuse the browser's HTTP cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Enabled,
    Bypass,
}

/// Per-run settings shared by every fetch.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub extraction_strategy: Arc<LlmExtractionStrategy>,
    pub cache_mode: CacheMode,
    pub process_iframes: bool,
    pub remove_overlay_elements: bool,
    pub exclude_external_links: bool,
}

impl RunConfig {
    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            bypass_cache: self.cache_mode == CacheMode::Bypass,
            process_iframes: self.process_iframes,
            remove_overlay_elements: self.remove_overlay_elements,
            exclude_external_links: self.exclude_external_links,
        }
    }
}

/// Fresh fetches, iframes left alone, overlays and off-site links stripped.
pub fn create_run_config(strategy: Arc<LlmExtractionStrategy>) -> RunConfig {
    RunConfig {
        extraction_strategy: strategy,
        cache_mode: CacheMode::Bypass,
        process_iframes: false,
        remove_overlay_elements: true,
        exclude_external_links: true,
    }
}
