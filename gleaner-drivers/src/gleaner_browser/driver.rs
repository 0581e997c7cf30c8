use crate::gleaner_browser::page::BrowserPage;
use anyhow::{Context, Result};
use fantoccini::ClientBuilder;
use serde_json::json;
use std::sync::Arc;
use webdriver::capabilities::Capabilities;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

/// Session-wide browser settings.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// WebDriver endpoint (Chromedriver by default).
    pub webdriver_url: String,
    pub headless: bool,
    /// Log each page step at `info` instead of `debug`.
    pub verbose: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            headless: true,
            verbose: false,
        }
    }
}

/// Per-fetch page handling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageOptions {
    /// Start the fetch with the HTTP cache effectively disabled.
    pub bypass_cache: bool,
    /// Inline same-origin iframe content into the parent document.
    pub process_iframes: bool,
    /// Remove fixed overlays, cookie banners, and open dialogs.
    pub remove_overlay_elements: bool,
    /// Unwrap anchors that point off-site so they drop out of the snapshot.
    pub exclude_external_links: bool,
}

/// Shared handle to the browser.
///
/// Cloning is cheap. Every [`BrowserSession::open`] starts its own WebDriver
/// client, so concurrent fetches never contend for the same tab and a stuck
/// page only holds up its own fetch.
#[derive(Debug, Clone)]
pub struct BrowserSession {
    config: Arc<BrowserConfig>,
}

impl BrowserSession {
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Connect a fresh WebDriver client configured for `options`.
    pub async fn open(&self, options: &PageOptions) -> Result<BrowserPage> {
        let caps = build_capabilities(&self.config, options);

        let mut builder = ClientBuilder::native();
        builder.capabilities(caps);
        let client = builder
            .connect(&self.config.webdriver_url)
            .await
            .with_context(|| {
                format!(
                    "failed to start browser via WebDriver at {}",
                    self.config.webdriver_url
                )
            })?;

        Ok(BrowserPage::new(client, self.config.verbose))
    }
}

/// Construct Chrome capabilities for one fetch.
pub fn build_capabilities(config: &BrowserConfig, options: &PageOptions) -> Capabilities {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-extensions".to_string(),
        "--disable-infobars".to_string(),
        "--window-size=1920,1080".to_string(),
    ];
    if config.headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    if options.bypass_cache {
        args.push("--disk-cache-size=1".to_string());
        args.push("--media-cache-size=1".to_string());
    }

    let mut caps = Capabilities::new();
    caps.insert("browserName".to_string(), json!("chrome"));
    caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(caps: &Capabilities) -> Vec<String> {
        caps["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn headless_adds_headless_flags() {
        let caps = build_capabilities(&BrowserConfig::default(), &PageOptions::default());
        let args = args(&caps);
        assert!(args.contains(&"--headless=new".to_string()));
        assert!(args.contains(&"--disable-gpu".to_string()));
        assert!(!args.iter().any(|a| a.starts_with("--disk-cache-size")));
    }

    #[test]
    fn bypass_cache_shrinks_caches() {
        let config = BrowserConfig {
            headless: false,
            ..BrowserConfig::default()
        };
        let options = PageOptions {
            bypass_cache: true,
            ..PageOptions::default()
        };
        let args = args(&build_capabilities(&config, &options));
        assert!(args.contains(&"--disk-cache-size=1".to_string()));
        assert!(!args.contains(&"--headless=new".to_string()));
    }

    #[test]
    fn session_clones_share_config() {
        let session = BrowserSession::new(BrowserConfig {
            webdriver_url: "http://127.0.0.1:4444".into(),
            ..BrowserConfig::default()
        });
        let other = session.clone();
        assert_eq!(other.config().webdriver_url, "http://127.0.0.1:4444");
        assert!(other.config().headless);
    }
}
