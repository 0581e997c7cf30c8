use crate::gleaner_browser::driver::PageOptions;
use crate::gleaner_browser::scripts;
use anyhow::{Context, Result};
use fantoccini::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

/// One open browser tab bound to its own WebDriver client.
pub struct BrowserPage {
    client: Client,
    verbose: bool,
}

/// Links found on a page, split by whether they stay on the page's host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub internal: Vec<String>,
    pub external: Vec<String>,
}

/// What a fetch hands to extraction.
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    /// Rendered text as the browser lays it out (`innerText`).
    pub text: String,
    pub links: Links,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    text: String,
    #[serde(default)]
    links: Vec<String>,
}

impl BrowserPage {
    pub(crate) fn new(client: Client, verbose: bool) -> Self {
        Self { client, verbose }
    }

    fn step(&self, url: &str, step: &'static str, count: Option<u64>) {
        if self.verbose {
            info!(target: "browser.page", %url, step, ?count, "page step");
        } else {
            debug!(target: "browser.page", %url, step, ?count, "page step");
        }
    }

    /// Navigate to `url` and wait for the document to load.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        self.client
            .goto(url)
            .await
            .with_context(|| format!("navigation to {url} failed"))?;
        self.step(url, "loaded", None);
        Ok(())
    }

    /// Apply the page clean-up selected by `options`, in a fixed order:
    /// iframes, overlays, then external links.
    pub async fn process(&mut self, url: &str, options: &PageOptions) -> Result<()> {
        if options.process_iframes {
            let n = self.run_counting(scripts::INLINE_IFRAMES).await?;
            self.step(url, "iframes_inlined", Some(n));
        }
        if options.remove_overlay_elements {
            let n = self.run_counting(scripts::REMOVE_OVERLAYS).await?;
            self.step(url, "overlays_removed", Some(n));
        }
        if options.exclude_external_links {
            let n = self.run_counting(scripts::UNWRAP_EXTERNAL_LINKS).await?;
            self.step(url, "external_links_dropped", Some(n));
        }
        Ok(())
    }

    /// Capture the current document.
    pub async fn snapshot(&mut self) -> Result<PageSnapshot> {
        let url = self
            .client
            .current_url()
            .await
            .context("reading current URL failed")?
            .to_string();
        let html = self
            .client
            .source()
            .await
            .context("reading page source failed")?;
        let raw = self
            .client
            .execute(scripts::SNAPSHOT, vec![])
            .await
            .context("collecting page text failed")?;
        let raw: RawSnapshot =
            serde_json::from_value(raw).context("unexpected snapshot script result")?;

        let links = classify_links(&url, raw.links);
        self.step(&url, "snapshot", Some(raw.text.len() as u64));

        Ok(PageSnapshot {
            url,
            html,
            text: raw.text,
            links,
        })
    }

    /// Close the underlying browser session.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        Ok(())
    }

    async fn run_counting(&mut self, script: &str) -> Result<u64> {
        let value = self.client.execute(script, vec![]).await?;
        Ok(match value {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            _ => 0,
        })
    }
}

/// Split absolute `hrefs` into internal/external relative to `page_url`.
/// A leading `www.` is ignored when comparing hosts; duplicates are dropped.
pub fn classify_links(page_url: &str, hrefs: Vec<String>) -> Links {
    let host = Url::parse(page_url)
        .ok()
        .and_then(|u| u.host_str().map(bare_host));

    let mut links = Links::default();
    for href in hrefs {
        let Ok(parsed) = Url::parse(&href) else {
            continue;
        };
        let bucket = match (parsed.host_str().map(bare_host), &host) {
            (Some(h), Some(page_host)) if &h == page_host => &mut links.internal,
            _ => &mut links.external,
        };
        if !bucket.contains(&href) {
            bucket.push(href);
        }
    }
    links
}

fn bare_host(host: &str) -> String {
    host.strip_prefix("www.").unwrap_or(host).to_ascii_lowercase()
}
