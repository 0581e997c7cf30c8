use gleaner_drivers::gleaner_browser::{BrowserConfig, BrowserSession, PageOptions};

/// Needs a running Chromedriver on the default port.
#[tokio::test]
#[ignore]
async fn snapshot_of_a_static_page() -> anyhow::Result<()> {
    let session = BrowserSession::new(BrowserConfig::default());
    let options = PageOptions {
        bypass_cache: true,
        remove_overlay_elements: true,
        exclude_external_links: true,
        ..PageOptions::default()
    };

    let mut page = session.open(&options).await?;
    page.goto("https://example.com/").await?;
    page.process("https://example.com/", &options).await?;
    let snapshot = page.snapshot().await?;
    page.close().await?;

    assert!(snapshot.text.contains("Example Domain"));
    assert!(snapshot.links.external.is_empty());
    Ok(())
}
