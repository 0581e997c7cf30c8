//! Driver layer for browser automation.
//!
//! This crate exposes the WebDriver-backed browser session used to fetch
//! pages and reduce them to text before extraction.
//!
//! - [`gleaner_browser::driver::BrowserSession`]: shared session handle, one WebDriver client per fetch
//! - [`gleaner_browser::page::BrowserPage`]: navigation, page clean-up, and snapshots
//! - [`gleaner_browser::scripts`]: the JavaScript run inside the page
pub mod gleaner_browser;
