pub mod driver;
pub mod page;
pub mod scripts;

pub use driver::{build_capabilities, BrowserConfig, BrowserSession, PageOptions};
pub use page::{classify_links, BrowserPage, Links, PageSnapshot};
