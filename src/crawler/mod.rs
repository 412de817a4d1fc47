//! Crawler module for web page fetching and indexing
//!
//! This module contains the crawling logic:
//! - HTTP fetching with a descriptive user agent
//! - HTML parsing, text and link extraction
//! - The recursive crawl task (one URL, fork children, join all)
//! - Per-site crawl orchestration over shared visited/cancel state

mod fetcher;
mod parser;
mod site;
mod task;

pub use fetcher::{build_http_client, fetch_page, FetchedPage};
pub use parser::{parse_html, ParsedPage};
pub use site::crawl_site;
pub use task::{page_path, CrawlContext, CrawlTask};
