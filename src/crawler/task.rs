//! The recursive crawl task
//!
//! A crawl is a dynamically growing tree of tasks, one per URL. Every
//! task claims its URL in the shared visited set (an atomic
//! check-and-insert: the first task to insert proceeds, all others
//! no-op), waits out the politeness delay, fetches and persists the
//! page, indexes it on HTTP 200, then forks one child task per
//! surviving outbound link and waits for the whole subtree before
//! completing. Errors while handling a single URL end only that branch.

use crate::config::Config;
use crate::crawler::fetcher::fetch_page;
use crate::crawler::parser::parse_html;
use crate::indexer::PageIndexer;
use crate::robots::RobotsPolicy;
use crate::storage::{SiteRecord, SqliteStorage, Storage};
use crate::LumenError;
use reqwest::Client;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// State shared by every task of one site crawl
pub struct CrawlContext {
    /// The site being crawled
    pub site: SiteRecord,

    /// Crawler configuration
    pub config: Arc<Config>,

    /// Index storage
    pub storage: Arc<Mutex<SqliteStorage>>,

    /// Shared HTTP client
    pub client: Client,

    /// Indexer invoked for every page fetched with HTTP 200
    pub indexer: PageIndexer,

    /// Robots policy loaded once per site crawl
    pub robots: RobotsPolicy,

    /// URLs claimed by some task of this crawl
    pub visited: Mutex<HashSet<String>>,

    /// Run-wide cancellation flag; cleared means stop
    pub running: Arc<AtomicBool>,

    /// Bounded worker pool shared across the whole run
    pub workers: Arc<Semaphore>,
}

/// One unit of crawl work: a single URL and its subtree
pub struct CrawlTask {
    ctx: Arc<CrawlContext>,
    url: String,
}

impl CrawlTask {
    pub fn new(ctx: Arc<CrawlContext>, url: String) -> Self {
        Self { ctx, url }
    }

    /// Executes this task and its whole subtree to completion
    ///
    /// Boxed because the task recurses through its children.
    pub fn run(self) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            if !self.ctx.running.load(Ordering::SeqCst) {
                return;
            }

            // Atomic check-and-insert; losing tasks end here, so each
            // URL is fetched at most once across the whole crawl.
            if !self.ctx.visited.lock().unwrap().insert(self.url.clone()) {
                return;
            }

            let links = {
                let _permit = match self.ctx.workers.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => return,
                };

                let delay = Duration::from_millis(self.ctx.config.crawler.politeness_delay_ms);
                tokio::time::sleep(delay).await;

                match self.process().await {
                    Ok(links) => links,
                    Err(e) => {
                        // A failed URL ends only this branch
                        tracing::debug!("Skipping {}: {}", self.url, e);
                        return;
                    }
                }
            };

            // Fork all children, then join all of them
            let children: Vec<_> = links
                .into_iter()
                .filter(|link| self.is_candidate(link))
                .map(|link| tokio::spawn(CrawlTask::new(self.ctx.clone(), link).run()))
                .collect();

            for child in children {
                let _ = child.await;
            }
        })
    }

    /// Fetches, persists and indexes this task's URL
    async fn process(&self) -> Result<Vec<String>, LumenError> {
        let fetched = fetch_page(&self.ctx.client, &self.url).await?;
        let base = Url::parse(&self.url)?;
        let parsed = parse_html(&fetched.body, &base);

        let path = page_path(&self.ctx.site.url, &self.url);
        let page_id = {
            let mut storage = self.ctx.storage.lock().unwrap();
            storage.create_page(self.ctx.site.id, &path, fetched.status_code, &fetched.body)?
        };

        if fetched.status_code == 200 {
            self.ctx
                .indexer
                .index_page(self.ctx.site.id, page_id, &parsed.text)?;
        }

        Ok(parsed.links)
    }

    /// Filters a discovered link down to a crawlable candidate
    fn is_candidate(&self, url: &str) -> bool {
        url.starts_with(self.ctx.site.url.as_str())
            && !url.contains('#')
            && !has_skipped_extension(url, &self.ctx.config.crawler.skip_extensions)
            && !self.ctx.visited.lock().unwrap().contains(url)
            && self.ctx.robots.is_allowed(url)
    }
}

/// Derives the stored page path: the URL with the site root stripped,
/// the root itself normalized to "/"
pub fn page_path(site_url: &str, url: &str) -> String {
    let path = url.strip_prefix(site_url).unwrap_or(url);
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

fn has_skipped_extension(url: &str, extensions: &[String]) -> bool {
    let lower = url.to_lowercase();
    extensions
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}
