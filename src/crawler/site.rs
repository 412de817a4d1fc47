//! Per-site crawl orchestration
//!
//! Builds the shared state for one site's crawl (robots policy, fresh
//! visited set, the run-wide cancellation flag and worker pool) and
//! drives the root crawl task to completion. The caller decides what a
//! clean or failed completion means for the site's status.

use crate::config::Config;
use crate::crawler::task::{CrawlContext, CrawlTask};
use crate::indexer::PageIndexer;
use crate::lemma::LemmaExtractor;
use crate::robots::RobotsPolicy;
use crate::storage::{SiteRecord, SqliteStorage};
use crate::LumenError;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Crawls one site to completion
///
/// Loads the robots policy once, seeds the root task with the site's
/// root URL and waits for the recursive task tree to finish. Individual
/// page failures are absorbed inside the tasks; an error here means the
/// crawl itself died and the caller records the site as failed.
///
/// Returns the number of URLs claimed by the crawl.
pub async fn crawl_site(
    site: SiteRecord,
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    client: Client,
    extractor: Arc<LemmaExtractor>,
    running: Arc<AtomicBool>,
    workers: Arc<Semaphore>,
) -> Result<usize, LumenError> {
    let robots_timeout = Duration::from_secs(config.crawler.robots_timeout_secs);
    let robots = RobotsPolicy::load(&client, &site.url, robots_timeout).await;
    tracing::debug!(
        "Robots policy for {}: {} disallow rules",
        site.url,
        robots.rule_count()
    );

    let indexer = PageIndexer::new(storage.clone(), extractor);
    let root_url = site.url.clone();

    let ctx = Arc::new(CrawlContext {
        site,
        config,
        storage,
        client,
        indexer,
        robots,
        visited: Mutex::new(HashSet::new()),
        running,
        workers,
    });

    let root = CrawlTask::new(ctx.clone(), root_url);
    tokio::spawn(root.run())
        .await
        .map_err(|e| LumenError::Crawl(format!("Site crawl aborted: {}", e)))?;

    let visited = ctx.visited.lock().unwrap().len();
    tracing::info!("Crawl of {} finished: {} URLs visited", ctx.site.url, visited);
    Ok(visited)
}
