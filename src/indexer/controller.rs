//! Indexing run controller
//!
//! The top-level state machine over the whole index. At most one run is
//! active at any time, guarded by a single atomic flag: `start` fails
//! when it is already set, `stop` fails when it is already clear. A run
//! wipes all persisted data, then crawls the configured sites one after
//! another inside a worker pool sized to the machine; a failing site is
//! recorded and the run moves on. Stopping is cooperative: queued tasks
//! observe the cleared flag before doing work, while in-flight fetches
//! may still finish and write.

use crate::config::Config;
use crate::crawler::{build_http_client, crawl_site, fetch_page, page_path, parse_html};
use crate::indexer::PageIndexer;
use crate::lemma::LemmaExtractor;
use crate::storage::{SiteStatus, SqliteStorage, Storage};
use crate::LumenError;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use url::Url;

/// Controls full indexing runs and single-page indexing
pub struct IndexingController {
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    client: Client,
    indexer: PageIndexer,
    extractor: Arc<LemmaExtractor>,
    running: Arc<AtomicBool>,
    run_handle: Mutex<Option<JoinHandle<()>>>,
}

impl IndexingController {
    pub fn new(
        config: Arc<Config>,
        storage: Arc<Mutex<SqliteStorage>>,
        extractor: Arc<LemmaExtractor>,
    ) -> Result<Self, LumenError> {
        let timeout = Duration::from_secs(config.crawler.fetch_timeout_secs);
        let client = build_http_client(&config.user_agent, timeout)?;
        let indexer = PageIndexer::new(storage.clone(), extractor.clone());

        Ok(Self {
            config,
            storage,
            client,
            indexer,
            extractor,
            running: Arc::new(AtomicBool::new(false)),
            run_handle: Mutex::new(None),
        })
    }

    /// Starts a full indexing run of all configured sites
    ///
    /// Fails with `AlreadyRunning` when a run is active. The run itself
    /// proceeds asynchronously; this returns as soon as it is launched.
    pub fn start(&self) -> Result<(), LumenError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Indexing start requested while a run is active");
            return Err(LumenError::AlreadyRunning);
        }

        tracing::info!("Starting full indexing of {} sites", self.config.sites.len());

        let config = self.config.clone();
        let storage = self.storage.clone();
        let client = self.client.clone();
        let extractor = self.extractor.clone();
        let running = self.running.clone();

        let handle = tokio::spawn(async move {
            Self::run_all(config, storage, client, extractor, running).await;
        });
        *self.run_handle.lock().unwrap() = Some(handle);

        Ok(())
    }

    /// Stops the active indexing run
    ///
    /// Fails with `NotRunning` when no run is active. Clears the flag so
    /// every queued crawl task drains as a no-op, and aborts the run
    /// supervisor. Fetches already in flight may still complete and
    /// write their page before observing the flag.
    pub fn stop(&self) -> Result<(), LumenError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            tracing::warn!("Indexing stop requested but no run is active");
            return Err(LumenError::NotRunning);
        }

        tracing::info!("Stopping indexing run by request");
        if let Some(handle) = self.run_handle.lock().unwrap().take() {
            handle.abort();
        }

        Ok(())
    }

    /// Whether an indexing run is currently active
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run_all(
        config: Arc<Config>,
        storage: Arc<Mutex<SqliteStorage>>,
        client: Client,
        extractor: Arc<LemmaExtractor>,
        running: Arc<AtomicBool>,
    ) {
        tracing::info!("Wiping previous index data");
        let wiped = { storage.lock().unwrap().delete_all() };
        if let Err(e) = wiped {
            tracing::error!("Failed to wipe index data: {}", e);
            running.store(false, Ordering::SeqCst);
            return;
        }

        let parallelism = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let workers = Arc::new(Semaphore::new(parallelism));
        tracing::info!("Worker pool created with {} slots", parallelism);

        for entry in &config.sites {
            if !running.load(Ordering::SeqCst) {
                tracing::info!("Indexing run stopped before {}", entry.url);
                break;
            }

            tracing::info!("Indexing site: {}", entry.url);
            let created = { storage.lock().unwrap().create_site(&entry.url, &entry.name) };
            let site = match created {
                Ok(site) => site,
                Err(e) => {
                    tracing::error!("Failed to create site record for {}: {}", entry.url, e);
                    break;
                }
            };
            let site_id = site.id;

            let result = crawl_site(
                site,
                config.clone(),
                storage.clone(),
                client.clone(),
                extractor.clone(),
                running.clone(),
                workers.clone(),
            )
            .await;

            let update = match result {
                Ok(visited) => {
                    tracing::info!("Site {} indexed ({} URLs visited)", entry.url, visited);
                    storage
                        .lock()
                        .unwrap()
                        .update_site_status(site_id, SiteStatus::Indexed, None)
                }
                Err(e) => {
                    tracing::error!("Indexing of {} failed: {}", entry.url, e);
                    storage.lock().unwrap().update_site_status(
                        site_id,
                        SiteStatus::Failed,
                        Some(&e.to_string()),
                    )
                }
            };
            if let Err(e) = update {
                tracing::error!("Failed to update status of {}: {}", entry.url, e);
            }
        }

        tracing::info!("Indexing run finished");
        running.store(false, Ordering::SeqCst);
    }

    /// Indexes a single page without recursing into its links
    ///
    /// The URL must be inside a configured site's scope, and that site
    /// must already be persisted. An already-indexed page at the same
    /// path is deleted (with its postings) before the new fetch is
    /// written, so re-indexing the same URL is idempotent at the page
    /// level. Runs independently of the run flag.
    pub async fn index_page(&self, url: &str) -> Result<(), LumenError> {
        let url = url.trim();
        tracing::info!("Single-page indexing requested for {}", url);

        let entry = self
            .config
            .sites
            .iter()
            .find(|site| url.starts_with(site.url.as_str()))
            .ok_or_else(|| LumenError::OutOfScope {
                url: url.to_string(),
            })?;

        let site = { self.storage.lock().unwrap().find_site_by_url(&entry.url)? }
            .ok_or(LumenError::SiteNotIndexed)?;

        let path = page_path(&site.url, url);

        let existing = {
            self.storage
                .lock()
                .unwrap()
                .find_page_by_site_and_path(site.id, &path)?
        };
        if let Some(page) = existing {
            tracing::debug!("Replacing existing page {}{}", site.url, page.path);
            self.storage.lock().unwrap().delete_page(page.id)?;
        }

        let fetched = fetch_page(&self.client, url).await?;
        let base = Url::parse(url)?;
        let parsed = parse_html(&fetched.body, &base);

        let page_id = {
            self.storage.lock().unwrap().create_page(
                site.id,
                &path,
                fetched.status_code,
                &fetched.body,
            )?
        };

        if fetched.status_code == 200 {
            self.indexer.index_page(site.id, page_id, &parsed.text)?;
        }

        tracing::info!("Page {} stored with status {}", url, fetched.status_code);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, ServerConfig, SiteEntry, StorageConfig, UserAgentConfig};

    fn test_config(politeness_delay_ms: u64) -> Arc<Config> {
        Arc::new(Config {
            crawler: CrawlerConfig {
                politeness_delay_ms,
                fetch_timeout_secs: 1,
                robots_timeout_secs: 1,
                skip_extensions: CrawlerConfig::default().skip_extensions,
            },
            user_agent: UserAgentConfig {
                crawler_name: "TestBot".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
                contact_email: "admin@example.com".to_string(),
            },
            server: ServerConfig::default(),
            storage: StorageConfig {
                database_path: ":memory:".to_string(),
            },
            // Nothing listens on this port, so crawl tasks fail fast;
            // the long politeness delay keeps the run alive meanwhile.
            sites: vec![SiteEntry {
                url: "http://127.0.0.1:1".to_string(),
                name: "Unreachable".to_string(),
            }],
        })
    }

    fn controller(politeness_delay_ms: u64) -> IndexingController {
        let storage = Arc::new(Mutex::new(SqliteStorage::new_in_memory().unwrap()));
        IndexingController::new(
            test_config(politeness_delay_ms),
            storage,
            Arc::new(LemmaExtractor::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_start_twice_fails_with_already_running() {
        let controller = controller(60_000);

        assert!(controller.start().is_ok());
        assert!(matches!(controller.start(), Err(LumenError::AlreadyRunning)));

        controller.stop().unwrap();
    }

    #[tokio::test]
    async fn test_stop_without_start_fails_with_not_running() {
        let controller = controller(60_000);
        assert!(matches!(controller.stop(), Err(LumenError::NotRunning)));
    }

    #[tokio::test]
    async fn test_stop_clears_running_flag() {
        let controller = controller(60_000);

        controller.start().unwrap();
        assert!(controller.is_running());

        controller.stop().unwrap();
        assert!(!controller.is_running());

        // A second stop is misuse again
        assert!(matches!(controller.stop(), Err(LumenError::NotRunning)));
    }

    #[tokio::test]
    async fn test_run_clears_flag_when_finished() {
        // Short delay: the single unreachable site fails fast and the
        // run completes on its own.
        let controller = controller(10);

        controller.start().unwrap();
        for _ in 0..200 {
            if !controller.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!controller.is_running());
    }

    #[tokio::test]
    async fn test_index_page_out_of_scope() {
        let controller = controller(10);
        let result = controller.index_page("https://unrelated.com/page").await;
        assert!(matches!(result, Err(LumenError::OutOfScope { .. })));
    }

    #[tokio::test]
    async fn test_index_page_site_never_crawled() {
        let controller = controller(10);
        // In scope, but no site row has ever been persisted
        let result = controller.index_page("http://127.0.0.1:1/page").await;
        assert!(matches!(result, Err(LumenError::SiteNotIndexed)));
    }
}
