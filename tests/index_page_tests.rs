//! Integration tests for single-page indexing
//!
//! Single-page indexing fetches one URL without recursing into links,
//! and re-indexing the same URL replaces the stored page first.

use lumen::config::{Config, CrawlerConfig, ServerConfig, SiteEntry, StorageConfig, UserAgentConfig};
use lumen::indexer::IndexingController;
use lumen::lemma::LemmaExtractor;
use lumen::storage::{SqliteStorage, Storage};
use lumen::LumenError;
use std::path::Path;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(site_url: &str) -> Arc<Config> {
    Arc::new(Config {
        crawler: CrawlerConfig {
            politeness_delay_ms: 10,
            fetch_timeout_secs: 2,
            robots_timeout_secs: 1,
            skip_extensions: CrawlerConfig::default().skip_extensions,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        server: ServerConfig::default(),
        storage: StorageConfig {
            database_path: ":memory:".to_string(),
        },
        sites: vec![SiteEntry {
            url: site_url.to_string(),
            name: "Test Site".to_string(),
        }],
    })
}

struct Setup {
    controller: IndexingController,
    storage: Arc<Mutex<SqliteStorage>>,
    site_id: i64,
    _dir: tempfile::TempDir,
}

/// Builds a controller with the site row already persisted
fn setup(site_url: &str) -> Setup {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let storage = Arc::new(Mutex::new(SqliteStorage::new(Path::new(&db_path)).unwrap()));
    let site_id = storage
        .lock()
        .unwrap()
        .create_site(site_url, "Test Site")
        .unwrap()
        .id;
    let controller = IndexingController::new(
        test_config(site_url),
        storage.clone(),
        Arc::new(LemmaExtractor::new()),
    )
    .unwrap();

    Setup {
        controller,
        storage,
        site_id,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_index_single_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/target"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body>zebra zebra stampede <a href="/linked">Link</a></body></html>"#,
        ))
        .mount(&server)
        .await;

    let s = setup(&base);
    s.controller.index_page(&format!("{}/target", base)).await.unwrap();

    let storage = s.storage.lock().unwrap();
    let page = storage
        .find_page_by_site_and_path(s.site_id, "/target")
        .unwrap()
        .unwrap();
    assert_eq!(page.code, 200);

    let zebra = storage.find_lemma(s.site_id, "zebra").unwrap().unwrap();
    assert_eq!(zebra.frequency, 1);
    assert_eq!(storage.posting_rank(page.id, zebra.id).unwrap(), Some(2.0));

    // Links are not followed
    assert!(storage
        .find_page_by_site_and_path(s.site_id, "/linked")
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_reindex_replaces_page_and_postings() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/target"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>zebra zebra stampede</body></html>"),
        )
        .mount(&server)
        .await;

    let s = setup(&base);
    let url = format!("{}/target", base);
    s.controller.index_page(&url).await.unwrap();
    s.controller.index_page(&url).await.unwrap();

    let storage = s.storage.lock().unwrap();

    // Still exactly one page for the path, with fresh postings
    let page = storage
        .find_page_by_site_and_path(s.site_id, "/target")
        .unwrap()
        .unwrap();
    let zebra = storage.find_lemma(s.site_id, "zebra").unwrap().unwrap();
    assert_eq!(storage.pages_with_lemma(zebra.id).unwrap().len(), 1);
    assert_eq!(storage.posting_rank(page.id, zebra.id).unwrap(), Some(2.0));

    // Deleting the old page does not decrement the lemma frequency, so
    // each re-index of a page containing the lemma adds one: 2 after
    // indexing the same page twice.
    assert_eq!(zebra.frequency, 2);
}

#[tokio::test]
async fn test_out_of_scope_url_rejected() {
    let s = setup("http://127.0.0.1:1");
    let result = s.controller.index_page("https://unrelated.com/page").await;
    assert!(matches!(result, Err(LumenError::OutOfScope { .. })));

    // Nothing was written
    assert_eq!(
        s.storage.lock().unwrap().count_pages_by_site(s.site_id).unwrap(),
        0
    );
}

#[tokio::test]
async fn test_non_200_page_is_stored_but_not_indexed() {
    let server = MockServer::start().await;
    let base = server.uri();
    // No mock for /gone: wiremock answers 404

    let s = setup(&base);
    s.controller.index_page(&format!("{}/gone", base)).await.unwrap();

    let storage = s.storage.lock().unwrap();
    let page = storage
        .find_page_by_site_and_path(s.site_id, "/gone")
        .unwrap()
        .unwrap();
    assert_eq!(page.code, 404);
    assert_eq!(storage.count_lemmas_by_site(s.site_id).unwrap(), 0);
}
