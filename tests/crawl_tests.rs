//! Integration tests for the crawler
//!
//! These tests use wiremock to stand up a small site and run a full
//! indexing cycle end-to-end against a temporary database.

use lumen::config::{Config, CrawlerConfig, ServerConfig, SiteEntry, StorageConfig, UserAgentConfig};
use lumen::indexer::IndexingController;
use lumen::lemma::LemmaExtractor;
use lumen::storage::{SiteStatus, SqliteStorage, Storage};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
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

fn open_storage(dir: &tempfile::TempDir) -> Arc<Mutex<SqliteStorage>> {
    let db_path = dir.path().join("test.db");
    Arc::new(Mutex::new(SqliteStorage::new(Path::new(&db_path)).unwrap()))
}

async fn run_to_completion(controller: &IndexingController) {
    controller.start().unwrap();
    for _ in 0..500 {
        if !controller.is_running() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("indexing run did not finish in time");
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(body.to_string())
}

#[tokio::test]
async fn test_full_crawl_of_one_site() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r##"<html><head><title>Home</title></head><body>
            shared lexicon on the home page
            <a href="/page1">One</a>
            <a href="/page2">Two</a>
            <a href="/page1#section">Fragment duplicate</a>
            <a href="/logo.png">Logo</a>
            <a href="/private/secret">Hidden</a>
            <a href="http://other.invalid/">External</a>
            <a href="/missing">Broken</a>
            </body></html>"##,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(
            r#"<html><head><title>Page 1</title></head><body>
            shared lexicon again
            <a href="/">Home</a>
            <a href="/page2">Two</a>
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(
            r#"<html><head><title>Page 2</title></head><body>
            shared lexicon and a flamingo
            </body></html>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/private/secret"))
        .respond_with(html("<html><body>must never be fetched</body></html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = open_storage(&dir);
    let controller = IndexingController::new(
        test_config(&base),
        storage.clone(),
        Arc::new(LemmaExtractor::new()),
    )
    .unwrap();

    run_to_completion(&controller).await;

    let storage = storage.lock().unwrap();
    let site = storage.find_site_by_url(&base).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert!(site.last_error.is_none());

    // Root, two pages, and the broken link; the robots-disallowed page,
    // the binary file, the fragment and the external link never land.
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 4);
    for p in ["/", "/page1", "/page2", "/missing"] {
        assert!(
            storage.find_page_by_site_and_path(site.id, p).unwrap().is_some(),
            "missing page {}",
            p
        );
    }
    assert!(storage
        .find_page_by_site_and_path(site.id, "/private/secret")
        .unwrap()
        .is_none());
    assert!(storage
        .find_page_by_site_and_path(site.id, "/logo.png")
        .unwrap()
        .is_none());

    // The unmocked path is persisted with the 404 it answered with
    let missing = storage
        .find_page_by_site_and_path(site.id, "/missing")
        .unwrap()
        .unwrap();
    assert_eq!(missing.code, 404);

    // Lemma frequency counts distinct pages and never exceeds the page
    // count; "shared" is stored under its stem
    let shared = storage.find_lemma(site.id, "share").unwrap().unwrap();
    assert_eq!(shared.frequency, 3);
    let flamingo = storage.find_lemma(site.id, "flamingo").unwrap().unwrap();
    assert_eq!(flamingo.frequency, 1);

    // The 404 page contributes nothing to the index
    assert!(storage
        .pages_with_lemma(shared.id)
        .unwrap()
        .iter()
        .all(|page_id| *page_id != missing.id));
}

#[tokio::test]
async fn test_each_url_fetched_at_most_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    // Two pages linking to each other and to themselves
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(r#"<html><body><a href="/a">A</a><a href="/a">A again</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html(r#"<html><body><a href="/a">Self</a></body></html>"#))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = open_storage(&dir);
    let controller = IndexingController::new(
        test_config(&base),
        storage.clone(),
        Arc::new(LemmaExtractor::new()),
    )
    .unwrap();

    run_to_completion(&controller).await;

    // wiremock verifies the .expect(1) call counts on drop
    let storage = storage.lock().unwrap();
    let site = storage.find_site_by_url(&base).unwrap().unwrap();
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 2);
}

#[tokio::test]
async fn test_unreachable_robots_fails_open() {
    let server = MockServer::start().await;
    let base = server.uri();

    // No robots.txt mock: wiremock answers 404 and the crawl proceeds
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body>reachable content</body></html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = open_storage(&dir);
    let controller = IndexingController::new(
        test_config(&base),
        storage.clone(),
        Arc::new(LemmaExtractor::new()),
    )
    .unwrap();

    run_to_completion(&controller).await;

    let storage = storage.lock().unwrap();
    let site = storage.find_site_by_url(&base).unwrap().unwrap();
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 1);
}

#[tokio::test]
async fn test_unreachable_site_completes_with_no_pages() {
    // Nothing listens here; every fetch fails and is absorbed per branch
    let dir = tempfile::tempdir().unwrap();
    let storage = open_storage(&dir);
    let controller = IndexingController::new(
        test_config("http://127.0.0.1:1"),
        storage.clone(),
        Arc::new(LemmaExtractor::new()),
    )
    .unwrap();

    run_to_completion(&controller).await;

    let storage = storage.lock().unwrap();
    let site = storage.find_site_by_url("http://127.0.0.1:1").unwrap().unwrap();
    // The branch failure is swallowed; the crawl itself finished cleanly
    assert_eq!(site.status, SiteStatus::Indexed);
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 0);
}

#[tokio::test]
async fn test_restart_wipes_previous_run() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html("<html><body>just the one page</body></html>"))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = open_storage(&dir);
    let controller = IndexingController::new(
        test_config(&base),
        storage.clone(),
        Arc::new(LemmaExtractor::new()),
    )
    .unwrap();

    run_to_completion(&controller).await;
    run_to_completion(&controller).await;

    // The second run wiped the first; exactly one site row remains
    let storage = storage.lock().unwrap();
    assert_eq!(storage.all_sites().unwrap().len(), 1);
    let site = storage.find_site_by_url(&base).unwrap().unwrap();
    assert_eq!(storage.count_pages_by_site(site.id).unwrap(), 1);
}
