//! Storage trait and error types

use crate::storage::{LemmaRecord, PageRecord, SiteRecord, SiteStatus};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Defines every read and write the engine performs against the index.
/// Implementations are used behind a single lock, so methods take plain
/// `&self`/`&mut self` receivers.
pub trait Storage {
    // ===== Sites =====

    /// Creates a site record with status INDEXING and the current time
    fn create_site(&mut self, url: &str, name: &str) -> StorageResult<SiteRecord>;

    /// Updates a site's status, stamping the status time; a `Some` error
    /// message replaces the stored one, `None` leaves it untouched
    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        error: Option<&str>,
    ) -> StorageResult<()>;

    /// Finds a site by its root URL
    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Lists all persisted sites in creation order
    fn all_sites(&self) -> StorageResult<Vec<SiteRecord>>;

    // ===== Pages =====

    /// Persists a fetched page, returning its id
    fn create_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> StorageResult<i64>;

    /// Gets a page by id
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Finds a page by its site and derived path
    fn find_page_by_site_and_path(
        &self,
        site_id: i64,
        path: &str,
    ) -> StorageResult<Option<PageRecord>>;

    /// Counts the pages of a site
    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64>;

    /// Deletes a page; its postings are cascade-deleted with it
    fn delete_page(&mut self, page_id: i64) -> StorageResult<()>;

    // ===== Lemmas =====

    /// Finds or creates the site's lemma record and increments its
    /// frequency by one, returning the lemma id
    ///
    /// This is a single atomic statement: concurrent calls for the same
    /// (site, lemma) never lose an increment.
    fn bump_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<i64>;

    /// Finds a lemma record by site and lemma text
    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Counts the lemmas of a site
    fn count_lemmas_by_site(&self, site_id: i64) -> StorageResult<u64>;

    // ===== Postings =====

    /// Creates the posting linking a page and a lemma
    fn create_posting(&mut self, page_id: i64, lemma_id: i64, rank: f64) -> StorageResult<()>;

    /// The set of pages holding a posting for the lemma
    fn pages_with_lemma(&self, lemma_id: i64) -> StorageResult<HashSet<i64>>;

    /// The posting rank for a (page, lemma) pair, if any
    fn posting_rank(&self, page_id: i64, lemma_id: i64) -> StorageResult<Option<f64>>;

    // ===== Bulk =====

    /// Wipes all index data: postings, lemmas, pages, sites, in that order
    fn delete_all(&mut self) -> StorageResult<()>;
}
