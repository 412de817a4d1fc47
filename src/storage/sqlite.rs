//! SQLite storage implementation

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{LemmaRecord, PageRecord, SiteRecord, SiteStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
        Ok(SiteRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            name: row.get(2)?,
            status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
                .unwrap_or(SiteStatus::Failed),
            status_time: row.get(4)?,
            last_error: row.get(5)?,
        })
    }

    fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
        Ok(PageRecord {
            id: row.get(0)?,
            site_id: row.get(1)?,
            path: row.get(2)?,
            code: row.get::<_, i64>(3)? as u16,
            content: row.get(4)?,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Sites =====

    fn create_site(&mut self, url: &str, name: &str) -> StorageResult<SiteRecord> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sites (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, name, SiteStatus::Indexing.to_db_string(), now],
        )?;

        Ok(SiteRecord {
            id: self.conn.last_insert_rowid(),
            url: url.to_string(),
            name: name.to_string(),
            status: SiteStatus::Indexing,
            status_time: now,
            last_error: None,
        })
    }

    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        match error {
            Some(message) => {
                self.conn.execute(
                    "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE id = ?4",
                    params![status.to_db_string(), now, message, site_id],
                )?;
            }
            None => {
                self.conn.execute(
                    "UPDATE sites SET status = ?1, status_time = ?2 WHERE id = ?3",
                    params![status.to_db_string(), now, site_id],
                )?;
            }
        }
        Ok(())
    }

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let site = self
            .conn
            .query_row(
                "SELECT id, url, name, status, status_time, last_error FROM sites WHERE url = ?1",
                params![url],
                Self::site_from_row,
            )
            .optional()?;
        Ok(site)
    }

    fn all_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, name, status, status_time, last_error FROM sites ORDER BY id",
        )?;
        let sites = stmt
            .query_map([], Self::site_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sites)
    }

    // ===== Pages =====

    fn create_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
            params![site_id, path, code as i64, content],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        self.conn
            .query_row(
                "SELECT id, site_id, path, code, content FROM pages WHERE id = ?1",
                params![page_id],
                Self::page_from_row,
            )
            .optional()?
            .ok_or(StorageError::PageNotFound(page_id))
    }

    fn find_page_by_site_and_path(
        &self,
        site_id: i64,
        path: &str,
    ) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                "SELECT id, site_id, path, code, content FROM pages WHERE site_id = ?1 AND path = ?2",
                params![site_id, path],
                Self::page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn delete_page(&mut self, page_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;
        Ok(())
    }

    // ===== Lemmas =====

    fn bump_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<i64> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?1, ?2, 1)
             ON CONFLICT(site_id, lemma) DO UPDATE SET frequency = frequency + 1
             RETURNING id",
            params![site_id, lemma],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT id, site_id, lemma, frequency FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
                params![site_id, lemma],
                |row| {
                    Ok(LemmaRecord {
                        id: row.get(0)?,
                        site_id: row.get(1)?,
                        lemma: row.get(2)?,
                        frequency: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn count_lemmas_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemmas WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Postings =====

    fn create_posting(&mut self, page_id: i64, lemma_id: i64, rank: f64) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO postings (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)",
            params![page_id, lemma_id, rank],
        )?;
        Ok(())
    }

    fn pages_with_lemma(&self, lemma_id: i64) -> StorageResult<HashSet<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT page_id FROM postings WHERE lemma_id = ?1")?;
        let pages = stmt
            .query_map(params![lemma_id], |row| row.get(0))?
            .collect::<rusqlite::Result<HashSet<i64>>>()?;
        Ok(pages)
    }

    fn posting_rank(&self, page_id: i64, lemma_id: i64) -> StorageResult<Option<f64>> {
        let rank = self
            .conn
            .query_row(
                "SELECT rank FROM postings WHERE page_id = ?1 AND lemma_id = ?2",
                params![page_id, lemma_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rank)
    }

    // ===== Bulk =====

    fn delete_all(&mut self) -> StorageResult<()> {
        self.conn.execute_batch(
            "
            DELETE FROM postings;
            DELETE FROM lemmas;
            DELETE FROM pages;
            DELETE FROM sites;
        ",
        )?;
        Ok(())
    }
}
