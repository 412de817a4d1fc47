//! Page indexing
//!
//! This module turns fetched page text into index writes:
//! - [`PageIndexer`] extracts lemmas from one page and updates the
//!   per-site lemma frequencies and postings
//! - [`IndexingController`] owns the run state machine: the single run
//!   flag, the full wipe, per-site supervision, stop semantics, and
//!   single-page re-indexing

mod controller;

pub use controller::IndexingController;

use crate::lemma::LemmaExtractor;
use crate::storage::{SqliteStorage, Storage, StorageError};
use std::sync::{Arc, Mutex};

/// Writes one page's lemmas into the index
///
/// Safe to invoke concurrently for different pages of the same site: the
/// lemma frequency update is a single atomic statement per lemma, so
/// parallel pages never lose an increment.
#[derive(Clone)]
pub struct PageIndexer {
    storage: Arc<Mutex<SqliteStorage>>,
    extractor: Arc<LemmaExtractor>,
}

impl PageIndexer {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, extractor: Arc<LemmaExtractor>) -> Self {
        Self { storage, extractor }
    }

    /// Indexes the visible text of a fetched page
    ///
    /// For every extracted lemma the site's frequency is incremented by
    /// exactly one (a lemma frequency counts pages containing the lemma,
    /// not occurrences) and one posting is created whose rank is the
    /// in-page occurrence count.
    pub fn index_page(&self, site_id: i64, page_id: i64, text: &str) -> Result<(), StorageError> {
        let lemmas = self.extractor.extract(text);
        if lemmas.is_empty() {
            return Ok(());
        }

        let mut storage = self.storage.lock().unwrap();
        for (lemma, count) in &lemmas {
            let lemma_id = storage.bump_lemma(site_id, lemma)?;
            storage.create_posting(page_id, lemma_id, f64::from(*count))?;
        }

        tracing::debug!("Indexed page {}: {} lemmas", page_id, lemmas.len());
        Ok(())
    }
}
