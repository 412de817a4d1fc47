//! Query execution against the persisted index

use crate::lemma::LemmaExtractor;
use crate::search::snippet::generate_snippet;
use crate::search::types::{SearchItem, SearchPage};
use crate::storage::{LemmaRecord, SiteRecord, SqliteStorage, Storage};
use crate::LumenError;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use url::Url;

/// Title used when a result page has no `<title>`
const TITLE_PLACEHOLDER: &str = "Untitled";

/// Lemmas present on more than this share of a site's pages are not
/// discriminating and are dropped from the query for that site
const FREQUENCY_CUTOFF: f64 = 0.8;

/// A scored candidate page before rendering
struct Candidate {
    page_id: i64,
    site_url: String,
    site_name: String,
    relevance: f64,
}

/// Read-only search over the index
///
/// Holds no state beyond its storage and analyzer handles; concurrent
/// searches never block each other beyond storage access, and a search
/// may run while a crawl is writing.
#[derive(Clone)]
pub struct SearchEngine {
    storage: Arc<Mutex<SqliteStorage>>,
    extractor: Arc<LemmaExtractor>,
}

impl SearchEngine {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, extractor: Arc<LemmaExtractor>) -> Self {
        Self { storage, extractor }
    }

    /// Runs a ranked search
    ///
    /// # Arguments
    ///
    /// * `query` - Raw query text; must not be blank
    /// * `site_filter` - Optional site root URL restricting the search
    /// * `offset` - Index of the first result to return
    /// * `limit` - Maximum number of results to return
    ///
    /// # Returns
    ///
    /// The requested result slice plus the total match count. A query
    /// whose every token is a stop-word or too short is a successful
    /// empty result, not an error.
    pub fn search(
        &self,
        query: &str,
        site_filter: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<SearchPage, LumenError> {
        if query.trim().is_empty() {
            return Err(LumenError::EmptyQuery);
        }

        let query_lemmas: HashSet<String> = self.extractor.extract(query).into_keys().collect();
        tracing::debug!("Query '{}' produced {} lemmas", query, query_lemmas.len());
        if query_lemmas.is_empty() {
            return Ok(SearchPage::empty());
        }

        let storage = self.storage.lock().unwrap();
        let sites = resolve_sites(&storage, site_filter)?;

        let mut candidates = Vec::new();
        for site in &sites {
            candidates.extend(search_in_site(&storage, site, &query_lemmas)?);
        }

        candidates.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        });

        let count = candidates.len();
        tracing::debug!("Query '{}' matched {} pages", query, count);

        let start = offset.min(count);
        let end = offset.saturating_add(limit).min(count);

        let mut items = Vec::with_capacity(end - start);
        for candidate in &candidates[start..end] {
            items.push(self.render_item(&storage, candidate, &query_lemmas)?);
        }

        Ok(SearchPage { count, items })
    }

    /// Renders one candidate into a result item with title and snippet
    fn render_item(
        &self,
        storage: &SqliteStorage,
        candidate: &Candidate,
        query_lemmas: &HashSet<String>,
    ) -> Result<SearchItem, LumenError> {
        let page = storage.get_page(candidate.page_id)?;
        let base = Url::parse(&candidate.site_url)?;
        let parsed = crate::crawler::parse_html(&page.content, &base);

        let title = parsed
            .title
            .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string());
        let snippet = generate_snippet(&parsed.text, query_lemmas, &self.extractor);

        Ok(SearchItem {
            site: candidate.site_url.clone(),
            site_name: candidate.site_name.clone(),
            uri: page.path,
            title,
            snippet,
            relevance: candidate.relevance,
        })
    }
}

/// Resolves the site set a search runs against
fn resolve_sites(
    storage: &SqliteStorage,
    filter: Option<&str>,
) -> Result<Vec<SiteRecord>, LumenError> {
    let sites: Vec<SiteRecord> = match filter {
        Some(url) if !url.trim().is_empty() => storage
            .find_site_by_url(url.trim().trim_end_matches('/'))?
            .into_iter()
            .collect(),
        _ => storage.all_sites()?,
    };

    if sites.is_empty() {
        return Err(LumenError::SiteNotIndexed);
    }
    Ok(sites)
}

/// Runs the filter/intersect/score pipeline for one site
fn search_in_site(
    storage: &SqliteStorage,
    site: &SiteRecord,
    query_lemmas: &HashSet<String>,
) -> Result<Vec<Candidate>, LumenError> {
    let total_pages = storage.count_pages_by_site(site.id)?;
    if total_pages == 0 {
        return Ok(Vec::new());
    }

    let threshold = (total_pages as f64 * FREQUENCY_CUTOFF).floor() as i64;

    // Keep only lemmas the site knows and that are rare enough to
    // discriminate; a lemma absent from the site is dropped silently.
    let mut lemmas: Vec<LemmaRecord> = Vec::new();
    for text in query_lemmas {
        if let Some(record) = storage.find_lemma(site.id, text)? {
            if record.frequency <= threshold {
                lemmas.push(record);
            } else {
                tracing::debug!(
                    "Lemma '{}' dropped for {} (frequency {} > {})",
                    text,
                    site.url,
                    record.frequency,
                    threshold
                );
            }
        }
    }

    if lemmas.is_empty() {
        return Ok(Vec::new());
    }

    // Rarest first: intersecting from the smallest posting set keeps
    // the working set minimal.
    lemmas.sort_by_key(|lemma| lemma.frequency);

    let mut pages = storage.pages_with_lemma(lemmas[0].id)?;
    for lemma in &lemmas[1..] {
        if pages.is_empty() {
            break;
        }
        let with_lemma = storage.pages_with_lemma(lemma.id)?;
        pages.retain(|page_id| with_lemma.contains(page_id));
    }

    if pages.is_empty() {
        return Ok(Vec::new());
    }

    // Absolute relevance: sum of the page's posting ranks over the
    // surviving lemmas.
    let mut scored: Vec<(i64, f64)> = Vec::with_capacity(pages.len());
    for page_id in pages {
        let mut relevance = 0.0;
        for lemma in &lemmas {
            relevance += storage.posting_rank(page_id, lemma.id)?.unwrap_or(0.0);
        }
        scored.push((page_id, relevance));
    }

    let max_relevance = scored.iter().map(|(_, r)| *r).fold(0.0, f64::max);

    Ok(scored
        .into_iter()
        .map(|(page_id, relevance)| Candidate {
            page_id,
            site_url: site.url.clone(),
            site_name: site.name.clone(),
            relevance: relevance / max_relevance,
        })
        .collect())
}
