//! Index statistics
//!
//! Aggregates per-site and total counts from storage for the
//! statistics endpoint.

use crate::storage::{SqliteStorage, Storage};
use crate::LumenError;
use chrono::DateTime;
use serde::Serialize;
use std::sync::{Arc, Mutex};

/// Aggregate totals over all sites
#[derive(Debug, Clone, Serialize)]
pub struct TotalStatistics {
    pub sites: usize,
    pub pages: u64,
    pub lemmas: u64,
    /// Whether an indexing run is active right now
    pub indexing: bool,
}

/// Statistics for one site
#[derive(Debug, Clone, Serialize)]
pub struct DetailedStatisticsItem {
    pub url: String,
    pub name: String,
    pub status: String,
    /// Epoch seconds of the last status change
    #[serde(rename = "statusTime")]
    pub status_time: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub pages: u64,
    pub lemmas: u64,
}

/// The full statistics payload
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsData {
    pub total: TotalStatistics,
    pub detailed: Vec<DetailedStatisticsItem>,
}

/// Collects statistics for every persisted site
pub fn get_statistics(
    storage: &Arc<Mutex<SqliteStorage>>,
    indexing: bool,
) -> Result<StatisticsData, LumenError> {
    let storage = storage.lock().unwrap();
    let sites = storage.all_sites()?;

    let mut detailed = Vec::with_capacity(sites.len());
    let mut total_pages = 0;
    let mut total_lemmas = 0;

    for site in &sites {
        let pages = storage.count_pages_by_site(site.id)?;
        let lemmas = storage.count_lemmas_by_site(site.id)?;
        total_pages += pages;
        total_lemmas += lemmas;

        let status_time = DateTime::parse_from_rfc3339(&site.status_time)
            .map(|t| t.timestamp())
            .unwrap_or(0);

        detailed.push(DetailedStatisticsItem {
            url: site.url.clone(),
            name: site.name.clone(),
            status: site.status.to_string(),
            status_time,
            error: site.last_error.clone(),
            pages,
            lemmas,
        });
    }

    Ok(StatisticsData {
        total: TotalStatistics {
            sites: sites.len(),
            pages: total_pages,
            lemmas: total_lemmas,
            indexing,
        },
        detailed,
    })
}
