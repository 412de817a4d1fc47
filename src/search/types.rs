use serde::Serialize;

/// One rendered search result
#[derive(Debug, Clone, Serialize)]
pub struct SearchItem {
    /// Root URL of the site the page belongs to
    pub site: String,

    /// Display name of the site
    #[serde(rename = "siteName")]
    pub site_name: String,

    /// Page path relative to the site root
    pub uri: String,

    /// Page title, or a placeholder when the document has none
    pub title: String,

    /// Highlighted snippet of the page text
    pub snippet: String,

    /// Normalized relevance in (0, 1]; the best page of a search is 1.0
    pub relevance: f64,
}

/// One page of search results plus the total result count
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Total number of results before pagination
    pub count: usize,

    /// The requested slice of results, best first
    pub items: Vec<SearchItem>,
}

impl SearchPage {
    pub fn empty() -> Self {
        Self {
            count: 0,
            items: Vec::new(),
        }
    }
}
