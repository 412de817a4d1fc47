//! HTTP fetcher implementation
//!
//! Builds the shared HTTP client and performs page fetches. A non-success
//! status code is data, not an error: the page is persisted with whatever
//! code the server answered. Only transport-level failures surface as
//! errors, and those are absorbed by the calling crawl task.

use crate::config::UserAgentConfig;
use crate::LumenError;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;

/// Result of a successful page fetch
#[derive(Debug)]
pub struct FetchedPage {
    /// HTTP status code
    pub status_code: u16,
    /// Raw response body
    pub body: String,
}

/// Builds the HTTP client shared by all crawl tasks
///
/// The User-Agent identifies the crawler and how to reach its operator:
/// `name/version (+contact-url; contact-email)`.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(5))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a single page
pub async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage, LumenError> {
    let response = client.get(url).send().await.map_err(|source| LumenError::Http {
        url: url.to_string(),
        source,
    })?;

    let status_code = response.status().as_u16();
    let body = response.text().await.map_err(|source| LumenError::Http {
        url: url.to_string(),
        source,
    })?;

    Ok(FetchedPage { status_code, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user_agent() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&test_user_agent(), Duration::from_secs(10));
        assert!(client.is_ok());
    }

    #[test]
    fn test_user_agent_header_format() {
        let value = test_user_agent().header_value();
        assert_eq!(value, "TestBot/1.0 (+https://example.com/about; admin@example.com)");
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_is_error() {
        let client = build_http_client(&test_user_agent(), Duration::from_millis(200)).unwrap();
        let result = fetch_page(&client, "http://127.0.0.1:1/").await;
        assert!(result.is_err());
    }
}
