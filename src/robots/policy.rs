//! Robots.txt fetching and prefix matching

use reqwest::Client;
use std::time::Duration;

/// Per-site robots policy, shared by every crawl task of one site crawl
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    site_url: String,
    disallowed: Vec<String>,
}

impl RobotsPolicy {
    /// Fetches and parses `<site_url>/robots.txt`
    ///
    /// Any failure (network, timeout, non-success status) is logged and
    /// results in an empty policy that allows everything. Loading robots
    /// rules is never a fatal condition for a crawl.
    pub async fn load(client: &Client, site_url: &str, timeout: Duration) -> Self {
        let robots_url = format!("{}/robots.txt", site_url);

        let content = match Self::fetch(client, &robots_url, timeout).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!("Could not load robots.txt for {}: {}", site_url, e);
                String::new()
            }
        };

        Self::from_rules(site_url, &content)
    }

    /// Builds a policy from already-fetched robots.txt content
    pub fn from_rules(site_url: &str, content: &str) -> Self {
        Self {
            site_url: site_url.to_string(),
            disallowed: parse_disallowed_paths(content),
        }
    }

    async fn fetch(client: &Client, robots_url: &str, timeout: Duration) -> Result<String, reqwest::Error> {
        let response = client
            .get(robots_url)
            .timeout(timeout)
            .send()
            .await?
            .error_for_status()?;
        response.text().await
    }

    /// Checks whether `url` may be fetched under this policy
    ///
    /// The site root is stripped from the URL (an empty remainder is the
    /// root path "/"); the URL is denied when any recorded `Disallow`
    /// value is a prefix of the remaining path.
    pub fn is_allowed(&self, url: &str) -> bool {
        let path = url.strip_prefix(&self.site_url).unwrap_or(url);
        let path = if path.is_empty() { "/" } else { path };

        !self
            .disallowed
            .iter()
            .any(|prefix| path.starts_with(prefix))
    }

    /// Number of recorded disallow rules
    pub fn rule_count(&self) -> usize {
        self.disallowed.len()
    }
}

/// Collects `Disallow` values from the `User-agent: *` group
fn parse_disallowed_paths(content: &str) -> Vec<String> {
    let mut disallowed = Vec::new();
    let mut relevant_group = false;

    for line in content.lines() {
        let line = line.trim();
        let lower = line.to_lowercase();

        if let Some(agent) = lower.strip_prefix("user-agent:") {
            relevant_group = agent.trim() == "*";
        } else if relevant_group {
            if lower.starts_with("disallow:") {
                let value = line["disallow:".len()..].trim();
                if !value.is_empty() {
                    disallowed.push(value.to_string());
                }
            }
        }
    }

    disallowed
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://example.com";

    #[test]
    fn test_denies_recorded_prefix() {
        let policy = RobotsPolicy::from_rules(SITE, "User-agent: *\nDisallow: /admin");
        assert!(!policy.is_allowed("https://example.com/admin"));
        assert!(!policy.is_allowed("https://example.com/admin/users"));
        assert!(policy.is_allowed("https://example.com/public"));
    }

    #[test]
    fn test_disallow_all() {
        let policy = RobotsPolicy::from_rules(SITE, "User-agent: *\nDisallow: /");
        assert!(!policy.is_allowed("https://example.com"));
        assert!(!policy.is_allowed("https://example.com/anything"));
    }

    #[test]
    fn test_root_url_maps_to_root_path() {
        let policy = RobotsPolicy::from_rules(SITE, "User-agent: *\nDisallow: /private");
        // Root URL strips to the empty string, normalized to "/"
        assert!(policy.is_allowed("https://example.com"));
    }

    #[test]
    fn test_other_agent_group_ignored() {
        let content = "User-agent: OtherBot\nDisallow: /\n\nUser-agent: *\nDisallow: /secret";
        let policy = RobotsPolicy::from_rules(SITE, content);
        assert!(policy.is_allowed("https://example.com/page"));
        assert!(!policy.is_allowed("https://example.com/secret"));
    }

    #[test]
    fn test_rules_after_star_group_ends() {
        let content = "User-agent: *\nDisallow: /a\n\nUser-agent: OtherBot\nDisallow: /b";
        let policy = RobotsPolicy::from_rules(SITE, content);
        assert!(!policy.is_allowed("https://example.com/a"));
        assert!(policy.is_allowed("https://example.com/b"));
    }

    #[test]
    fn test_blank_disallow_ignored() {
        let policy = RobotsPolicy::from_rules(SITE, "User-agent: *\nDisallow:");
        assert_eq!(policy.rule_count(), 0);
        assert!(policy.is_allowed("https://example.com/anything"));
    }

    #[test]
    fn test_empty_content_allows_everything() {
        let policy = RobotsPolicy::from_rules(SITE, "");
        assert!(policy.is_allowed("https://example.com/any/path"));
    }

    #[test]
    fn test_case_insensitive_directives() {
        let policy = RobotsPolicy::from_rules(SITE, "USER-AGENT: *\nDISALLOW: /Upper");
        assert!(!policy.is_allowed("https://example.com/Upper/page"));
    }

    #[tokio::test]
    async fn test_unreachable_robots_fails_open() {
        let client = Client::new();
        // Nothing listens on this port; the fetch fails and the policy allows all
        let policy = RobotsPolicy::load(&client, "http://127.0.0.1:1", Duration::from_millis(200)).await;
        assert_eq!(policy.rule_count(), 0);
        assert!(policy.is_allowed("http://127.0.0.1:1/anything"));
    }
}
