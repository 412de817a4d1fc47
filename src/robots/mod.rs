//! Robots.txt policy
//!
//! Each site crawl loads `<root>/robots.txt` once and keeps the parsed
//! policy for the lifetime of the crawl. Only the `User-agent: *` group
//! is honored, and only its `Disallow` directives; a URL is denied when
//! its site-relative path starts with any recorded prefix. An
//! unreachable or unparseable robots.txt means the site is fully
//! allowed (fail-open).

mod policy;

pub use policy::RobotsPolicy;
