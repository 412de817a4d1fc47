//! Search engine
//!
//! Answers ranked keyword queries against the persisted index. A query
//! goes through lemma extraction, per-site frequency filtering,
//! rarest-first posting intersection, additive relevance scoring with
//! per-search normalization, pagination, and snippet rendering.

mod engine;
mod snippet;
mod types;

pub use engine::SearchEngine;
pub use types::{SearchItem, SearchPage};
