//! Lemma extraction
//!
//! Turns raw text into a mapping of normalized word stems ("lemmas") to
//! their occurrence counts. Tokens are NFKC-normalized, lowercased,
//! stripped of stop-words and short tokens, then stemmed. This is the
//! single analyzer used by both the indexing and the query path, so the
//! two always agree on what a lemma is.

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashMap;
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Tokens shorter than this are dropped before stemming
const MIN_TOKEN_LEN: usize = 3;

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves",
        ];
        words.iter().copied().collect()
    };
}

/// Morphological analyzer shared by the indexer and the search engine
#[derive(Debug, Default, Clone)]
pub struct LemmaExtractor;

impl LemmaExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts lemmas and their occurrence counts from `text`
    ///
    /// Deterministic; empty input yields an empty map.
    pub fn extract(&self, text: &str) -> HashMap<String, u32> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut lemmas: HashMap<String, u32> = HashMap::new();

        for mat in TOKEN_RE.find_iter(&normalized) {
            let token = mat.as_str();
            if STOPWORDS.contains(token) {
                continue;
            }
            if token.chars().count() < MIN_TOKEN_LEN {
                continue;
            }
            let stem = STEMMER.stem(token).to_string();
            *lemmas.entry(stem).or_insert(0) += 1;
        }

        lemmas
    }
}
