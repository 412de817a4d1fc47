//! Snippet generation and query-word highlighting

use crate::lemma::LemmaExtractor;
use std::collections::HashSet;

/// Maximum snippet length in characters, ellipsis included
const MAX_SNIPPET_LEN: usize = 300;

/// Maximum number of sentences collected into one snippet
const MAX_SENTENCES: usize = 3;

/// Builds a highlighted snippet for one result page
///
/// The page text is scanned sentence by sentence; up to three sentences
/// whose own lemmas intersect the query are kept (falling back to the
/// first sentence when none match). Every word whose lemma matches a
/// query lemma is wrapped in `<b>` markers, and the final string is
/// truncated to 300 characters.
pub fn generate_snippet(
    text: &str,
    query_lemmas: &HashSet<String>,
    extractor: &LemmaExtractor,
) -> String {
    let sentences = select_sentences(text, query_lemmas, extractor);
    let joined = sentences.join(". ");
    let highlighted = highlight_query_words(&joined, query_lemmas, extractor);
    truncate(&highlighted, MAX_SNIPPET_LEN)
}

/// Picks the sentences the snippet is built from
fn select_sentences<'a>(
    text: &'a str,
    query_lemmas: &HashSet<String>,
    extractor: &LemmaExtractor,
) -> Vec<&'a str> {
    let mut selected = Vec::new();
    let mut first_sentence = None;

    for sentence in text.split(". ") {
        if first_sentence.is_none() {
            first_sentence = Some(sentence);
        }

        let contains_query_lemma = extractor
            .extract(sentence)
            .into_keys()
            .any(|lemma| query_lemmas.contains(&lemma));

        if contains_query_lemma {
            selected.push(sentence);
            if selected.len() >= MAX_SENTENCES {
                break;
            }
        }
    }

    if selected.is_empty() {
        if let Some(first) = first_sentence {
            selected.push(first);
        }
    }

    selected
}

/// Wraps every word matching a query lemma in emphasis markers
fn highlight_query_words(
    text: &str,
    query_lemmas: &HashSet<String>,
    extractor: &LemmaExtractor,
) -> String {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|word| {
            let cleaned: String = word
                .chars()
                .filter(|c| c.is_alphabetic())
                .collect::<String>()
                .to_lowercase();

            let matches = !cleaned.is_empty()
                && extractor
                    .extract(&cleaned)
                    .into_keys()
                    .any(|lemma| query_lemmas.contains(&lemma));

            if matches {
                format!("<b>{}</b>", word)
            } else {
                word.to_string()
            }
        })
        .collect();

    words.join(" ")
}

fn truncate(snippet: &str, max_len: usize) -> String {
    if snippet.chars().count() > max_len {
        let kept: String = snippet.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    } else {
        snippet.to_string()
    }
}
