//! Sentence-local TF-IDF weighting.
//!
//! The sentences of one document are the whole corpus. Terms are lowercased runs of at least two
//! word characters, term frequency is the raw count, inverse document frequency is smoothed as
//! `ln((1 + n) / (1 + df)) + 1`, and every sentence vector is L2-normalised before its weights
//! are summed into a single importance score.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static TERM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("term pattern is valid"));

/// Score every sentence by the sum of its normalised TF-IDF weights.
///
/// Sentences without any term score `0.0`.
pub(crate) fn sentence_scores(sentences: &[&str]) -> Vec<f64> {
    let term_counts: Vec<BTreeMap<String, usize>> =
        sentences.iter().map(|sentence| count_terms(sentence)).collect();

    let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
    for counts in &term_counts {
        for term in counts.keys() {
            *document_frequency.entry(term.as_str()).or_default() += 1;
        }
    }

    let corpus_size = sentences.len() as f64;
    term_counts
        .iter()
        .map(|counts| {
            let weights: Vec<f64> = counts
                .iter()
                .map(|(term, &count)| {
                    let df = document_frequency[term.as_str()] as f64;
                    count as f64 * (((1.0 + corpus_size) / (1.0 + df)).ln() + 1.0)
                })
                .collect();
            let norm = weights.iter().map(|weight| weight * weight).sum::<f64>().sqrt();
            if norm == 0.0 {
                0.0
            } else {
                weights.iter().sum::<f64>() / norm
            }
        })
        .collect()
}

fn count_terms(sentence: &str) -> BTreeMap<String, usize> {
    let lowered = sentence.to_lowercase();
    let mut counts = BTreeMap::new();
    for term in TERM_PATTERN.find_iter(&lowered) {
        *counts.entry(term.as_str().to_string()).or_default() += 1;
    }
    counts
}
