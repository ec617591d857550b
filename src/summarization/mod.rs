//! Extractive summarization under a word budget.
//!
//! Summaries are built from whole source sentences. Sentences are ranked by a TF-IDF score
//! computed against the other sentences of the same document, picked greedily until the budget
//! is exhausted, and emitted in their original order.

mod sentences;
mod tfidf;

pub(crate) use sentences::count_words;
use sentences::split_sentences;
use tfidf::sentence_scores;

/// Interface implemented by summarization strategies.
pub trait TextSummarizer: Send + Sync {
    /// Reduce `text` to at most `max_words` words.
    fn summarize(&self, text: &str, max_words: usize) -> String;
}

/// Extractive summarizer ranking sentences by their sentence-local TF-IDF weight.
#[derive(Debug, Clone, Copy, Default)]
pub struct TfidfSummarizer;

impl TfidfSummarizer {
    /// Construct a new summarizer.
    pub const fn new() -> Self {
        Self
    }
}

struct RankedSentence<'a> {
    position: usize,
    text: &'a str,
    score: f64,
    word_count: usize,
}

impl TextSummarizer for TfidfSummarizer {
    /// Texts that already fit the budget are returned verbatim. Otherwise sentences are visited
    /// once in descending score order and kept whenever they still fit; a sentence longer than
    /// the whole budget is never kept, so the result may be empty.
    fn summarize(&self, text: &str, max_words: usize) -> String {
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return String::new();
        }

        let total_words: usize = sentences.iter().map(|sentence| count_words(sentence)).sum();
        if total_words <= max_words {
            return text.to_string();
        }

        let scores = sentence_scores(&sentences);
        let mut ranked: Vec<RankedSentence<'_>> = sentences
            .iter()
            .copied()
            .zip(scores)
            .enumerate()
            .map(|(position, (sentence, score))| RankedSentence {
                position,
                text: sentence,
                score,
                word_count: count_words(sentence),
            })
            .collect();
        // Stable: equal scores keep source order.
        ranked.sort_by(|left, right| right.score.total_cmp(&left.score));

        let mut selected = Vec::new();
        let mut used_words = 0usize;
        for sentence in ranked {
            if used_words + sentence.word_count <= max_words {
                used_words += sentence.word_count;
                selected.push(sentence);
            }
        }

        selected.sort_by_key(|sentence| sentence.position);
        tracing::trace!(
            sentences = sentences.len(),
            selected = selected.len(),
            used_words,
            max_words,
            "Built extractive summary"
        );

        selected
            .iter()
            .map(|sentence| sentence.text)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
