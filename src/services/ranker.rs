use std::cmp::Ordering;

use regex::Regex;
use serde::Deserialize;

use crate::db::models::document_chunk::Chunk;

pub const DEFAULT_MAX_CHUNKS: usize = 3;

/// Query terms shorter than this are ignored.
const MIN_TERM_CHARS: usize = 3;

/// English only.
const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "and", "or", "but", "in", "with", "to", "for",
    "of", "as", "by", "this", "that", "it",
];

/// Tunable constants of the lexical scoring heuristic.
///
/// Missing fields fall back to the defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Per whole-word occurrence of a term.
    pub exact_match: f64,
    /// Per occurrence found only inside a longer word.
    pub partial_match: f64,
    /// Multiplied by the number of distinct terms found, when more than one.
    pub multi_term_bonus: f64,
    /// Largest boost given to the first chunk; decays linearly to zero.
    pub position_decay: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            exact_match: 3.0,
            partial_match: 1.5,
            multi_term_bonus: 2.0,
            position_decay: 0.1,
        }
    }
}

#[derive(Debug)]
struct ScoredChunk<'a> {
    chunk: &'a Chunk,
    score: f64,
    raw_score: f64,
    matched_words: usize,
}

struct QueryTerm {
    text: String,
    whole_word: Option<Regex>,
}

impl QueryTerm {
    fn new(text: String) -> Self {
        let whole_word = match Regex::new(&format!(r"\b{}\b", regex::escape(&text))) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(
                    "Word-boundary pattern for a {}-char query term failed to build, \
                     scanning without regex: {e}",
                    text.chars().count()
                );
                None
            }
        };
        Self { text, whole_word }
    }

    fn exact_matches(&self, content: &str) -> usize {
        match &self.whole_word {
            Some(re) => re.find_iter(content).count(),
            None => self.bounded_matches(content),
        }
    }

    /// Occurrences with a word boundary (`\b`) at both ends of the term.
    fn bounded_matches(&self, content: &str) -> usize {
        let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
        let starts_word = is_word(self.text.chars().next());
        let ends_word = is_word(self.text.chars().next_back());

        content
            .match_indices(self.text.as_str())
            .filter(|(start, found)| {
                let before = content[..*start].chars().next_back();
                let after = content[start + found.len()..].chars().next();
                is_word(before) != starts_word && is_word(after) != ends_word
            })
            .count()
    }

    fn substring_matches(&self, content: &str) -> usize {
        content.matches(self.text.as_str()).count()
    }
}

/// Lowercased, de-duplicated query terms with short words and stop words removed.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();

    for word in query.to_lowercase().split_whitespace() {
        if word.chars().count() < MIN_TERM_CHARS || STOP_WORDS.contains(&word) {
            continue;
        }
        if !terms.iter().any(|t| t == word) {
            terms.push(word.to_string());
        }
    }

    terms
}

/// Rank `chunks` against `query` with the default weights.
pub fn find_relevant(chunks: &[Chunk], query: &str, max_chunks: usize) -> Vec<Chunk> {
    find_relevant_with(chunks, query, max_chunks, &ScoringWeights::default())
}

/// Return up to `max_chunks` chunks ordered by lexical relevance to `query`.
///
/// Chunks that match no query term are dropped. When the query has no usable
/// terms the first `max_chunks` chunks are returned unscored, in their given
/// order. The position bonus treats the slice order as document order.
pub fn find_relevant_with(
    chunks: &[Chunk],
    query: &str,
    max_chunks: usize,
    weights: &ScoringWeights,
) -> Vec<Chunk> {
    if chunks.is_empty() {
        return Vec::new();
    }

    let terms: Vec<QueryTerm> = query_terms(query).into_iter().map(QueryTerm::new).collect();
    if terms.is_empty() {
        return chunks.iter().take(max_chunks).cloned().collect();
    }

    let mut scored = score_chunks(chunks, &terms, weights);
    scored.retain(|s| s.score > 0.0);
    scored.sort_by(compare_scored);

    if let Some(top) = scored.first() {
        tracing::debug!(
            "Ranked {} of {} chunks, top chunk {} (raw {:.2}, score {:.3})",
            scored.len(),
            chunks.len(),
            top.chunk.chunk_index,
            top.raw_score,
            top.score
        );
    }

    scored
        .into_iter()
        .take(max_chunks)
        .map(|s| s.chunk.clone())
        .collect()
}

fn score_chunks<'a>(
    chunks: &'a [Chunk],
    terms: &[QueryTerm],
    weights: &ScoringWeights,
) -> Vec<ScoredChunk<'a>> {
    let total = chunks.len() as f64;

    chunks
        .iter()
        .enumerate()
        .map(|(position, chunk)| {
            let content = chunk.content.to_lowercase();
            let word_count = content.split_whitespace().count().max(1) as f64;

            let mut raw_score = 0.0;
            let mut matched_words = 0;

            for term in terms {
                let exact = term.exact_matches(&content);
                let substring = term.substring_matches(&content);

                raw_score += exact as f64 * weights.exact_match;
                raw_score += substring.saturating_sub(exact) as f64 * weights.partial_match;

                if substring > 0 {
                    matched_words += 1;
                }
            }

            if matched_words > 1 {
                raw_score += matched_words as f64 * weights.multi_term_bonus;
            }

            let normalized = raw_score / word_count.sqrt();
            let position_bonus = 1.0 - (position as f64 / total) * weights.position_decay;

            ScoredChunk {
                chunk,
                score: normalized * position_bonus,
                raw_score,
                matched_words,
            }
        })
        .collect()
}

/// Higher score first, then more matched terms, then the earlier chunk.
fn compare_scored(a: &ScoredChunk<'_>, b: &ScoredChunk<'_>) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.matched_words.cmp(&a.matched_words))
        .then_with(|| a.chunk.chunk_index.cmp(&b.chunk.chunk_index))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(contents: &[&str]) -> Vec<Chunk> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| Chunk::new(c.to_string(), i))
            .collect()
    }

    fn indices(chunks: &[Chunk]) -> Vec<usize> {
        chunks.iter().map(|c| c.chunk_index).collect()
    }

    fn scored_for(contents: &[&str], query: &str) -> Vec<(usize, f64, f64, usize)> {
        let chunks = chunks(contents);
        let terms: Vec<QueryTerm> = query_terms(query).into_iter().map(QueryTerm::new).collect();
        score_chunks(&chunks, &terms, &ScoringWeights::default())
            .into_iter()
            .map(|s| (s.chunk.chunk_index, s.score, s.raw_score, s.matched_words))
            .collect()
    }

    #[test]
    fn test_query_terms_drop_short_and_stop_words() {
        assert_eq!(
            query_terms("What is THE role of Mitochondria in the cell, cell"),
            vec!["what", "role", "mitochondria", "cell,", "cell"]
        );
        assert!(query_terms("it is on to an").is_empty());
        assert!(query_terms("   ").is_empty());
    }

    #[test]
    fn test_exact_match_selected_and_unmatched_dropped() {
        let chunks = chunks(&["Cats are mammals", "Dogs are mammals too"]);
        let result = find_relevant(&chunks, "cats", 3);

        assert_eq!(indices(&result), vec![0]);
        assert_eq!(result[0].content, "Cats are mammals");
    }

    #[test]
    fn test_empty_query_returns_leading_chunks() {
        let chunks = chunks(&["one", "two", "three", "four", "five"]);

        assert_eq!(indices(&find_relevant(&chunks, "", 3)), vec![0, 1, 2]);
        assert_eq!(indices(&find_relevant(&chunks, "is it the", 3)), vec![0, 1, 2]);
        assert_eq!(indices(&find_relevant(&chunks, "", 10)).len(), 5);
    }

    #[test]
    fn test_empty_chunks_return_nothing() {
        assert!(find_relevant(&[], "anything useful", 3).is_empty());
        assert!(find_relevant(&[], "", 3).is_empty());
    }

    #[test]
    fn test_raw_score_components() {
        let scored = scored_for(&["Rust ownership rules"], "rust ownership");
        let (_, score, raw, matched) = scored[0];

        // two exact matches plus the two-term bonus
        assert_eq!(raw, 10.0);
        assert_eq!(matched, 2);
        assert!((score - 10.0 / 3f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_partial_match_scores_below_exact() {
        let scored = scored_for(&["category theory", "cat theory"], "cat");

        assert_eq!(scored[0].2, 1.5);
        assert_eq!(scored[1].2, 3.0);

        let chunks = chunks(&["category theory", "cat theory"]);
        assert_eq!(indices(&find_relevant(&chunks, "cat", 3)), vec![1, 0]);
    }

    #[test]
    fn test_longer_chunks_are_penalized() {
        let chunks = chunks(&[
            "photosynthesis happens in leaves and also in many other places across the plant",
            "photosynthesis in leaves",
        ]);
        assert_eq!(indices(&find_relevant(&chunks, "photosynthesis", 3)), vec![1, 0]);
    }

    #[test]
    fn test_earlier_position_breaks_equal_content() {
        let chunks = chunks(&["enzymes speed reactions", "enzymes speed reactions"]);
        let scored = scored_for(&["enzymes speed reactions", "enzymes speed reactions"], "enzymes");

        assert!(scored[0].1 > scored[1].1);
        assert_eq!(indices(&find_relevant(&chunks, "enzymes", 3)), vec![0, 1]);
    }

    #[test]
    fn test_equal_scores_prefer_lower_chunk_index() {
        let weights = ScoringWeights {
            position_decay: 0.0,
            ..ScoringWeights::default()
        };
        let mut chunks = chunks(&["atoms bond", "atoms bond"]);
        chunks.reverse();

        let result = find_relevant_with(&chunks, "atoms", 3, &weights);
        assert_eq!(indices(&result), vec![0, 1]);
    }

    #[test]
    fn test_compare_prefers_more_matched_terms_on_equal_score() {
        let first = Chunk::new("a".to_string(), 0);
        let second = Chunk::new("b".to_string(), 1);
        let fewer = ScoredChunk {
            chunk: &first,
            score: 2.0,
            raw_score: 4.0,
            matched_words: 1,
        };
        let more = ScoredChunk {
            chunk: &second,
            score: 2.0,
            raw_score: 4.0,
            matched_words: 2,
        };

        assert_eq!(compare_scored(&more, &fewer), Ordering::Less);
        assert_eq!(compare_scored(&fewer, &more), Ordering::Greater);
    }

    #[test]
    fn test_results_sorted_and_capped() {
        let chunks = chunks(&[
            "cells divide",
            "nothing relevant here",
            "cells and membranes and cells",
            "membranes protect cells",
            "cells",
        ]);

        assert_eq!(indices(&find_relevant(&chunks, "cells membranes", 2)), vec![2, 3]);
        assert_eq!(
            indices(&find_relevant(&chunks, "cells membranes", 10)),
            vec![2, 3, 4, 0]
        );
    }

    #[test]
    fn test_equal_scores_prefer_more_matched_terms() {
        let weights = ScoringWeights {
            multi_term_bonus: 0.0,
            position_decay: 0.0,
            ..ScoringWeights::default()
        };
        let chunks = chunks(&["cells cells", "cells membranes"]);

        let result = find_relevant_with(&chunks, "cells membranes", 3, &weights);
        assert_eq!(indices(&result), vec![1, 0]);
    }

    #[test]
    fn test_bounded_matches_agree_with_regex() {
        let content = "cat category cat_like cat, bobcat cat";
        for text in ["cat", "cat,"] {
            let with_regex = QueryTerm::new(text.to_string());
            let without_regex = QueryTerm {
                text: text.to_string(),
                whole_word: None,
            };
            assert_eq!(
                without_regex.exact_matches(content),
                with_regex.exact_matches(content),
                "term {text:?}"
            );
        }
        let cat = QueryTerm {
            text: "cat".to_string(),
            whole_word: None,
        };
        assert_eq!(cat.exact_matches(content), 3);
    }

    #[test]
    fn test_weights_deserialize_with_defaults() {
        let weights: ScoringWeights = serde_json::from_str(r#"{"exact_match": 5.0}"#).unwrap();
        assert_eq!(weights.exact_match, 5.0);
        assert_eq!(weights.partial_match, 1.5);
        assert_eq!(weights.position_decay, 0.1);
    }

    #[test]
    fn test_returned_chunks_keep_identity() {
        let mut chunks = chunks(&["gravity pulls", "light bends"]);
        let id = uuid::Uuid::new_v4();
        chunks[1].id = Some(id);

        let result = find_relevant(&chunks, "light", 3);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, Some(id));
    }
}
