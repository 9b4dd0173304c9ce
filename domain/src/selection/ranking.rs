//! Deterministic keyword-overlap ranking.
//!
//! Scores are the number of distinct significant words a topic shares with a
//! tool's capabilities text and keywords. Ties keep catalog order, so the
//! same catalog and topic always produce the same ranking.

use crate::tool::entities::ToolDescriptor;
use std::collections::BTreeSet;

/// Words that carry no signal when matching topics against tools.
const STOPWORDS: &[&str] = &[
    "about", "after", "also", "and", "any", "are", "been", "between", "but", "can", "could",
    "does", "for", "from", "has", "have", "how", "into", "its", "more", "not", "of", "on",
    "or", "our", "over", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "this", "those", "through", "use", "used", "using", "was", "were", "what",
    "when", "where", "which", "while", "who", "why", "will", "with", "within", "would", "you",
    "your",
];

/// Minimum length (in characters) for a word to count.
const MIN_WORD_LEN: usize = 3;

/// Split text into lowercase significant words.
///
/// Words are maximal runs of alphanumeric characters; short words and
/// stopwords are dropped.
pub fn significant_words(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= MIN_WORD_LEN)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// Words a tool can be matched on: capabilities text plus every keyword.
pub fn tool_words(tool: &ToolDescriptor) -> BTreeSet<String> {
    let mut words = significant_words(&tool.capabilities_text);
    for keyword in &tool.keywords {
        words.extend(significant_words(keyword));
    }
    words
}

/// Overlap score of one tool against a pre-tokenized topic.
pub fn overlap_score(topic_words: &BTreeSet<String>, tool: &ToolDescriptor) -> usize {
    let words = tool_words(tool);
    topic_words.intersection(&words).count()
}

/// Rank tools by keyword overlap with `topic`, best first.
///
/// Returns `(index, score)` pairs where `index` refers to the input slice.
/// The sort is stable: equal scores keep their input order.
pub fn rank_by_keyword_overlap<T: AsRef<ToolDescriptor>>(
    topic: &str,
    tools: &[T],
) -> Vec<(usize, usize)> {
    let topic_words = significant_words(topic);
    let mut scored: Vec<(usize, usize)> = tools
        .iter()
        .enumerate()
        .map(|(i, t)| (i, overlap_score(&topic_words, t.as_ref())))
        .collect();
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored
}
