//! Transcript text utilities: normalization and extractive summaries.

use std::collections::HashMap;

/// Collapse runs of spaces and tabs, trim line ends, and squeeze blank
/// lines down to a single paragraph break.
pub fn normalize_text(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_pending = false;

    for line in text.lines() {
        let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            blank_pending = !lines.is_empty();
        } else {
            if blank_pending {
                lines.push(String::new());
                blank_pending = false;
            }
            lines.push(collapsed);
        }
    }

    lines.join("\n")
}

/// Pick the highest-scoring sentences by word frequency, keeping original
/// order. Returns `None` when the text has nothing to summarize.
pub fn summarize_text(text: &str, max_sentences: usize) -> Option<String> {
    let sentences = split_sentences(text);
    if sentences.is_empty() || max_sentences == 0 {
        return None;
    }
    if sentences.len() <= max_sentences {
        return Some(sentences.join(" "));
    }

    let mut frequencies: HashMap<String, usize> = HashMap::new();
    for word in words_of(text) {
        *frequencies.entry(word).or_insert(0) += 1;
    }

    let mut scored: Vec<(usize, usize)> = sentences
        .iter()
        .enumerate()
        .map(|(idx, sentence)| {
            let score = words_of(sentence)
                .map(|w| frequencies.get(&w).copied().unwrap_or(0))
                .sum();
            (idx, score)
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut picked: Vec<usize> = scored.iter().take(max_sentences).map(|(idx, _)| *idx).collect();
    picked.sort_unstable();

    Some(
        picked
            .into_iter()
            .map(|idx| sentences[idx].as_str())
            .collect::<Vec<_>>()
            .join(" "),
    )
}

fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// Lowercased words longer than three characters; shorter ones are mostly
/// stopwords and would dominate the frequency counts.
fn words_of(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(|w| w.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_text("a   b\t c"), "a b c");
        assert_eq!(normalize_text("  leading and trailing  "), "leading and trailing");
    }

    #[test]
    fn test_normalize_squeezes_blank_lines() {
        assert_eq!(normalize_text("one\n\n\n\ntwo"), "one\n\ntwo");
        assert_eq!(normalize_text("\n\nstart"), "start");
    }

    #[test]
    fn test_summarize_short_text_returned_whole() {
        let text = "First sentence. Second sentence.";
        assert_eq!(summarize_text(text, 6).unwrap(), text);
    }

    #[test]
    fn test_summarize_empty_is_none() {
        assert!(summarize_text("", 6).is_none());
        assert!(summarize_text("   ", 6).is_none());
    }

    #[test]
    fn test_summarize_picks_frequent_topics_in_order() {
        let text = "Rust ownership makes memory safety simple. \
                    The weather was nice yesterday. \
                    Ownership and borrowing define memory safety in Rust. \
                    Lunch happened around noon. \
                    Memory safety without garbage collection is the Rust pitch.";

        let summary = summarize_text(text, 2).unwrap();
        assert!(summary.contains("memory safety"));
        // Picked sentences keep their original relative order.
        let first = summary.find("Ownership and borrowing").or_else(|| summary.find("Rust ownership"));
        let last = summary.find("garbage collection");
        if let (Some(first), Some(last)) = (first, last) {
            assert!(first < last);
        }
    }

    #[test]
    fn test_summarize_caps_sentence_count() {
        let text = "One thing here. Two things there. Three things everywhere. \
                    Four things somewhere. Five things nowhere.";
        let summary = summarize_text(text, 2).unwrap();
        let count = summary.matches('.').count();
        assert_eq!(count, 2);
    }
}
