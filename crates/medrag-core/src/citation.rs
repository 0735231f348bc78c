//! Citation extraction from generated answer text.
//!
//! Citations are bracketed `[label: reference]` spans. Spans are matched
//! lazily and without overlap, so nested brackets are not supported: in
//! `[a [b: c]]` the span is `a [b: c`. Spans without a colon are skipped.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::Citation;

fn citation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[(.*?)\]").expect("static citation pattern"))
}

/// Extract citations in order of appearance. Duplicates are kept.
///
/// ```
/// use medrag_core::citation::extract;
///
/// let found = extract("See [Gray's Anatomy: p.102] and [Merck Manual: ch.4].");
/// assert_eq!(found.len(), 2);
/// assert_eq!(found[0].label, "Gray's Anatomy");
/// assert_eq!(found[1].reference, "ch.4");
/// ```
pub fn extract(answer_text: &str) -> Vec<Citation> {
    citation_pattern()
        .captures_iter(answer_text)
        .filter_map(|caps| caps.get(1).and_then(|m| parse_span(m.as_str())))
        .collect()
}

/// Split one bracket body at its first colon. Colons after the first stay
/// in the reference.
pub fn parse_span(inner: &str) -> Option<Citation> {
    let (label, reference) = inner.split_once(':')?;
    Some(Citation {
        label: label.trim().to_string(),
        reference: reference.trim().to_string(),
    })
}

/// Citations whose label or reference names one of `known_sources`
/// (case-insensitive substring match).
pub fn grounded_citations<'a, S: AsRef<str>>(
    citations: &'a [Citation],
    known_sources: &[S],
) -> Vec<&'a Citation> {
    let sources: Vec<String> = known_sources
        .iter()
        .map(|s| s.as_ref().trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    citations
        .iter()
        .filter(|c| {
            let label = c.label.to_lowercase();
            let reference = c.reference.to_lowercase();
            sources
                .iter()
                .any(|s| label.contains(s.as_str()) || reference.contains(s.as_str()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cite(label: &str, reference: &str) -> Citation {
        Citation {
            label: label.to_string(),
            reference: reference.to_string(),
        }
    }

    #[test]
    fn test_extract_two_citations() {
        let found = extract("Text [Gray's Anatomy: p.102] more [Merck Manual: ch.4]");
        assert_eq!(
            found,
            vec![cite("Gray's Anatomy", "p.102"), cite("Merck Manual", "ch.4")]
        );
    }

    #[test]
    fn test_span_without_colon_skipped() {
        assert!(extract("text [no-colon-bracket]").is_empty());
        assert!(extract("no brackets at all").is_empty());
    }

    #[test]
    fn test_reference_keeps_later_colons() {
        let found = extract("[Nelson Textbook of Pediatrics: Chapter 3: Fever]");
        assert_eq!(
            found,
            vec![cite("Nelson Textbook of Pediatrics", "Chapter 3: Fever")]
        );
    }

    #[test]
    fn test_duplicates_kept_in_order() {
        let found = extract("[A: 1] then [B: 2] then [A: 1]");
        assert_eq!(found, vec![cite("A", "1"), cite("B", "2"), cite("A", "1")]);
    }

    #[test]
    fn test_whitespace_trimmed() {
        let found = extract("[  Nelson :   p. 45  ]");
        assert_eq!(found, vec![cite("Nelson", "p. 45")]);
    }

    #[test]
    fn test_nested_brackets_match_lazily() {
        let found = extract("[a [b: c]]");
        assert_eq!(found, vec![cite("a [b", "c")]);
    }

    #[test]
    fn test_grounded_citations_filters_unknown_sources() {
        let citations = vec![
            cite("Nelson Textbook of Pediatrics", "Fever"),
            cite("Merck Manual", "ch.4"),
            cite("Guideline", "nelson textbook of pediatrics, p. 12"),
        ];
        let grounded = grounded_citations(&citations, &["Nelson Textbook of Pediatrics"]);
        assert_eq!(grounded.len(), 2);
        assert_eq!(grounded[0].label, "Nelson Textbook of Pediatrics");
        assert_eq!(grounded[1].label, "Guideline");
    }
}
