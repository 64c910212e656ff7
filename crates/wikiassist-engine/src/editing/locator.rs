//! Whitespace-tolerant sentence lookup.
//!
//! Feedback names the sentence it is about, but the document may have drifted
//! since it was reviewed: spaces collapsed or doubled, a line break inserted.
//! The locator accepts that drift and nothing else. Every word must still be
//! present, in order, with only whitespace between them.

use std::ops::Range;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::editing::host::DocPos;
use crate::editing::offset_index::OffsetIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchConfidence {
    /// The matched text equals the sentence byte for byte.
    Exact,
    /// Same words in the same order, different whitespace.
    WhitespaceNormalized,
}

/// A match in flat-text character offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatSpan {
    pub start: usize,
    pub end: usize,
    pub confidence: MatchConfidence,
}

impl FlatSpan {
    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// A match translated into document positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedSpan {
    pub from: DocPos,
    pub to: DocPos,
    pub confidence: MatchConfidence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("sentence not found in document")]
pub struct NotFound;

/// Build the `word\s+word\s+...` pattern for a sentence; `None` when it has no words.
pub fn sentence_pattern(sentence: &str) -> Option<Regex> {
    let words: Vec<String> = sentence.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    match Regex::new(&words.join(r"\s+")) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("could not compile sentence pattern: {e}");
            None
        }
    }
}

/// Find the first occurrence of `sentence` in `flat_text`.
pub fn locate(flat_text: &str, sentence: &str) -> Result<FlatSpan, NotFound> {
    let pattern = sentence_pattern(sentence).ok_or(NotFound)?;
    let m = pattern.find(flat_text).ok_or(NotFound)?;

    let start = flat_text[..m.start()].chars().count();
    let end = start + m.as_str().chars().count();
    let confidence = if m.as_str() == sentence {
        MatchConfidence::Exact
    } else {
        MatchConfidence::WhitespaceNormalized
    };

    Ok(FlatSpan {
        start,
        end,
        confidence,
    })
}

/// Locate a sentence and translate the match into document positions.
pub fn locate_in(index: &OffsetIndex, sentence: &str) -> Result<LocatedSpan, NotFound> {
    let span = locate(index.flat_text(), sentence)?;
    let range = index.range_to_positions(span.range());
    Ok(LocatedSpan {
        from: range.start,
        to: range.end,
        confidence: span.confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::{Block, RichDocument};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn tolerates_whitespace_drift() {
        let flat = "Climate   change\nis important.";
        let span = locate(flat, "Climate change is important.").unwrap();
        assert_eq!(span.start, 0);
        assert_eq!(span.end, flat.chars().count());
        assert_eq!(span.confidence, MatchConfidence::WhitespaceNormalized);
    }

    #[test]
    fn does_not_guess_at_different_words() {
        assert_eq!(locate("The sky is blue.", "The sky is green."), Err(NotFound));
    }

    #[test]
    fn exact_match_is_reported_as_exact() {
        let span = locate("Intro. The sky is blue.", "The sky is blue.").unwrap();
        assert_eq!(span.range(), 7..23);
        assert_eq!(span.confidence, MatchConfidence::Exact);
    }

    #[test]
    fn first_occurrence_wins() {
        let span = locate("Yes. Yes. Yes.", "Yes.").unwrap();
        assert_eq!(span.range(), 0..4);
    }

    #[rstest]
    #[case("")]
    #[case("   \n\t ")]
    fn blank_sentences_are_not_found(#[case] sentence: &str) {
        assert_eq!(locate("anything at all", sentence), Err(NotFound));
    }

    #[rstest]
    #[case("costs $5 (approx.)", "It costs $5 (approx.) today")]
    #[case("a+b*c?", "solve a+b*c? now")]
    #[case("[citation needed]", "Fact [citation needed].")]
    fn regex_metacharacters_match_literally(#[case] sentence: &str, #[case] flat: &str) {
        assert!(locate(flat, sentence).is_ok());
    }

    #[test]
    fn words_may_not_be_inserted_between() {
        assert_eq!(
            locate("The sky is very blue.", "The sky is blue."),
            Err(NotFound)
        );
    }

    #[test]
    fn offsets_are_in_characters() {
        let span = locate("Über café. Next one.", "Next one.").unwrap();
        assert_eq!(span.range(), 11..20);
    }

    #[test]
    fn locate_in_maps_across_paragraphs() {
        let doc = RichDocument::new(vec![
            Block::paragraph("Climate change"),
            Block::paragraph("is important."),
        ]);
        let index = OffsetIndex::build(&doc);
        let located = locate_in(&index, "Climate change is important.").unwrap();
        // first paragraph content starts at 1; second ends at 17 + 13
        assert_eq!(located.from, DocPos(1));
        assert_eq!(located.to, DocPos(30));
    }
}
