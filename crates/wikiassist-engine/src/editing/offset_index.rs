//! Flat character stream over a structured document.
//!
//! The review service reports character offsets into plain text. This index
//! flattens a [`DocumentHost`] into that plain text, one token per text run
//! plus one synthetic `"\n"` between consecutive text blocks, and maps flat
//! offsets back to [`DocPos`] coordinates.
//!
//! Offsets count Unicode scalar values, not bytes.

use std::ops::Range;

use crate::editing::host::{DocPos, DocumentHost, Visit};

/// One entry of the flat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatToken {
    pub text: String,
    /// Start of the run, or for synthetic tokens the start of the following content.
    pub document_position: DocPos,
    pub is_synthetic: bool,
}

impl FlatToken {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// The index was built for an older document generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("offset index built at generation {built} but document is at {current}")]
pub struct StaleIndex {
    pub built: u64,
    pub current: u64,
}

/// Flat text, its tokens, and the document generation they were built from.
#[derive(Debug, Clone)]
pub struct OffsetIndex {
    flat_text: String,
    tokens: Vec<FlatToken>,
    /// Flat offset where each token starts.
    starts: Vec<usize>,
    char_len: usize,
    end_position: DocPos,
    generation: u64,
}

impl OffsetIndex {
    pub fn build<H: DocumentHost + ?Sized>(host: &H) -> Self {
        let mut tokens: Vec<FlatToken> = Vec::new();
        let mut seen_textblock = false;
        let mut end_position = DocPos(0);

        host.visit(&mut |visit| match visit {
            Visit::EnterBlock {
                textblock: true,
                pos,
            } => {
                let content_start = pos.advance(1);
                if seen_textblock {
                    tokens.push(FlatToken {
                        text: "\n".to_string(),
                        document_position: content_start,
                        is_synthetic: true,
                    });
                }
                seen_textblock = true;
                end_position = content_start;
            }
            Visit::Text { text, pos } if !text.is_empty() => {
                tokens.push(FlatToken {
                    text: text.to_string(),
                    document_position: pos,
                    is_synthetic: false,
                });
            }
            Visit::LeaveBlock {
                textblock: true,
                pos,
            } => {
                end_position = DocPos(pos.0.saturating_sub(1));
            }
            _ => {}
        });

        let mut starts = Vec::with_capacity(tokens.len());
        let mut flat_text = String::new();
        let mut char_len = 0;
        for token in &tokens {
            starts.push(char_len);
            char_len += token.char_len();
            flat_text.push_str(&token.text);
        }

        log::debug!(
            "built offset index: {} tokens, {} chars, generation {}",
            tokens.len(),
            char_len,
            host.version()
        );

        Self {
            flat_text,
            tokens,
            starts,
            char_len,
            end_position,
            generation: host.version(),
        }
    }

    pub fn flat_text(&self) -> &str {
        &self.flat_text
    }

    pub fn tokens(&self) -> &[FlatToken] {
        &self.tokens
    }

    /// Length of the flat text in characters.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Position used when an offset runs past the end of the flat text.
    pub fn end_position(&self) -> DocPos {
        self.end_position
    }

    pub fn is_current<H: DocumentHost + ?Sized>(&self, host: &H) -> bool {
        self.generation == host.version()
    }

    pub fn ensure_current<H: DocumentHost + ?Sized>(&self, host: &H) -> Result<(), StaleIndex> {
        if self.is_current(host) {
            Ok(())
        } else {
            Err(StaleIndex {
                built: self.generation,
                current: host.version(),
            })
        }
    }

    /// Map a flat offset to a document position.
    ///
    /// An offset on a synthetic boundary maps to the start of the following
    /// content; an offset past the end clamps to the end of the document.
    pub fn position_from_offset(&self, offset: usize) -> DocPos {
        if offset >= self.char_len {
            return self.end_position;
        }
        let i = self.starts.partition_point(|&s| s <= offset) - 1;
        self.position_in_token(i, offset)
    }

    /// Map the exclusive end of a flat range to a document position.
    ///
    /// An offset sitting exactly at the end of a run maps to the end of that
    /// run rather than into whatever follows it.
    pub fn position_from_end_offset(&self, offset: usize) -> DocPos {
        if offset == 0 || self.tokens.is_empty() {
            return self.position_from_offset(offset);
        }
        if offset > self.char_len {
            return self.end_position;
        }
        let i = self.starts.partition_point(|&s| s < offset) - 1;
        self.position_in_token(i, offset)
    }

    /// Map a half-open flat range to a half-open document range.
    pub fn range_to_positions(&self, range: Range<usize>) -> Range<DocPos> {
        self.position_from_offset(range.start)..self.position_from_end_offset(range.end)
    }

    /// Map a document position back to a flat offset.
    ///
    /// Positions outside text content map to the nearest following content.
    pub fn offset_from_position(&self, pos: DocPos) -> usize {
        for (token, &start) in self.tokens.iter().zip(&self.starts) {
            if token.is_synthetic {
                continue;
            }
            let from = token.document_position;
            if from <= pos && pos.0 <= from.0 + token.char_len() {
                return start + (pos.0 - from.0);
            }
        }
        self.tokens
            .iter()
            .zip(&self.starts)
            .find(|(token, _)| token.document_position >= pos)
            .map_or(self.char_len, |(token, &start)| {
                if token.is_synthetic { start + 1 } else { start }
            })
    }

    /// Whether a flat range includes a synthetic block boundary.
    pub fn crosses_boundary(&self, range: Range<usize>) -> bool {
        self.tokens
            .iter()
            .zip(&self.starts)
            .any(|(token, &start)| token.is_synthetic && range.start <= start && start < range.end)
    }

    fn position_in_token(&self, i: usize, offset: usize) -> DocPos {
        let token = &self.tokens[i];
        if token.is_synthetic {
            token.document_position
        } else {
            token.document_position.advance(offset - self.starts[i])
        }
    }
}
