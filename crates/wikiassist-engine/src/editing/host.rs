use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A coordinate in the structured document.
///
/// Entering or leaving a non-leaf node costs one position and every character
/// of text costs one, so positions order the same way the document reads.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DocPos(pub usize);

impl DocPos {
    /// Offset this position by `n` characters.
    #[must_use]
    pub fn advance(self, n: usize) -> Self {
        Self(self.0 + n)
    }
}

impl std::fmt::Display for DocPos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// One step of a depth-first, document-order traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit<'a> {
    /// A block node opens at `pos`. For text blocks the content starts at `pos + 1`.
    EnterBlock { textblock: bool, pos: DocPos },
    /// A run of literal text starting at `pos`.
    Text { text: &'a str, pos: DocPos },
    /// A block node closes; `pos` is the position just after it.
    LeaveBlock { textblock: bool, pos: DocPos },
}

/// Failures raised by the host's edit primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("position {0} is not inside text content")]
    InvalidPosition(DocPos),
    #[error("range {start}..{end} is reversed")]
    ReversedRange { start: DocPos, end: DocPos },
    #[error("position {pos} is past the end of the document ({size})")]
    OutOfRange { pos: DocPos, size: usize },
    #[error("range {start}..{end} spans blocks in different containers")]
    CrossesContainer { start: DocPos, end: DocPos },
}

/// The structured document as seen by the review core.
///
/// The core never builds documents itself: it walks them with [`DocumentHost::visit`]
/// and edits them through the single combined [`DocumentHost::replace_range`]
/// primitive. Every successful edit must bump [`DocumentHost::version`] exactly
/// once so that derived indexes can tell they are stale.
pub trait DocumentHost {
    /// Generation counter, bumped on every successful mutation.
    fn version(&self) -> u64;

    /// Visit every node in document order with its structural position.
    fn visit(&self, visitor: &mut dyn FnMut(Visit<'_>));

    /// Delete `range` and insert `text` at its start as one atomic edit.
    ///
    /// On error the document must be left exactly as it was.
    fn replace_range(&mut self, range: Range<DocPos>, text: &str) -> Result<(), HostError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_pos_orders_and_advances() {
        let a = DocPos(3);
        let b = a.advance(4);
        assert_eq!(b, DocPos(7));
        assert!(a < b);
        assert_eq!(b.to_string(), "@7");
    }

    #[test]
    fn host_error_messages_name_the_positions() {
        let err = HostError::CrossesContainer {
            start: DocPos(2),
            end: DocPos(9),
        };
        assert_eq!(
            err.to_string(),
            "range @2..@9 spans blocks in different containers"
        );
    }
}
