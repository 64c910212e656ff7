//! Text buffer for the flattened (raw markdown) editing mode.
//!
//! Edits arrive as [`FlatEdit`] commands, compile to an xi-rope `Delta`, and
//! are applied to the rope in one step. Offsets are bytes into the markdown
//! text and are clamped to the buffer and to character boundaries.

use std::ops::Range;

use xi_rope::delta::{Builder, DeltaElement};
use xi_rope::{Delta, Rope, RopeInfo};

/// An edit against the flattened text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatEdit {
    Insert { at: usize, text: String },
    Delete { range: Range<usize> },
    Replace { range: Range<usize>, text: String },
}

/// Result of applying a [`FlatEdit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatPatch {
    /// Byte ranges in the new text that were touched.
    pub changed: Vec<Range<usize>>,
    pub version: u64,
}

#[derive(Debug, Clone)]
pub struct FlatBuffer {
    rope: Rope,
    version: u64,
}

impl FlatBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from(text),
            version: 0,
        }
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn apply(&mut self, edit: FlatEdit) -> FlatPatch {
        let delta = self.compile(&edit);

        let old_len = self.rope.len();
        let mut changed: Vec<Range<usize>> = Vec::new();
        let mut cursor = 0;
        let mut old_pos = 0;
        for op in &delta.els {
            match op {
                DeltaElement::Copy(from, to) => {
                    // a gap in the old text is a deletion
                    if *from > old_pos && changed.last().is_none_or(|r| r.end != cursor) {
                        changed.push(cursor..cursor);
                    }
                    cursor += to - from;
                    old_pos = *to;
                }
                DeltaElement::Insert(inserted) => {
                    let start = cursor;
                    cursor += inserted.len();
                    changed.push(start..cursor);
                }
            }
        }
        if old_pos < old_len && changed.last().is_none_or(|r| r.end != cursor) {
            changed.push(cursor..cursor);
        }

        self.rope = delta.apply(&self.rope);
        self.version += 1;
        log::debug!("flat edit applied, {} bytes, version {}", self.rope.len(), self.version);

        FlatPatch {
            changed,
            version: self.version,
        }
    }

    fn compile(&self, edit: &FlatEdit) -> Delta<RopeInfo> {
        let mut builder = Builder::new(self.rope.len());
        match edit {
            FlatEdit::Insert { at, text } => {
                let at = self.clamp(*at);
                builder.replace(at..at, Rope::from(text.as_str()));
            }
            FlatEdit::Delete { range } => {
                let range = self.clamp_range(range);
                if !range.is_empty() {
                    builder.delete(range);
                }
            }
            FlatEdit::Replace { range, text } => {
                let range = self.clamp_range(range);
                builder.replace(range, Rope::from(text.as_str()));
            }
        }
        builder.build()
    }

    fn clamp_range(&self, range: &Range<usize>) -> Range<usize> {
        let start = self.clamp(range.start);
        let end = self.clamp(range.end).max(start);
        start..end
    }

    /// Clamp to the buffer and back off to the nearest character boundary.
    fn clamp(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.rope.len());
        let text = self.rope.slice_to_cow(0..self.rope.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
