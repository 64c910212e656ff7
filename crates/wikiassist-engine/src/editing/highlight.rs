//! Highlight overlay for pending feedback.
//!
//! Markers are never spliced into the document. Each refresh rebuilds the full
//! overlay from the current index and feedback set, then diffs it against the
//! previous one, so repeated refreshes with unchanged inputs are no-ops.
//!
//! Highlighting uses the record's literal `start_index..end_index` against the
//! live flat text. Records whose range cannot be isolated cleanly (empty,
//! out of bounds, overlapping an earlier record, or spanning a block
//! boundary) are skipped for that refresh and never raise.

use std::ops::Range;

use crate::editing::EditingMode;
use crate::editing::host::DocPos;
use crate::editing::offset_index::OffsetIndex;
use crate::models::feedback::{FeedbackId, FeedbackRecord, Severity};

/// One painted span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub feedback_id: FeedbackId,
    pub range: Range<DocPos>,
    pub flat: Range<usize>,
    pub severity: Severity,
    pub selected: bool,
}

impl Marker {
    pub fn css_class(&self) -> String {
        let mut class = format!("highlight-{}", self.severity.as_str());
        if self.selected {
            class.push_str(" highlight-selected");
        }
        class
    }

    pub fn contains(&self, pos: DocPos) -> bool {
        self.range.start <= pos && pos < self.range.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    OutOfBounds,
    Overlap,
    CrossesBlock,
}

/// Markers to remove and add to move from the previous overlay to the new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayDiff {
    pub added: Vec<Marker>,
    pub removed: Vec<Marker>,
}

impl OverlayDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Result of one paint pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paint {
    pub markers: Vec<Marker>,
    pub skipped: Vec<(FeedbackId, SkipReason)>,
}

/// Compute the overlay for `feedback` without touching any state.
///
/// Earlier records win overlaps, so the result depends only on the inputs.
pub fn paint(index: &OffsetIndex, feedback: &[FeedbackRecord], selected: Option<FeedbackId>) -> Paint {
    let mut out = Paint::default();
    for record in feedback.iter().filter(|r| r.is_pending()) {
        let flat = record.start_index..record.end_index;
        let skip = if flat.start >= flat.end {
            Some(SkipReason::Empty)
        } else if flat.end > index.char_len() {
            Some(SkipReason::OutOfBounds)
        } else if out
            .markers
            .iter()
            .any(|m| m.flat.start < flat.end && flat.start < m.flat.end)
        {
            Some(SkipReason::Overlap)
        } else if index.crosses_boundary(flat.clone()) {
            Some(SkipReason::CrossesBlock)
        } else {
            None
        };

        if let Some(reason) = skip {
            log::debug!(
                "not highlighting feedback {} ({}..{}): {reason:?}",
                record.id,
                flat.start,
                flat.end
            );
            out.skipped.push((record.id, reason));
            continue;
        }

        out.markers.push(Marker {
            feedback_id: record.id,
            range: index.range_to_positions(flat.clone()),
            flat,
            severity: record.severity,
            selected: selected == Some(record.id),
        });
    }
    out
}

/// The currently painted overlay.
#[derive(Debug, Clone, Default)]
pub struct HighlightLayer {
    markers: Vec<Marker>,
}

impl HighlightLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Strip the old overlay and paint a fresh one.
    ///
    /// Nothing is painted while the flattened editor is active.
    pub fn refresh(
        &mut self,
        index: &OffsetIndex,
        feedback: &[FeedbackRecord],
        selected: Option<FeedbackId>,
        mode: EditingMode,
    ) -> OverlayDiff {
        match mode {
            EditingMode::Structured => self.replace(paint(index, feedback, selected).markers),
            EditingMode::Flattened => self.clear(),
        }
    }

    /// Remove every marker.
    fn clear(&mut self) -> OverlayDiff {
        self.replace(Vec::new())
    }

    /// The feedback under a document position, for click-to-select.
    pub fn marker_at(&self, pos: DocPos) -> Option<FeedbackId> {
        self.markers
            .iter()
            .find(|m| m.contains(pos))
            .map(|m| m.feedback_id)
    }

    fn replace(&mut self, next: Vec<Marker>) -> OverlayDiff {
        let removed = self
            .markers
            .iter()
            .filter(|m| !next.contains(m))
            .cloned()
            .collect();
        let added = next
            .iter()
            .filter(|m| !self.markers.contains(m))
            .cloned()
            .collect();
        self.markers = next;
        OverlayDiff { added, removed }
    }
}
