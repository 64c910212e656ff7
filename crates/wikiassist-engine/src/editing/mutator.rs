//! Accept-and-replace for a single feedback record.

use std::ops::Range;

use crate::editing::host::{DocPos, DocumentHost, HostError};
use crate::editing::locator::{self, MatchConfidence};
use crate::editing::offset_index::OffsetIndex;
use crate::models::feedback::FeedbackRecord;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("could not find \"{sentence}\" in the document")]
    SpanNotFound { sentence: String },
    #[error("the document refused the edit: {source}")]
    MutationFailed {
        #[from]
        source: HostError,
    },
}

/// What an accepted suggestion changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    /// The positions that were replaced, in the document as it was before the edit.
    pub replaced: Range<DocPos>,
    pub inserted: String,
    pub confidence: MatchConfidence,
    /// Document generation after the edit.
    pub version: u64,
}

/// Replace the record's sentence with its suggestion.
///
/// The sentence is located against a fresh index of the current document, not
/// against the record's stored offsets. The record's status is left alone.
pub fn accept<H: DocumentHost + ?Sized>(
    host: &mut H,
    record: &FeedbackRecord,
) -> Result<AppliedEdit, MutationError> {
    let index = OffsetIndex::build(&*host);
    let located = locator::locate_in(&index, &record.original_sentence).map_err(|_| {
        MutationError::SpanNotFound {
            sentence: record.original_sentence.clone(),
        }
    })?;

    let replaced = located.from..located.to;
    host.replace_range(replaced.clone(), &record.suggested_text)
        .inspect_err(|e| log::warn!("accepting feedback {} failed: {e}", record.id))?;

    log::debug!(
        "accepted feedback {}: replaced {}..{} ({:?})",
        record.id,
        replaced.start,
        replaced.end,
        located.confidence
    );

    Ok(AppliedEdit {
        replaced,
        inserted: record.suggested_text.clone(),
        confidence: located.confidence,
        version: host.version(),
    })
}
