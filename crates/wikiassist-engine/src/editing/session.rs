//! The review session: one document, one feedback set, one overlay.
//!
//! Derived state (the offset index and the highlight overlay) is recomputed
//! only through [`ReviewSession::notify`]. Every operation that changes an
//! input names the event it raises, and `notify` does the same thing for each:
//! rebuild the index if its generation is stale, then repaint.

use crate::bridge;
use crate::editing::EditingMode;
use crate::editing::flat_buffer::{FlatBuffer, FlatEdit, FlatPatch};
use crate::editing::highlight::{HighlightLayer, Marker, OverlayDiff};
use crate::editing::host::DocPos;
use crate::editing::mutator::{self, MutationError};
use crate::editing::offset_index::OffsetIndex;
use crate::models::document::RichDocument;
use crate::models::feedback::{
    FeedbackId, FeedbackRecord, FeedbackSet, FeedbackStatus, InvalidTransition,
};
use crate::models::review::{ReviewOverview, ReviewRequest, ReviewResponse};

/// Inputs whose change requires a recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    ContentChanged,
    FeedbackSetChanged,
    SelectionChanged,
}

/// Signals for the feedback panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    FeedbackSelected(FeedbackId),
    /// The suggestion was merged; carries the record with its new status.
    Accepted(FeedbackRecord),
    Rejected(FeedbackRecord),
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("no feedback with id {0}")]
    UnknownFeedback(FeedbackId),
    #[error(transparent)]
    NotPending(#[from] InvalidTransition),
    #[error("suggestions can only be accepted in the structured view")]
    WrongMode,
    #[error(transparent)]
    Mutation(#[from] MutationError),
}

pub struct ReviewSession {
    document: RichDocument,
    feedback: FeedbackSet,
    overview: Option<ReviewOverview>,
    selected: Option<FeedbackId>,
    mode: EditingMode,
    index: OffsetIndex,
    highlights: HighlightLayer,
    flat: Option<FlatBuffer>,
}

impl ReviewSession {
    pub fn new(document: RichDocument) -> Self {
        let index = OffsetIndex::build(&document);
        Self {
            document,
            feedback: FeedbackSet::default(),
            overview: None,
            selected: None,
            mode: EditingMode::Structured,
            index,
            highlights: HighlightLayer::new(),
            flat: None,
        }
    }

    pub fn from_markdown(markdown: &str) -> Self {
        Self::new(bridge::from_markdown(markdown))
    }

    pub fn document(&self) -> &RichDocument {
        &self.document
    }

    pub fn feedback(&self) -> &FeedbackSet {
        &self.feedback
    }

    pub fn overview(&self) -> Option<&ReviewOverview> {
        self.overview.as_ref()
    }

    pub fn selected(&self) -> Option<FeedbackId> {
        self.selected
    }

    pub fn mode(&self) -> EditingMode {
        self.mode
    }

    pub fn index(&self) -> &OffsetIndex {
        &self.index
    }

    /// The markers currently painted.
    pub fn overlay(&self) -> &[Marker] {
        self.highlights.markers()
    }

    /// The document as markdown; in flattened mode, the text being edited.
    pub fn markdown(&self) -> String {
        match &self.flat {
            Some(flat) => flat.text(),
            None => bridge::to_markdown(&self.document),
        }
    }

    /// The request body for reviewing the current document.
    ///
    /// The content is the flat text, so returned offsets index the same text.
    pub fn review_request(&self, title: Option<String>) -> ReviewRequest {
        let content = if self.index.is_current(&self.document) {
            self.index.flat_text().to_string()
        } else {
            self.document.text()
        };
        ReviewRequest { content, title }
    }

    /// Recompute derived state after `event`.
    pub fn notify(&mut self, event: SessionEvent) -> OverlayDiff {
        if self.index.ensure_current(&self.document).is_err() {
            log::debug!("{event:?}: rebuilding stale offset index");
            self.index = OffsetIndex::build(&self.document);
        }
        self.highlights.refresh(
            &self.index,
            self.feedback.records(),
            self.selected,
            self.mode,
        )
    }

    /// Take a fresh review; every record starts `pending` and the selection clears.
    pub fn load_review(&mut self, response: ReviewResponse) -> OverlayDiff {
        let (overview, feedback) = response.into_parts();
        log::info!(
            "loaded review: {} feedback, score {}",
            feedback.len(),
            overview.overall_score
        );
        self.feedback = feedback;
        self.overview = Some(overview);
        self.selected = None;
        self.notify(SessionEvent::FeedbackSetChanged)
    }

    pub fn select(&mut self, id: Option<FeedbackId>) -> Result<OverlayDiff, SessionError> {
        if let Some(id) = id
            && self.feedback.get(id).is_none()
        {
            return Err(SessionError::UnknownFeedback(id));
        }
        self.selected = id;
        Ok(self.notify(SessionEvent::SelectionChanged))
    }

    /// Select whatever highlighted feedback sits under `pos`.
    pub fn click_at(&mut self, pos: DocPos) -> Option<Notification> {
        let id = self.highlights.marker_at(pos)?;
        self.selected = Some(id);
        self.notify(SessionEvent::SelectionChanged);
        Some(Notification::FeedbackSelected(id))
    }

    /// Merge a suggestion into the document and mark it accepted.
    ///
    /// On any error the record stays `pending`.
    pub fn accept(&mut self, id: FeedbackId) -> Result<Notification, SessionError> {
        if self.mode != EditingMode::Structured {
            return Err(SessionError::WrongMode);
        }
        let record = self.pending_record(id)?.clone();

        if let Err(e) = mutator::accept(&mut self.document, &record) {
            log::warn!("could not accept feedback {id}: {e}");
            return Err(e.into());
        }
        let updated = self.resolve(id, FeedbackStatus::Accepted)?;
        self.notify(SessionEvent::ContentChanged);
        Ok(Notification::Accepted(updated))
    }

    pub fn reject(&mut self, id: FeedbackId) -> Result<Notification, SessionError> {
        self.pending_record(id)?;
        let updated = self.resolve(id, FeedbackStatus::Rejected)?;
        self.notify(SessionEvent::FeedbackSetChanged);
        Ok(Notification::Rejected(updated))
    }

    /// Switch editors.
    ///
    /// Entering flattened mode renders the document to markdown once. Leaving
    /// it converts nothing: flattened edits were already applied as they came.
    pub fn set_mode(&mut self, mode: EditingMode) -> OverlayDiff {
        if mode != self.mode {
            self.flat = match mode {
                EditingMode::Flattened => Some(FlatBuffer::new(&bridge::to_flattened(&self.document))),
                EditingMode::Structured => None,
            };
            self.mode = mode;
            log::debug!("switched to {mode:?} editing");
        }
        self.notify(SessionEvent::ContentChanged)
    }

    /// Apply an edit to the flattened text and regenerate the document from it.
    pub fn edit_flattened(&mut self, edit: FlatEdit) -> Result<FlatPatch, SessionError> {
        let Some(flat) = self.flat.as_mut() else {
            return Err(SessionError::WrongMode);
        };
        let patch = flat.apply(edit);
        let regenerated = bridge::from_flattened(&flat.text());
        self.document.replace_blocks(regenerated.into_blocks());
        self.notify(SessionEvent::ContentChanged);
        Ok(patch)
    }

    fn pending_record(&self, id: FeedbackId) -> Result<&FeedbackRecord, SessionError> {
        let record = self
            .feedback
            .get(id)
            .ok_or(SessionError::UnknownFeedback(id))?;
        if !record.is_pending() {
            return Err(SessionError::NotPending(InvalidTransition {
                id,
                current: record.status,
            }));
        }
        Ok(record)
    }

    fn resolve(
        &mut self,
        id: FeedbackId,
        status: FeedbackStatus,
    ) -> Result<FeedbackRecord, SessionError> {
        match self.feedback.resolve(id, status) {
            Some(Ok(record)) => Ok(record.clone()),
            Some(Err(e)) => Err(e.into()),
            None => Err(SessionError::UnknownFeedback(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::host::{DocumentHost, HostError};
    use crate::models::feedback::record;
    use pretty_assertions::assert_eq;

    fn response(records: Vec<FeedbackRecord>) -> ReviewResponse {
        ReviewResponse {
            feedbacks: records,
            overall_score: 70,
            summary: "ok".to_string(),
            is_ready: false,
        }
    }

    fn paris_with(range: std::ops::Range<usize>) -> (ReviewSession, FeedbackId) {
        let mut session = ReviewSession::from_markdown("Paris is obviously the best city.\n");
        session.load_review(response(vec![record(
            "Paris is obviously the best city.",
            "Paris is the capital of France.",
            range,
        )]));
        let id = session.feedback().records()[0].id;
        (session, id)
    }

    fn paris() -> (ReviewSession, FeedbackId) {
        paris_with(0..33)
    }

    #[test]
    fn accept_merges_and_flips_status() {
        // the service's end offset overshoots the sentence; accept relocates by content
        let (mut session, id) = paris_with(0..35);
        let notification = session.accept(id).unwrap();
        assert_eq!(session.document().text(), "Paris is the capital of France.");
        let Notification::Accepted(record) = notification else {
            panic!("expected an accepted notification");
        };
        assert_eq!(record.status, FeedbackStatus::Accepted);
        assert_eq!(session.feedback().get(id).unwrap().status, FeedbackStatus::Accepted);
        assert!(session.index().is_current(session.document()));
        assert!(session.overlay().is_empty());
    }

    #[test]
    fn failed_accept_keeps_record_pending() {
        let mut session = ReviewSession::from_markdown("Something else entirely.\n");
        session.load_review(response(vec![record("Not here.", "x", 0..9)]));
        let id = session.feedback().records()[0].id;
        let err = session.accept(id).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Mutation(MutationError::SpanNotFound { .. })
        ));
        assert!(session.feedback().get(id).unwrap().is_pending());
        assert_eq!(session.document().text(), "Something else entirely.");
    }

    #[test]
    fn accept_refused_by_the_host_keeps_record_pending() {
        let mut session = ReviewSession::from_markdown("- one\n- two\n");
        session.load_review(response(vec![record("one two", "merged", 0..7)]));
        let id = session.feedback().records()[0].id;
        let before = session.document().clone();

        let err = session.accept(id).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Mutation(MutationError::MutationFailed {
                source: HostError::CrossesContainer { .. }
            })
        ));
        assert!(session.feedback().get(id).unwrap().is_pending());
        assert_eq!(session.document(), &before);
        assert_eq!(session.document().version(), 0);
    }

    #[test]
    fn resolved_records_cannot_be_accepted_again() {
        let (mut session, id) = paris();
        session.reject(id).unwrap();
        assert!(matches!(session.accept(id), Err(SessionError::NotPending(_))));
        assert!(matches!(session.reject(id), Err(SessionError::NotPending(_))));
    }

    #[test]
    fn load_review_resets_status_and_paints() {
        let (session, _) = paris();
        assert_eq!(session.feedback().summary().pending, 1);
        assert_eq!(session.overlay().len(), 1);
        assert_eq!(session.overview().unwrap().overall_score, 70);
    }

    #[test]
    fn click_selects_the_marker_under_the_cursor() {
        let (mut session, id) = paris();
        assert_eq!(session.click_at(DocPos(3)), Some(Notification::FeedbackSelected(id)));
        assert_eq!(session.selected(), Some(id));
        assert!(session.overlay()[0].selected);
        assert_eq!(session.click_at(DocPos(90)), None);
    }

    #[test]
    fn select_rejects_unknown_ids() {
        let (mut session, _) = paris();
        assert!(matches!(
            session.select(Some(FeedbackId::new())),
            Err(SessionError::UnknownFeedback(_))
        ));
        assert!(session.select(None).unwrap().is_empty());
    }

    #[test]
    fn flattened_mode_hides_highlights_and_blocks_accept() {
        let (mut session, id) = paris();
        let diff = session.set_mode(EditingMode::Flattened);
        assert_eq!(diff.removed.len(), 1);
        assert!(session.overlay().is_empty());
        assert!(matches!(session.accept(id), Err(SessionError::WrongMode)));

        let diff = session.set_mode(EditingMode::Structured);
        assert_eq!(diff.added.len(), 1);
        assert!(session.accept(id).is_ok());
    }

    #[test]
    fn flattened_edits_update_the_document_immediately() {
        let mut session = ReviewSession::from_markdown("# Title\n\nBody text.\n");
        assert!(matches!(
            session.edit_flattened(FlatEdit::Insert {
                at: 0,
                text: "x".to_string()
            }),
            Err(SessionError::WrongMode)
        ));
        session.set_mode(EditingMode::Flattened);
        let before = session.document().version();
        session
            .edit_flattened(FlatEdit::Replace {
                range: 9..13,
                text: "**Bold**".to_string(),
            })
            .unwrap();
        assert_eq!(session.markdown(), "# Title\n\n**Bold** text.\n");
        assert_eq!(session.document().text(), "Title\nBold text.");
        assert!(session.document().version() > before);
        assert!(session.index().is_current(session.document()));

        session.set_mode(EditingMode::Structured);
        assert_eq!(session.markdown(), "# Title\n\n**Bold** text.\n");
    }

    #[test]
    fn review_request_uses_flat_text() {
        let session = ReviewSession::from_markdown("# Title\n\n- one\n- two\n");
        let request = session.review_request(Some("Draft".to_string()));
        assert_eq!(request.content, "Title\none\ntwo");
        assert_eq!(request.title.as_deref(), Some("Draft"));
    }
}
