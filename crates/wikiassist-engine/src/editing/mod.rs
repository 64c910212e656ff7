/*!
 * # Review Editing Core
 *
 * Maps between three views of the same text and edits the live document
 * without losing track of positions.
 *
 * ## The three representations
 *
 * - The **structured document**, reached only through [`DocumentHost`]:
 *   a traversal primitive and one combined replace-range primitive.
 * - The **flat text** built by [`OffsetIndex`]: text runs in document order
 *   with a synthetic `"\n"` between text blocks. The review service computes
 *   its offsets against this text.
 * - **Feedback records**: a sentence plus `start_index..end_index` into the
 *   flat text as it was when submitted.
 *
 * ## Two ways to find a record's text
 *
 * - Highlighting ([`highlight`]) trusts the record's literal indices against
 *   the *current* flat text, so markers track what the service returned.
 * - Accepting ([`mutator`]) relocates the sentence by content through
 *   [`locator`], so it survives edits made since the review.
 *
 * ## Staleness
 *
 * Every successful edit bumps [`DocumentHost::version`]. An index remembers
 * the generation it was built at; [`OffsetIndex::ensure_current`] fails once
 * the document has moved on. [`session::ReviewSession`] rebuilds on demand in
 * its single recomputation path, and the mutator always builds a fresh index.
 *
 * ## Module Structure
 *
 * - **`host`**: `DocPos`, the `DocumentHost` trait and its errors
 * - **`offset_index`**: flat text, tokens and offset/position mapping
 * - **`locator`**: whitespace-tolerant sentence search
 * - **`highlight`**: overlay markers, rebuilt and diffed per refresh
 * - **`mutator`**: accept-and-replace against a fresh index
 * - **`flat_buffer`**: xi-rope buffer for the flattened editor
 * - **`session`**: the controller tying the above to named events
 *
 * ## Usage Pattern
 *
 * ```rust
 * use wikiassist_engine::editing::{EditingMode, ReviewSession};
 * use wikiassist_engine::models::ReviewResponse;
 *
 * let mut session = ReviewSession::from_markdown("Paris is obviously the best city.\n");
 * let response = ReviewResponse::from_json(r#"{"feedbacks": [{
 *     "original_sentence": "Paris is obviously the best city.",
 *     "feedback": "Peacock term",
 *     "suggested_text": "Paris is the capital of France.",
 *     "start_index": 0,
 *     "end_index": 33
 * }]}"#).unwrap();
 *
 * session.load_review(response);
 * assert_eq!(session.overlay().len(), 1);
 *
 * let id = session.feedback().records()[0].id;
 * session.accept(id).unwrap();
 * assert_eq!(session.document().text(), "Paris is the capital of France.");
 * assert_eq!(session.mode(), EditingMode::Structured);
 * ```
 */

pub mod flat_buffer;
pub mod highlight;
pub mod host;
pub mod locator;
pub mod mutator;
pub mod offset_index;
pub mod session;

pub use flat_buffer::{FlatBuffer, FlatEdit, FlatPatch};
pub use highlight::{HighlightLayer, Marker, OverlayDiff, SkipReason};
pub use host::{DocPos, DocumentHost, HostError, Visit};
pub use locator::{FlatSpan, LocatedSpan, MatchConfidence, NotFound};
pub use mutator::{AppliedEdit, MutationError};
pub use offset_index::{FlatToken, OffsetIndex, StaleIndex};
pub use session::{Notification, ReviewSession, SessionError, SessionEvent};

/// Which editor is active. Not part of the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum EditingMode {
    /// The rich-text view; highlights are painted and suggestions can be accepted.
    #[default]
    Structured,
    /// Raw markdown editing; highlights are suppressed.
    Flattened,
}

impl EditingMode {
    pub fn toggled(self) -> Self {
        match self {
            EditingMode::Structured => EditingMode::Flattened,
            EditingMode::Flattened => EditingMode::Structured,
        }
    }
}
