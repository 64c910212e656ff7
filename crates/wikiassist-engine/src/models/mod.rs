pub mod document;
pub mod draft_file;
pub mod feedback;
pub mod review;

pub use document::{Block, Marks, RichDocument, TextRun};
pub use draft_file::DraftFile;
pub use feedback::{
    FeedbackId, FeedbackRecord, FeedbackSet, FeedbackStatus, FeedbackSummary, InvalidTransition,
    IssueType, Severity,
};
pub use review::{ReviewOverview, ReviewRequest, ReviewResponse};
