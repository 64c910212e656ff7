use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity for a feedback record within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedbackId(Uuid);

impl FeedbackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FeedbackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which content policy a record is about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum IssueType {
    Npov,
    Verifiability,
    OriginalResearch,
    #[default]
    Style,
}

impl From<String> for IssueType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "npov" => IssueType::Npov,
            "verifiability" => IssueType::Verifiability,
            "original_research" => IssueType::OriginalResearch,
            _ => IssueType::Style,
        }
    }
}

impl IssueType {
    pub fn label(self) -> &'static str {
        match self {
            IssueType::Npov => "Neutral point of view",
            IssueType::Verifiability => "Verifiability",
            IssueType::OriginalResearch => "No original research",
            IssueType::Style => "Style",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum Severity {
    High,
    #[default]
    Medium,
    Low,
}

impl From<String> for Severity {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// A status change other than `pending -> accepted | rejected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("feedback {id} is already {current:?}")]
pub struct InvalidTransition {
    pub id: FeedbackId,
    pub current: FeedbackStatus,
}

/// One issue reported by the review service.
///
/// `start_index`/`end_index` are character offsets into the text that was
/// submitted, which may no longer match the live document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    #[serde(default)]
    pub id: FeedbackId,
    pub original_sentence: String,
    pub feedback: String,
    pub suggested_text: String,
    #[serde(default)]
    pub issue_type: IssueType,
    #[serde(default)]
    pub severity: Severity,
    pub start_index: usize,
    pub end_index: usize,
    #[serde(default)]
    pub status: FeedbackStatus,
}

impl FeedbackRecord {
    pub fn is_pending(&self) -> bool {
        self.status == FeedbackStatus::Pending
    }

    /// Move out of `pending`; any other transition is refused.
    pub fn resolve(&mut self, status: FeedbackStatus) -> Result<(), InvalidTransition> {
        if !self.is_pending() || status == FeedbackStatus::Pending {
            return Err(InvalidTransition {
                id: self.id,
                current: self.status,
            });
        }
        self.status = status;
        Ok(())
    }
}

/// Per-status counts for a panel header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackSummary {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// The records of one review, in the order the service returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedbackSet {
    records: Vec<FeedbackRecord>,
}

impl FeedbackSet {
    /// Take ownership of fresh records: every one starts `pending`.
    pub fn from_records(records: Vec<FeedbackRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|mut record| {
                record.status = FeedbackStatus::Pending;
                record
            })
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[FeedbackRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn get(&self, id: FeedbackId) -> Option<&FeedbackRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn position(&self, id: FeedbackId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn pending(&self) -> impl Iterator<Item = &FeedbackRecord> {
        self.records.iter().filter(|r| r.is_pending())
    }

    /// Apply a status transition, returning the updated record.
    ///
    /// Returns `None` when no record has `id`.
    pub fn resolve(
        &mut self,
        id: FeedbackId,
        status: FeedbackStatus,
    ) -> Option<Result<&FeedbackRecord, InvalidTransition>> {
        let record = self.records.iter_mut().find(|r| r.id == id)?;
        Some(match record.resolve(status) {
            Ok(()) => Ok(&*record),
            Err(e) => Err(e),
        })
    }

    pub fn summary(&self) -> FeedbackSummary {
        self.records
            .iter()
            .fold(FeedbackSummary::default(), |mut acc, r| {
                match r.status {
                    FeedbackStatus::Pending => acc.pending += 1,
                    FeedbackStatus::Accepted => acc.accepted += 1,
                    FeedbackStatus::Rejected => acc.rejected += 1,
                }
                acc
            })
    }
}

#[cfg(test)]
pub(crate) fn record(sentence: &str, suggestion: &str, range: std::ops::Range<usize>) -> FeedbackRecord {
    FeedbackRecord {
        id: FeedbackId::new(),
        original_sentence: sentence.to_string(),
        feedback: "needs work".to_string(),
        suggested_text: suggestion.to_string(),
        issue_type: IssueType::Npov,
        severity: Severity::High,
        start_index: range.start,
        end_index: range.end,
        status: FeedbackStatus::Pending,
    }
}
