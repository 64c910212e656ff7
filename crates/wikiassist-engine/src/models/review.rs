//! Wire types for the external review service.
//!
//! The service is called by the embedding application; the engine only builds
//! the request body and consumes the parsed response.

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::feedback::{FeedbackRecord, FeedbackSet};

/// Body of `POST /api/review`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Parsed review response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewResponse {
    #[serde(default)]
    pub feedbacks: Vec<FeedbackRecord>,
    /// Quality score, 0 to 100.
    #[serde(default = "default_score", deserialize_with = "clamped_score")]
    pub overall_score: u8,
    #[serde(default = "default_summary")]
    pub summary: String,
    #[serde(default)]
    pub is_ready: bool,
}

fn default_score() -> u8 {
    50
}

/// Out-of-range scores are clamped rather than failing the whole response.
fn clamped_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let score = i64::deserialize(deserializer)?;
    Ok(u8::try_from(score.clamp(0, 100)).unwrap_or(100))
}

fn default_summary() -> String {
    "Review completed".to_string()
}

/// Response metadata kept alongside the feedback set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOverview {
    pub overall_score: u8,
    pub summary: String,
    pub is_ready: bool,
}

impl ReviewResponse {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Split into the overview and a feedback set with every record `pending`.
    pub fn into_parts(self) -> (ReviewOverview, FeedbackSet) {
        let overview = ReviewOverview {
            overall_score: self.overall_score,
            summary: self.summary,
            is_ready: self.is_ready,
        };
        (overview, FeedbackSet::from_records(self.feedbacks))
    }
}
