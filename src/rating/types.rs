use crate::database::DatabaseError;
use crate::database::entities::{CategoryAggregate, CombinedAggregate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rating as sent by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSubmission {
    /// Single overall value, used when `rates` is empty
    #[serde(default)]
    pub rate: Option<i32>,
    /// One value per category; authoritative when present
    #[serde(default)]
    pub rates: Vec<i32>,
    #[serde(default)]
    pub review: Option<String>,
    #[serde(default)]
    pub anonymous: bool,
}

impl RatingSubmission {
    pub fn with_rates(rates: impl Into<Vec<i32>>) -> Self {
        Self {
            rates: rates.into(),
            ..Default::default()
        }
    }

    pub fn with_rate(rate: i32) -> Self {
        Self {
            rate: Some(rate),
            ..Default::default()
        }
    }

    pub fn review(mut self, review: impl Into<String>) -> Self {
        self.review = Some(review.into());
        self
    }

    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }
}

/// What a successful submission changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub rows_affected: u64,
    /// True when the author had rated this entity before
    pub revision: bool,
    pub overall: f64,
    pub history_len: usize,
    /// Transactions started, including rolled-back ones replayed after a failure
    pub attempts: u32,
}

/// Aggregated view of one entity, zeroed when nobody rated it yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySummary {
    pub combined: CombinedAggregate,
    pub categories: Vec<CategoryAggregate>,
}

/// One rejected field of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            param: None,
            message: message.into(),
        }
    }

    pub fn with_param(mut self, param: impl ToString) -> Self {
        self.param = Some(param.to_string());
        self
    }
}

#[derive(Error, Debug)]
pub enum RatingError {
    #[error("Invalid rating submission: {}", summarize(.0))]
    Validation(Vec<ValidationIssue>),
    #[error("Conflicting write for entity, retry the submission: {0}")]
    Conflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    /// Storage failure that a replay would repeat
    #[error("Internal error: {0}")]
    Internal(String),
}

fn summarize(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("{} ({})", issue.field, issue.code))
        .collect::<Vec<_>>()
        .join(", ")
}

impl RatingError {
    /// Whether replaying the whole submission may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, RatingError::Conflict(_) | RatingError::Storage(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RatingError::Validation(_) => "validation",
            RatingError::Conflict(_) => "conflict",
            RatingError::Storage(_) => "storage",
            RatingError::Internal(_) => "internal",
        }
    }
}

impl From<DatabaseError> for RatingError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Conflict(msg) => RatingError::Conflict(msg),
            other if other.is_retryable() => RatingError::Storage(other.to_string()),
            other => RatingError::Internal(other.to_string()),
        }
    }
}
