//! Duty batch validation and the persisted schedule entry.
//!
//! `DutyBatch::parse` is the single validation entry point for submitted
//! payloads. Validation is all-or-nothing: one malformed element rejects
//! the whole batch, and accepted batches pass through unmodified (no
//! trimming, normalization, or deduplication).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::Result;

/// Grouping key shared by every schedule entry (single logical partition).
pub const SCHEDULE_PARTITION: &str = "schedule";

/// One duty assignment submitted by the caller.
///
/// `id`, `day` and `member` are required strings. Additional fields the
/// caller sends are carried through untouched so the persisted JSON matches
/// the submitted batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duty {
    /// Caller-assigned identifier of the duty.
    pub id: String,
    /// Caller-defined day designator; the format is not constrained here.
    pub day: String,
    /// Assignee identifier.
    pub member: String,
    /// Caller-supplied fields beyond the required three.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Validation failures for a submitted batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Body is not parseable JSON.
    #[error("invalid JSON body")]
    InvalidJson,
    /// `duties` is missing, not an array, or empty.
    #[error("duties must be a non-empty array")]
    MissingOrEmpty,
    /// An element is missing a required field or carries a non-string value.
    #[error("each duty must have id, day, member as strings")]
    MalformedDuty,
}

/// Validated, non-empty batch of duty assignments.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DutyBatch(Vec<Duty>);

impl DutyBatch {
    /// Parses and validates a request body into a batch.
    ///
    /// Distinguishes a syntactically invalid body from a structurally
    /// invalid one: the former is `InvalidJson`, the latter `MissingOrEmpty`
    /// or `MalformedDuty`. Partial acceptance is not supported.
    pub fn parse(body: &[u8]) -> std::result::Result<Self, BatchError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| BatchError::InvalidJson)?;

        let duties = match value.get("duties") {
            Some(Value::Array(duties)) if !duties.is_empty() => duties,
            _ => return Err(BatchError::MissingOrEmpty),
        };

        let duties = duties
            .iter()
            .map(|duty| serde_json::from_value(duty.clone()).map_err(|_| BatchError::MalformedDuty))
            .collect::<std::result::Result<Vec<Duty>, BatchError>>()?;

        Ok(Self(duties))
    }

    /// Duties in submission order.
    pub fn duties(&self) -> &[Duty] {
        &self.0
    }

    /// Number of duties in the batch (at least one by construction).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API completeness.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lossless JSON text of the batch for persistence.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Persisted record of one accepted submission.
///
/// Created exactly once per successful request and owned by the storage
/// backend thereafter; never updated or deleted by this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Time-derived identifier: the acceptance instant in Unix milliseconds
    /// rendered as a decimal string. Collision-resistant, not guaranteed
    /// unique.
    pub id: String,
    /// Fixed grouping key, always [`SCHEDULE_PARTITION`].
    pub partition_key: String,
    /// Serialized form of the accepted duty batch.
    pub duties_json: String,
    /// Identity of the submitter.
    pub saved_by: String,
    /// Acceptance timestamp, assigned at write time.
    pub saved_at: DateTime<Utc>,
}

impl ScheduleEntry {
    /// Builds the entry persisted for an accepted batch.
    ///
    /// The entry id derives from the same instant as `saved_at` so the two
    /// always agree.
    pub fn new(
        batch: &DutyBatch,
        saved_by: impl Into<String>,
        saved_at: DateTime<Utc>,
    ) -> Result<Self> {
        Ok(Self {
            id: saved_at.timestamp_millis().to_string(),
            partition_key: SCHEDULE_PARTITION.to_string(),
            duties_json: batch.to_json()?,
            saved_by: saved_by.into(),
            saved_at,
        })
    }
}
