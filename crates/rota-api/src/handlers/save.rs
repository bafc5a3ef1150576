//! Duty-schedule submission handler.
//!
//! Validates the request body against the batch shape and persists a single
//! schedule entry with derived metadata. Runs behind the principal gate, so
//! the caller is authenticated and authorized by the time this executes.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rota_core::{BatchError, ClientPrincipal, DutyBatch, ScheduleEntry};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::server::AppState;

/// Standard error body for every rejection.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Explanatory, non-sensitive message.
    pub error: String,
}

impl ErrorResponse {
    /// Creates an error body with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: message.into() }
    }
}

/// Response for an accepted submission.
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    /// Always `true`; rejections use [`ErrorResponse`] instead.
    pub success: bool,
    /// Acceptance timestamp, matching the persisted entry.
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
}

/// Handles `POST /api/duties`.
///
/// Pipeline after the gate: body parse, batch shape check, storage
/// configuration check, one persistence write. The first failing stage
/// terminates the request with its status; backend failures are reported
/// opaquely.
#[instrument(
    name = "save_duties",
    skip(state, principal, body),
    fields(user = %principal.submitter_identity())
)]
pub async fn save_duties(
    State(state): State<AppState>,
    Extension(principal): Extension<ClientPrincipal>,
    body: Bytes,
) -> Response {
    info!("processing duty schedule submission");

    let batch = match DutyBatch::parse(&body) {
        Ok(batch) => batch,
        Err(err) => {
            warn!(error = %err, "request rejected: invalid payload");
            return batch_error_response(&err);
        },
    };

    let Some(store) = &state.store else {
        error!("DATABASE_URL is not configured; rejecting submission");
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Server configuration error: DATABASE_URL not set",
        );
    };

    let saved_at = DateTime::<Utc>::from(state.clock.now_system());
    let saved_by = principal.submitter_identity().to_string();

    let entry = match ScheduleEntry::new(&batch, saved_by, saved_at) {
        Ok(entry) => entry,
        Err(err) => {
            error!(error = %err, "failed to serialize duty batch");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        },
    };

    let entry_id = entry.id.clone();
    match store.create_entry(entry).await {
        Ok(()) => {
            info!(id = %entry_id, duties = batch.len(), "duty schedule saved");
            (StatusCode::OK, Json(SaveResponse { success: true, saved_at })).into_response()
        },
        Err(err) => {
            error!(error = %err, "failed to persist duty schedule");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        },
    }
}

/// Maps a batch validation failure to its 400 response.
fn batch_error_response(err: &BatchError) -> Response {
    let message = match err {
        BatchError::InvalidJson => "Bad Request: Invalid JSON body",
        BatchError::MissingOrEmpty => "Bad Request: duties must be a non-empty array",
        BatchError::MalformedDuty => "Bad Request: each duty must have id, day, member as strings",
    };

    error_response(StatusCode::BAD_REQUEST, message)
}

/// Creates a standardized error response.
fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_errors_map_to_bad_request() {
        for err in
            [BatchError::InvalidJson, BatchError::MissingOrEmpty, BatchError::MalformedDuty]
        {
            let response = batch_error_response(&err);
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }
}
