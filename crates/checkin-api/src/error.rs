//! Service error types
//!
//! Startup failures propagate to `main`. Request-time failures are turned
//! into the endpoint's JSON payloads, always with status 200, and logged.

use crate::messages::ResponseMessages;
use crate::response::CheckinResponse;
use crate::validation::ValidationError;
use axum::response::{IntoResponse, Response};
use checkin_storage::StorageError;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Configuration sources could not be read or deserialized
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A configuration value has the wrong format
    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    /// Reader request did not pass the field rules
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A scan could not be written
    #[error("Recording scan failed: {0}")]
    RecordFailed(#[source] StorageError),

    /// Database read failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match &self {
            Self::Validation(e) => {
                warn!(error = %e, "rejected reader request");
                CheckinResponse::failure(ResponseMessages::VALIDATION_FAILED)
            }
            Self::RecordFailed(e) => {
                error!(error = %e, "scan not recorded");
                CheckinResponse::result(ResponseMessages::RECORD_FAILED)
            }
            Self::Storage(e) => {
                error!(error = %e, "database read failed");
                CheckinResponse::lookup_error(ResponseMessages::DATABASE_UNAVAILABLE)
            }
            Self::Config(_) | Self::InvalidSetting { .. } => {
                error!(error = %self, "unexpected error while serving request");
                CheckinResponse::failure(ResponseMessages::INTERNAL_ERROR)
            }
        };
        body.into_response()
    }
}
