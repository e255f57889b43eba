//! JSON payloads of the check-in endpoint.
//!
//! Key casing differs between payloads (`error`, `Error`, `Result`, `Mode`)
//! because readers already in the field parse exactly these shapes.

use crate::messages::ResponseMessages;
use crate::validation::FormData;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkin_storage::BindParameter;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CheckinResponse {
    /// `{"error": ..}`: closed, or the request was rejected
    Failure { error: String },

    /// `{"Result": .., "warning"?: ..}`
    Outcome {
        #[serde(rename = "Result")]
        result: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },

    /// Dev echo of what would have been written
    DevEcho {
        #[serde(rename = "Mode")]
        mode: String,
        #[serde(rename = "Post")]
        post: FormData,
        query: Vec<BindParameter>,
        #[serde(skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },

    /// `{"Error": ..}`: a GET could not be answered
    LookupError {
        #[serde(rename = "Error")]
        error: String,
    },

    /// Daily meters and rank of one user
    Summary { user: String, daily: i64, ranking: u32 },
}

impl CheckinResponse {
    pub fn closed() -> Self {
        Self::failure(ResponseMessages::CLOSED)
    }

    pub fn failure(message: &str) -> Self {
        Self::Failure {
            error: message.to_string(),
        }
    }

    pub fn result(message: impl Into<String>) -> Self {
        Self::Outcome {
            result: message.into(),
            warning: None,
        }
    }

    pub fn connected() -> Self {
        Self::result(ResponseMessages::CONNECTED)
    }

    /// Outcome of an insert: a non-zero id counts as success
    pub fn recorded(id: i64) -> Self {
        if id != 0 {
            Self::result(ResponseMessages::success(id))
        } else {
            Self::result(ResponseMessages::RECORD_FAILED)
        }
    }

    pub fn dev_echo(post: FormData, query: Vec<BindParameter>) -> Self {
        Self::DevEcho {
            mode: ResponseMessages::DEV_MODE.to_string(),
            post,
            query,
            warning: None,
        }
    }

    pub fn lookup_error(message: impl Into<String>) -> Self {
        Self::LookupError {
            error: message.into(),
        }
    }

    pub fn summary(user: impl Into<String>, daily: i64, ranking: u32) -> Self {
        Self::Summary {
            user: user.into(),
            daily,
            ranking,
        }
    }

    /// Attach a warning to a POST outcome; other payloads are unchanged
    pub fn with_warning(mut self, message: &str) -> Self {
        if let Self::Outcome { warning, .. } | Self::DevEcho { warning, .. } = &mut self {
            *warning = Some(message.to_string());
        }
        self
    }
}

impl IntoResponse for CheckinResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}
