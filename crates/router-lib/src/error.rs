// crates/router-lib/src/error.rs

//! Central error types + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use meeting_router_common::{ProtocolError, ServerId, RETURN_FAILED};
use thiserror::Error;

use crate::validation::ValidationError;

/// Failure taxonomy surfaced by every routing operation
#[derive(Error, Debug)]
pub enum RouterError {
    /// No affinity exists for the meeting, or a must-exist call hit an absent meeting
    #[error("Meeting not found")]
    MeetingNotFound,

    /// Every server is disabled or the pool is empty
    #[error("No server available to host the meeting")]
    NoAvailableServer,

    /// Structured failure reported by the backend, passed through verbatim
    #[error("Backend error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Transport failure, malformed reply or store failure. The cause is
    /// logged where it happens and never carried here.
    #[error("Internal error")]
    Internal,

    /// Inbound request failed parameter validation
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),
}

/// Failures of the directory and pool backends
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("unknown server: {0}")]
    UnknownServer(ServerId),
}

impl From<StoreError> for RouterError {
    fn from(err: StoreError) -> Self {
        tracing::error!(error = %err, "state store failure");
        RouterError::Internal
    }
}

impl RouterError {
    /// Get the HTTP status code for this error.
    ///
    /// Failures the backend protocol itself can express are delivered with
    /// `200 OK` and a `FAILED` body, as backends do.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouterError::MeetingNotFound
            | RouterError::Protocol(_)
            | RouterError::Validation(_) => StatusCode::OK,
            RouterError::NoAvailableServer => StatusCode::SERVICE_UNAVAILABLE,
            RouterError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the protocol `messageKey` for this error
    pub fn message_key(&self) -> String {
        match self {
            RouterError::MeetingNotFound => "notFound".to_string(),
            RouterError::NoAvailableServer | RouterError::Internal => "internalError".to_string(),
            RouterError::Protocol(err) => err.message_key.clone(),
            RouterError::Validation(err) => err.message_key(),
        }
    }

    /// Get a message that is safe to hand to clients
    pub fn sanitized_message(&self) -> String {
        match self {
            RouterError::MeetingNotFound => {
                "We could not find a meeting with that meeting ID".to_string()
            },
            RouterError::NoAvailableServer => {
                "The service is temporarily unavailable, please try again later".to_string()
            },
            RouterError::Internal => "An internal error occurred".to_string(),
            RouterError::Protocol(err) => err.message.clone(),
            RouterError::Validation(err) => err.to_string(),
        }
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "response": {
                "returncode": RETURN_FAILED,
                "messageKey": self.message_key(),
                "message": self.sanitized_message(),
            }
        });

        (self.status_code(), axum::Json(body)).into_response()
    }
}
