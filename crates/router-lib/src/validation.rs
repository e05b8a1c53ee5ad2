// ============================
// crates/router-lib/src/validation.rs
// ============================
//! Inbound parameter validation.

use meeting_router_common::{MeetingId, Params, MEETING_ID_PARAM};
use thiserror::Error;

const MAX_MEETING_ID_LENGTH: usize = 256;

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("You must specify the {0} parameter")]
    MissingParameter(&'static str),

    #[error("Invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

impl ValidationError {
    /// Protocol `messageKey`, e.g. `missingParamMeetingID`
    pub fn message_key(&self) -> String {
        match self {
            ValidationError::MissingParameter(name) => format!("missingParam{}", capitalize(name)),
            ValidationError::InvalidParameter { name, .. } => {
                format!("invalidParam{}", capitalize(name))
            },
        }
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Extract and validate the meeting identifier from a parameter set
pub fn meeting_id(params: &Params) -> ValidationResult<MeetingId> {
    let id = params
        .get(MEETING_ID_PARAM)
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .ok_or(ValidationError::MissingParameter(MEETING_ID_PARAM))?;

    if id.chars().count() > MAX_MEETING_ID_LENGTH {
        return Err(ValidationError::InvalidParameter {
            name: MEETING_ID_PARAM,
            reason: format!("must be at most {MAX_MEETING_ID_LENGTH} characters"),
        });
    }

    Ok(id.to_string())
}
