// ================
// common/src/lib.rs
// ================
//! Common types shared between the router library, its binary and tests.
//! This module defines the backend protocol vocabulary the router speaks:
//! call names, parameter sets, payloads, server records and the canonical
//! replies the router synthesises on its own.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Client-supplied meeting identifier
pub type MeetingId = String;

/// Identifier of a backend server in the pool
pub type ServerId = String;

/// Operation parameters, ordered by name so signed query strings are stable
pub type Params = BTreeMap<String, String>;

/// Decoded body of a backend reply (the object inside `response`)
pub type Payload = serde_json::Map<String, Value>;

/// Name of the meeting identifier parameter in every meeting-scoped call
pub const MEETING_ID_PARAM: &str = "meetingID";

/// `returncode` value for successful replies
pub const RETURN_SUCCESS: &str = "SUCCESS";

/// `returncode` value for failed replies
pub const RETURN_FAILED: &str = "FAILED";

/// Message key a backend uses when it does not know a meeting
pub const NOT_FOUND_KEY: &str = "notFound";

/// Message key a backend uses when it hosts no meetings
pub const NO_MEETINGS_KEY: &str = "noMeetings";

/// Backend protocol calls the router knows how to route
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    /// Create a meeting on a backend
    Create,
    /// Fetch details of a running meeting
    GetMeetingInfo,
    /// Ask whether a meeting is running
    IsMeetingRunning,
    /// Forcibly end a meeting
    End,
    /// Join a meeting (redirect only, never relayed)
    Join,
    /// List every meeting hosted by a backend
    GetMeetings,
}

impl Operation {
    /// The call name as it appears in backend URLs
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::GetMeetingInfo => "getMeetingInfo",
            Operation::IsMeetingRunning => "isMeetingRunning",
            Operation::End => "end",
            Operation::Join => "join",
            Operation::GetMeetings => "getMeetings",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A backend conferencing server as seen by the router
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Server {
    /// Stable identifier, also the selection tie-breaker
    pub id: ServerId,
    /// Base address of the backend API (e.g. `https://bbb1.example.com/bigbluebutton/api/`)
    pub url: String,
    /// Shared secret used to sign calls to this backend
    pub secret: String,
    /// Advisory count of meetings the router assigned here
    #[serde(default)]
    pub load: u64,
    /// Whether the server takes part in selection for new meetings
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl Server {
    /// Create an enabled server with zero load
    pub fn new(id: impl Into<ServerId>, url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            secret: secret.into(),
            load: 0,
            enabled: true,
        }
    }
}

/// Affinity record: which server owns a meeting
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Meeting {
    /// Client-supplied identifier
    pub id: MeetingId,
    /// Owning server, fixed for the lifetime of the record
    pub server_id: ServerId,
}

/// Structured failure reported by a backend (`returncode=FAILED`)
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProtocolError {
    /// Machine-readable kind, e.g. `notFound`
    #[serde(rename = "messageKey")]
    pub message_key: String,
    /// Human-readable explanation from the backend
    pub message: String,
}

impl ProtocolError {
    pub fn new(message_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message_key: message_key.into(),
            message: message.into(),
        }
    }

    /// Whether the backend says it does not know the meeting
    pub fn is_not_found(&self) -> bool {
        self.message_key == NOT_FOUND_KEY
    }

    /// Whether the backend says it hosts no meetings
    pub fn is_no_meetings(&self) -> bool {
        self.message_key == NO_MEETINGS_KEY
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.message_key, self.message)
    }
}

impl std::error::Error for ProtocolError {}

/// Canonical reply for `isMeetingRunning` on a meeting nobody hosts
pub fn not_running_payload() -> Payload {
    object(json!({
        "returncode": RETURN_SUCCESS,
        "running": false,
    }))
}

/// Canonical reply for a broadcast `getMeetings` that found nothing
pub fn no_meetings_payload() -> Payload {
    object(json!({
        "returncode": RETURN_SUCCESS,
        "meetings": [],
        "messageKey": NO_MEETINGS_KEY,
        "message": "no meetings were found on this server",
    }))
}

/// Reply carrying a merged list of meetings
pub fn meetings_payload(meetings: Vec<Value>) -> Payload {
    object(json!({
        "returncode": RETURN_SUCCESS,
        "meetings": meetings,
    }))
}

fn object(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}
