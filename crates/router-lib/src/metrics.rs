// ==============
// crates/router-lib/src/metrics.rs

//! Central place for metric keys
pub const MEETING_CREATED: &str = "router.meeting.created";
pub const MEETING_REUSED: &str = "router.meeting.reused";
pub const AFFINITY_REPAIRED: &str = "router.affinity.repaired";
pub const RELAY_PROTOCOL_ERROR: &str = "router.relay.protocol_error";
pub const RELAY_TRANSPORT_ERROR: &str = "router.relay.transport_error";
pub const BROADCAST_QUERY: &str = "router.broadcast.query";
pub const JOIN_REDIRECT: &str = "router.join.redirect";
