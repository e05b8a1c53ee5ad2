// ============================
// crates/router-lib/src/engine.rs
// ============================
//! Meeting routing and affinity engine.
//!
//! Assigns new meetings to the least loaded enabled server, resolves existing
//! meetings to their owner for every later call, drops stale affinity when a
//! backend says it no longer knows a meeting, and fans `getMeetings` out to
//! every server. The engine keeps no mutable state of its own; all of it
//! lives behind the directory and pool traits.
use std::sync::Arc;

use futures_util::future::try_join_all;
use meeting_router_common::{
    meetings_payload, no_meetings_payload, not_running_payload, Operation, Params, Payload,
    Server, MEETING_ID_PARAM,
};
use metrics::counter;
use serde_json::Value;
use url::Url;

use crate::directory::MeetingDirectory;
use crate::error::RouterError;
use crate::metrics::{
    AFFINITY_REPAIRED, BROADCAST_QUERY, JOIN_REDIRECT, MEETING_CREATED, MEETING_REUSED,
    RELAY_PROTOCOL_ERROR, RELAY_TRANSPORT_ERROR,
};
use crate::pool::ServerPool;
use crate::relay::{ProtocolRelay, RelayError, RequestSigner};

/// Result of a create call
#[derive(Debug, Clone)]
pub struct CreateOutcome {
    /// Server that owns the meeting
    pub server: Server,
    /// False when an existing assignment was reused
    pub is_new: bool,
    /// Backend reply to the `create` call
    pub payload: Payload,
}

/// Routes backend protocol calls to the server owning each meeting
pub struct RoutingEngine {
    directory: Arc<dyn MeetingDirectory>,
    pool: Arc<dyn ServerPool>,
    relay: Arc<dyn ProtocolRelay>,
    signer: RequestSigner,
}

impl RoutingEngine {
    pub fn new(
        directory: Arc<dyn MeetingDirectory>,
        pool: Arc<dyn ServerPool>,
        relay: Arc<dyn ProtocolRelay>,
    ) -> Self {
        Self {
            directory,
            pool,
            relay,
            signer: RequestSigner::new(),
        }
    }

    /// Least loaded enabled server
    pub async fn select_available(&self) -> Result<Server, RouterError> {
        self.pool
            .select_available()
            .await?
            .ok_or(RouterError::NoAvailableServer)
    }

    /// Create a meeting, or reuse the server already recorded for it.
    ///
    /// The directory entry and the load increment are committed before the
    /// backend is contacted, so a retry after a lost reply lands on the same
    /// server without counting the meeting twice.
    #[tracing::instrument(skip(self, params))]
    pub async fn create(
        &self,
        meeting_id: &str,
        params: &Params,
    ) -> Result<CreateOutcome, RouterError> {
        let candidate = self.select_available().await?;
        let assignment = self
            .directory
            .create_if_absent(meeting_id, &candidate.id)
            .await?;

        let server = if assignment.server_id == candidate.id {
            candidate
        } else {
            self.server_by_id(meeting_id, &assignment.server_id).await?
        };

        if assignment.created {
            self.pool.increment_load(&server.id, 1).await?;
            counter!(MEETING_CREATED, "server" => server.id.clone()).increment(1);
            tracing::info!(server_id = %server.id, "meeting assigned");
        } else {
            counter!(MEETING_REUSED).increment(1);
            tracing::debug!(server_id = %server.id, "reusing existing assignment");
        }

        let payload = self
            .forward(meeting_id, Operation::Create, &server, params)
            .await?;

        Ok(CreateOutcome {
            server,
            is_new: assignment.created,
            payload,
        })
    }

    /// `getMeetingInfo` on the owning server; the meeting must be known
    pub async fn get_meeting_info(
        &self,
        meeting_id: &str,
        params: &Params,
    ) -> Result<Payload, RouterError> {
        self.resolve_and_forward(meeting_id, Operation::GetMeetingInfo, params)
            .await
    }

    /// `isMeetingRunning` on the owning server; unknown meetings are not running
    pub async fn is_meeting_running(
        &self,
        meeting_id: &str,
        params: &Params,
    ) -> Result<Payload, RouterError> {
        self.resolve_and_forward(meeting_id, Operation::IsMeetingRunning, params)
            .await
    }

    /// `end` on the owning server; the meeting must be known
    pub async fn end(&self, meeting_id: &str, params: &Params) -> Result<Payload, RouterError> {
        self.resolve_and_forward(meeting_id, Operation::End, params)
            .await
    }

    /// Resolve a meeting to its server and relay `operation` there.
    ///
    /// Operations with a defined answer for absent meetings short-circuit
    /// with it; the others fail with `MeetingNotFound`.
    #[tracing::instrument(skip(self, params))]
    pub async fn resolve_and_forward(
        &self,
        meeting_id: &str,
        operation: Operation,
        params: &Params,
    ) -> Result<Payload, RouterError> {
        match self.lookup(meeting_id).await? {
            Some(server) => self.forward(meeting_id, operation, &server, params).await,
            None => absent_answer(operation).ok_or(RouterError::MeetingNotFound),
        }
    }

    /// Signed backend URL a client should be redirected to for joining.
    /// Never contacts the backend.
    pub async fn join_url(&self, meeting_id: &str, params: &Params) -> Result<Url, RouterError> {
        let server = self
            .lookup(meeting_id)
            .await?
            .ok_or(RouterError::MeetingNotFound)?;

        let url = self
            .signer
            .signed_url(&server, Operation::Join, &with_meeting_id(params, meeting_id))
            .map_err(|e| {
                tracing::error!(%meeting_id, server_id = %server.id, error = %e, "failed to build join url");
                RouterError::Internal
            })?;

        counter!(JOIN_REDIRECT, "server" => server.id.clone()).increment(1);
        Ok(url)
    }

    /// Query every server, enabled or not, and merge their meeting lists in
    /// pool order. Any failure aborts the whole query.
    pub async fn get_meetings(&self) -> Result<Payload, RouterError> {
        let servers = self.pool.list_all().await?;
        counter!(BROADCAST_QUERY).increment(1);

        let params = Params::new();
        let per_server =
            try_join_all(servers.iter().map(|server| self.query_meetings(server, &params))).await?;

        let meetings: Vec<Value> = per_server.into_iter().flatten().collect();
        if meetings.is_empty() {
            Ok(no_meetings_payload())
        } else {
            Ok(meetings_payload(meetings))
        }
    }

    async fn query_meetings(
        &self,
        server: &Server,
        params: &Params,
    ) -> Result<Vec<Value>, RouterError> {
        match self.relay.invoke(Operation::GetMeetings, server, params).await {
            Ok(payload) => Ok(meeting_entries(&payload)),
            Err(RelayError::Protocol(err)) if err.is_no_meetings() => Ok(Vec::new()),
            Err(err) => Err(classify(Operation::GetMeetings, server, err)),
        }
    }

    async fn lookup(&self, meeting_id: &str) -> Result<Option<Server>, RouterError> {
        match self.directory.get(meeting_id).await? {
            Some(server_id) => self.server_by_id(meeting_id, &server_id).await.map(Some),
            None => Ok(None),
        }
    }

    async fn server_by_id(&self, meeting_id: &str, server_id: &str) -> Result<Server, RouterError> {
        self.pool.get(server_id).await?.ok_or_else(|| {
            tracing::error!(%meeting_id, %server_id, "meeting mapped to a server missing from the pool");
            RouterError::Internal
        })
    }

    /// Relay one call; a backend `notFound` drops the meeting's affinity
    /// before the error is returned.
    async fn forward(
        &self,
        meeting_id: &str,
        operation: Operation,
        server: &Server,
        params: &Params,
    ) -> Result<Payload, RouterError> {
        let params = with_meeting_id(params, meeting_id);
        match self.relay.invoke(operation, server, &params).await {
            Ok(payload) => Ok(payload),
            Err(RelayError::Protocol(err)) if err.is_not_found() => {
                self.repair_affinity(meeting_id, server).await;
                Err(classify(operation, server, RelayError::Protocol(err)))
            },
            Err(err) => Err(classify(operation, server, err)),
        }
    }

    async fn repair_affinity(&self, meeting_id: &str, server: &Server) {
        match self.directory.delete(meeting_id).await {
            Ok(()) => {
                counter!(AFFINITY_REPAIRED, "server" => server.id.clone()).increment(1);
                tracing::info!(%meeting_id, server_id = %server.id, "backend forgot meeting, affinity removed");
            },
            Err(e) => {
                tracing::warn!(%meeting_id, server_id = %server.id, error = %e, "failed to remove stale affinity");
            },
        }
    }
}

/// Answer for operations that have one when the meeting is unknown
fn absent_answer(operation: Operation) -> Option<Payload> {
    match operation {
        Operation::IsMeetingRunning => Some(not_running_payload()),
        _ => None,
    }
}

/// Map a relay failure onto the router taxonomy, logging transport causes
fn classify(operation: Operation, server: &Server, err: RelayError) -> RouterError {
    match err {
        RelayError::Protocol(err) => {
            counter!(RELAY_PROTOCOL_ERROR, "server" => server.id.clone()).increment(1);
            tracing::debug!(%operation, server_id = %server.id, message_key = %err.message_key, "backend returned an error");
            RouterError::Protocol(err)
        },
        RelayError::Transport(cause) => {
            counter!(RELAY_TRANSPORT_ERROR, "server" => server.id.clone()).increment(1);
            tracing::error!(%operation, server_id = %server.id, error = %cause, "relay call failed");
            RouterError::Internal
        },
    }
}

fn with_meeting_id(params: &Params, meeting_id: &str) -> Params {
    let mut params = params.clone();
    params.insert(MEETING_ID_PARAM.to_string(), meeting_id.to_string());
    params
}

/// Meeting entries of a `getMeetings` reply
fn meeting_entries(payload: &Payload) -> Vec<Value> {
    match payload.get("meetings") {
        Some(Value::Array(meetings)) => meetings.clone(),
        _ => Vec::new(),
    }
}
