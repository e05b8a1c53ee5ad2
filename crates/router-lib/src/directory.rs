// ============================
// crates/router-lib/src/directory.rs
// ============================
//! Meeting directory: the durable meeting -> server affinity map.
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use meeting_router_common::{Meeting, MeetingId, ServerId};

use crate::error::StoreError;

/// Result of claiming a meeting identifier for a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    /// Server that owns the meeting after the call
    pub server_id: ServerId,
    /// Whether this call created the mapping
    pub created: bool,
}

/// Storage contract for meeting affinity.
///
/// `create_if_absent` must be atomic across concurrent callers for the same
/// meeting id (first writer wins). `delete` is idempotent.
#[async_trait]
pub trait MeetingDirectory: Send + Sync {
    /// Owning server of a meeting, if one is recorded
    async fn get(&self, meeting_id: &str) -> Result<Option<ServerId>, StoreError>;

    /// Record `server_id` as owner unless a mapping already exists
    async fn create_if_absent(
        &self,
        meeting_id: &str,
        server_id: &str,
    ) -> Result<Assignment, StoreError>;

    /// Forget a meeting; absent meetings are not an error
    async fn delete(&self, meeting_id: &str) -> Result<(), StoreError>;
}

/// Single-process directory backed by `DashMap`
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    meetings: DashMap<MeetingId, ServerId>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded meeting, sorted by id
    pub fn meetings(&self) -> Vec<Meeting> {
        let mut meetings: Vec<Meeting> = self
            .meetings
            .iter()
            .map(|entry| Meeting {
                id: entry.key().clone(),
                server_id: entry.value().clone(),
            })
            .collect();
        meetings.sort_by(|a, b| a.id.cmp(&b.id));
        meetings
    }

    pub fn len(&self) -> usize {
        self.meetings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meetings.is_empty()
    }
}

#[async_trait]
impl MeetingDirectory for MemoryDirectory {
    async fn get(&self, meeting_id: &str) -> Result<Option<ServerId>, StoreError> {
        Ok(self.meetings.get(meeting_id).map(|entry| entry.value().clone()))
    }

    async fn create_if_absent(
        &self,
        meeting_id: &str,
        server_id: &str,
    ) -> Result<Assignment, StoreError> {
        let assignment = match self.meetings.entry(meeting_id.to_string()) {
            Entry::Occupied(existing) => Assignment {
                server_id: existing.get().clone(),
                created: false,
            },
            Entry::Vacant(slot) => {
                slot.insert(server_id.to_string());
                Assignment {
                    server_id: server_id.to_string(),
                    created: true,
                }
            },
        };
        Ok(assignment)
    }

    async fn delete(&self, meeting_id: &str) -> Result<(), StoreError> {
        self.meetings.remove(meeting_id);
        Ok(())
    }
}
