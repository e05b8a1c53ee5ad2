// ============================
// crates/router-lib/src/pool.rs
// ============================
//! Backend server pool and the load-aware selection policy.
use async_trait::async_trait;
use dashmap::DashMap;
use meeting_router_common::{Server, ServerId};

use crate::error::StoreError;

/// View of the backend server pool.
///
/// Implementations must make `increment_load` atomic: concurrent increments
/// against the same server never lose updates.
#[async_trait]
pub trait ServerPool: Send + Sync {
    /// Every server, enabled or not, in a stable iteration order
    async fn list_all(&self) -> Result<Vec<Server>, StoreError>;

    /// Servers eligible for new meetings
    async fn list_enabled(&self) -> Result<Vec<Server>, StoreError> {
        let servers = self.list_all().await?;
        Ok(servers.into_iter().filter(|s| s.enabled).collect())
    }

    /// Look up a single server
    async fn get(&self, server_id: &str) -> Result<Option<Server>, StoreError>;

    /// Add `delta` to the server's load counter
    async fn increment_load(&self, server_id: &str, delta: u64) -> Result<(), StoreError>;

    /// Pick the server a new meeting should go to
    async fn select_available(&self) -> Result<Option<Server>, StoreError> {
        let enabled = self.list_enabled().await?;
        Ok(least_loaded(&enabled).cloned())
    }
}

/// Lowest load among enabled servers; ties go to the smallest server id
pub fn least_loaded(servers: &[Server]) -> Option<&Server> {
    servers
        .iter()
        .filter(|s| s.enabled)
        .min_by(|a, b| a.load.cmp(&b.load).then_with(|| a.id.cmp(&b.id)))
}

/// In-process pool backed by `DashMap`.
///
/// Load updates happen under the shard write lock of the server's entry.
#[derive(Debug, Default)]
pub struct MemoryServerPool {
    servers: DashMap<ServerId, Server>,
}

impl MemoryServerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a pool from a list of servers; later duplicates replace earlier ones
    pub fn from_servers(servers: impl IntoIterator<Item = Server>) -> Self {
        let pool = Self::new();
        for server in servers {
            pool.add_server(server);
        }
        pool
    }

    /// Insert or replace a server record, returning the previous one
    pub fn add_server(&self, server: Server) -> Option<Server> {
        self.servers.insert(server.id.clone(), server)
    }

    /// Remove a server from the pool
    pub fn remove_server(&self, server_id: &str) -> Option<Server> {
        self.servers.remove(server_id).map(|(_, server)| server)
    }

    /// Toggle whether a server takes part in selection. Returns false if unknown.
    pub fn set_enabled(&self, server_id: &str, enabled: bool) -> bool {
        match self.servers.get_mut(server_id) {
            Some(mut server) => {
                server.enabled = enabled;
                true
            },
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[async_trait]
impl ServerPool for MemoryServerPool {
    async fn list_all(&self) -> Result<Vec<Server>, StoreError> {
        let mut servers: Vec<Server> = self
            .servers
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        servers.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(servers)
    }

    async fn get(&self, server_id: &str) -> Result<Option<Server>, StoreError> {
        Ok(self.servers.get(server_id).map(|entry| entry.value().clone()))
    }

    async fn increment_load(&self, server_id: &str, delta: u64) -> Result<(), StoreError> {
        let mut server = self
            .servers
            .get_mut(server_id)
            .ok_or_else(|| StoreError::UnknownServer(server_id.to_string()))?;
        server.load = server.load.saturating_add(delta);
        Ok(())
    }
}
