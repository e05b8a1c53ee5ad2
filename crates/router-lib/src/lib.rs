// ============================
// meeting-router-lib/src/lib.rs
// ============================
//! Core functionality of the meeting router: a request-routing layer that
//! keeps every meeting on the backend conferencing server that created it.

pub mod api;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod pool;
pub mod relay;
pub mod validation;

use std::sync::Arc;

use crate::config::Settings;
use crate::directory::MemoryDirectory;
use crate::engine::RoutingEngine;
use crate::pool::MemoryServerPool;
use crate::relay::HttpRelay;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Routing engine
    pub engine: Arc<RoutingEngine>,
    /// Configuration settings
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Create a new application state around an engine
    pub fn new(engine: RoutingEngine, settings: Settings) -> Self {
        Self {
            engine: Arc::new(engine),
            settings: Arc::new(settings),
        }
    }

    /// Build the in-process directory, a pool seeded from the settings and
    /// an HTTP relay
    pub fn from_settings(settings: Settings) -> anyhow::Result<Self> {
        let pool = Arc::new(MemoryServerPool::from_servers(settings.pool_servers()));
        let directory = Arc::new(MemoryDirectory::new());
        let relay = Arc::new(HttpRelay::new(settings.relay.timeout())?);

        tracing::info!(servers = pool.len(), "server pool initialised");

        let engine = RoutingEngine::new(directory, pool, relay);
        Ok(Self::new(engine, settings))
    }
}
