// ============================
// crates/router-lib/src/config.rs
// ============================
//! Configuration management.
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, ensure, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use meeting_router_common::Server;
use serde::{Deserialize, Serialize};
use url::Url;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "meeting-router.toml";

/// Prefix of environment overrides, nested keys separated by `__`
pub const ENV_PREFIX: &str = "MEETING_ROUTER_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Address the inbound API listens on
    pub bind_addr: SocketAddr,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
    /// Path prefix of the backend-compatible API
    pub api_path: String,
    /// Outbound relay settings
    pub relay: RelaySettings,
    /// Backend servers seeded into the pool at startup
    #[serde(default)]
    pub servers: Vec<ServerSettings>,
}

/// Outbound call settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelaySettings {
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
}

/// One backend server entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    pub id: String,
    pub url: String,
    pub secret: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub load: u64,
}

fn default_enabled() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8090)),
            log_level: "info".to_string(),
            api_path: "/bigbluebutton/api".to_string(),
            relay: RelaySettings::default(),
            servers: Vec::new(),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

impl RelaySettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl From<&ServerSettings> for Server {
    fn from(settings: &ServerSettings) -> Self {
        Server {
            id: settings.id.clone(),
            url: settings.url.clone(),
            secret: settings.secret.clone(),
            load: settings.load,
            enabled: settings.enabled,
        }
    }
}

impl Settings {
    /// Load settings from defaults, `meeting-router.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from defaults, the given TOML file and the environment.
    /// A missing file is not an error; environment variables take precedence.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("failed to load settings from {}", path.display()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check the settings for values the router cannot run with
    pub fn validate(&self) -> Result<()> {
        ensure!(
            LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()),
            "invalid log level: {}",
            self.log_level
        );
        ensure!(self.relay.timeout_secs > 0, "relay timeout must be positive");
        ensure!(
            self.api_path.starts_with('/') && self.api_path.len() > 1 && !self.api_path.ends_with('/'),
            "api_path must start with '/' and must not end with '/': {}",
            self.api_path
        );

        let mut seen = HashSet::new();
        for server in &self.servers {
            if server.id.trim().is_empty() {
                bail!("server id must not be empty");
            }
            if !seen.insert(server.id.as_str()) {
                bail!("duplicate server id: {}", server.id);
            }
            let url = Url::parse(&server.url)
                .with_context(|| format!("invalid url for server {}", server.id))?;
            ensure!(
                matches!(url.scheme(), "http" | "https"),
                "server {} must use http or https",
                server.id
            );
            ensure!(!server.secret.is_empty(), "server {} has an empty secret", server.id);
        }

        Ok(())
    }

    /// Server records to seed the pool with
    pub fn pool_servers(&self) -> Vec<Server> {
        self.servers.iter().map(Server::from).collect()
    }
}
