//! Server configuration.
//!
//! Everything has a default, so an empty JSON object is a valid config
//! file. The bind address can also come from `HEXHAVEN_BIND`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hexhaven_room::RoomConfig;
use serde::{Deserialize, Serialize};

use crate::HexhavenError;

/// Environment variable that overrides [`ServerConfig::bind_addr`].
pub const BIND_ENV: &str = "HEXHAVEN_BIND";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// A socket that sends nothing (not even a heartbeat) for this long
    /// is closed.
    pub idle_timeout_ms: u64,

    /// How long a new socket has to send `hello`.
    pub handshake_timeout_ms: u64,

    /// How often stopped rooms are swept from the registry.
    pub sweep_interval_ms: u64,

    /// JSON catalog of characters and scenarios. The built-in demo
    /// catalog is used when unset.
    pub catalog_path: Option<PathBuf>,

    pub room: RoomConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            idle_timeout_ms: 30_000,
            handshake_timeout_ms: 5_000,
            sweep_interval_ms: 30_000,
            catalog_path: None,
            room: RoomConfig::default(),
        }
    }
}

impl ServerConfig {
    /// # Errors
    /// Returns [`HexhavenError::Config`] on malformed JSON.
    pub fn from_json(json: &str) -> Result<Self, HexhavenError> {
        serde_json::from_str(json).map_err(HexhavenError::Config)
    }

    /// Reads the config file (if any), then applies `HEXHAVEN_BIND`.
    ///
    /// # Errors
    /// Returns [`HexhavenError::Io`] or [`HexhavenError::Config`] if the
    /// file can't be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, HexhavenError> {
        let config = match path {
            Some(path) => Self::from_json(&read_file(path)?)?,
            None => Self::default(),
        };
        Ok(config.with_bind_override(std::env::var(BIND_ENV).ok()))
    }

    /// Replaces the bind address when `bind` is a non-empty value.
    pub fn with_bind_override(mut self, bind: Option<String>) -> Self {
        if let Some(bind) = bind.filter(|b| !b.trim().is_empty()) {
            tracing::info!(bind_addr = %bind, "bind address overridden from environment");
            self.bind_addr = bind;
        }
        self
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

pub(crate) fn read_file(path: &Path) -> Result<String, HexhavenError> {
    std::fs::read_to_string(path).map_err(|source| HexhavenError::Io {
        path: path.display().to_string(),
        source,
    })
}
