//! Room configuration.

use std::time::Duration;

use hexhaven_retry::RetryConfig;
use hexhaven_session::SessionConfig;
use serde::{Deserialize, Serialize};

/// Configuration shared by every room the registry creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Minimum players required to start the game.
    pub min_players: usize,

    /// Maximum players allowed in the room.
    pub max_players: usize,

    /// How long a room may sit with nobody connected before it is
    /// abandoned.
    pub empty_ttl_ms: u64,

    /// Capacity of the room actor's command channel.
    pub channel_size: usize,

    /// Disconnect grace period.
    pub session: SessionConfig,

    /// Snapshot ack timeout and retry policy.
    pub retry: RetryConfig,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 1,
            max_players: 4,
            empty_ttl_ms: 5 * 60 * 1000,
            channel_size: 64,
            session: SessionConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl RoomConfig {
    /// Fix out-of-range values so the config is safe to use.
    ///
    /// - `min_players` is at least 1, `max_players` at least `min_players`.
    /// - `channel_size` is at least 1.
    pub fn validated(mut self) -> Self {
        if self.min_players == 0 {
            tracing::warn!("min_players is 0, raising to 1");
            self.min_players = 1;
        }
        if self.max_players < self.min_players {
            tracing::warn!(
                min_players = self.min_players,
                max_players = self.max_players,
                "max_players below min_players, raising"
            );
            self.max_players = self.min_players;
        }
        self.channel_size = self.channel_size.max(1);
        self.retry = self.retry.validated();
        self
    }

    pub fn empty_ttl(&self) -> Duration {
        Duration::from_millis(self.empty_ttl_ms)
    }
}
