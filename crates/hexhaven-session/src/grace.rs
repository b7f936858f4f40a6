//! Disconnect grace timers.
//!
//! Each disconnected player gets one spawned sleep. When it fires it posts
//! a [`GraceExpired`] to the room's channel; the room then calls
//! [`GraceTimers::claim`] to check the timer is still current. A reconnect
//! cancels the timer, and any message already in flight fails the claim.

use std::collections::HashMap;
use std::time::Duration;

use hexhaven_protocol::PlayerId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Posted when a grace timer runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceExpired {
    pub player_id: PlayerId,
    pub epoch: u64,
}

struct Timer {
    epoch: u64,
    task: JoinHandle<()>,
}

/// One grace timer per disconnected player.
pub struct GraceTimers {
    timers: HashMap<PlayerId, Timer>,
    next_epoch: u64,
    expired_tx: mpsc::UnboundedSender<GraceExpired>,
}

impl GraceTimers {
    /// Creates the timer set and the receiver the room listens on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GraceExpired>) {
        let (expired_tx, expired_rx) = mpsc::unbounded_channel();
        let timers = Self {
            timers: HashMap::new(),
            next_epoch: 0,
            expired_tx,
        };
        (timers, expired_rx)
    }

    /// Starts (or restarts) the grace timer for a player.
    pub fn start(&mut self, player_id: PlayerId, grace: Duration) {
        self.cancel(&player_id);

        self.next_epoch += 1;
        let epoch = self.next_epoch;
        let tx = self.expired_tx.clone();
        let expired = GraceExpired {
            player_id: player_id.clone(),
            epoch,
        };
        let task = tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            let _ = tx.send(expired);
        });

        tracing::debug!(%player_id, epoch, grace_ms = grace.as_millis() as u64, "grace timer started");
        self.timers.insert(player_id, Timer { epoch, task });
    }

    /// Stops a player's timer. Returns `true` if one was running.
    pub fn cancel(&mut self, player_id: &PlayerId) -> bool {
        match self.timers.remove(player_id) {
            Some(timer) => {
                timer.task.abort();
                tracing::debug!(%player_id, epoch = timer.epoch, "grace timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Accepts an expiry only if it comes from the player's current timer.
    pub fn claim(&mut self, expired: &GraceExpired) -> bool {
        match self.timers.get(&expired.player_id) {
            Some(timer) if timer.epoch == expired.epoch => {
                self.timers.remove(&expired.player_id);
                true
            }
            _ => false,
        }
    }

    pub fn is_running(&self, player_id: &PlayerId) -> bool {
        self.timers.contains_key(player_id)
    }

    pub fn cancel_all(&mut self) {
        for (_, timer) in self.timers.drain() {
            timer.task.abort();
        }
    }
}

impl Drop for GraceTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
