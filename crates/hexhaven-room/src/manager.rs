//! Room registry: creates rooms, resolves codes, and evicts dead rooms.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use hexhaven_protocol::RoomCode;
use parking_lot::RwLock;
use rand::Rng;

use crate::room::spawn_room;
use crate::{Catalog, HistoryRecorder, RoomConfig, RoomError, RoomHandle, RoomInfo};

/// Alphabet for generated room codes. No 0/O or 1/I.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

/// Maps room codes to running room actors.
///
/// Shared across every connection handler behind an `Arc`. The lock is
/// only held for map lookups, never across an `.await`.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomCode, RoomHandle>>,
    config: RoomConfig,
    catalog: Arc<dyn Catalog>,
    recorder: Arc<dyn HistoryRecorder>,
}

impl RoomRegistry {
    pub fn new(
        config: RoomConfig,
        catalog: Arc<dyn Catalog>,
        recorder: Arc<dyn HistoryRecorder>,
    ) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config: config.validated(),
            catalog,
            recorder,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Creates a room for `scenario_id` under a fresh code.
    ///
    /// # Errors
    /// Returns [`RoomError::UnknownScenario`] if the catalog lacks it.
    pub fn create_room(&self, scenario_id: &str) -> Result<RoomHandle, RoomError> {
        let scenario = self
            .catalog
            .scenario(scenario_id)
            .ok_or_else(|| RoomError::UnknownScenario(scenario_id.to_string()))?;

        let mut rooms = self.rooms.write();
        let code = loop {
            let code = generate_room_code();
            if !rooms.contains_key(&code) {
                break code;
            }
        };
        let handle = spawn_room(
            code.clone(),
            self.config.clone(),
            scenario,
            Arc::clone(&self.catalog),
            Arc::clone(&self.recorder),
        );
        rooms.insert(code.clone(), handle.clone());
        drop(rooms);

        tracing::info!(room_code = %code, %scenario_id, "room created");
        Ok(handle)
    }

    /// Resolves a code to a live room.
    ///
    /// # Errors
    /// Returns [`RoomError::NotFound`] if no running room has this code.
    pub fn get(&self, code: &RoomCode) -> Result<RoomHandle, RoomError> {
        self.rooms
            .read()
            .get(code)
            .filter(|handle| !handle.is_closed())
            .cloned()
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    /// Drops a room from the registry. Its actor stops once every
    /// other handle is gone.
    pub fn evict(&self, code: &RoomCode) -> bool {
        let removed = self.rooms.write().remove(code).is_some();
        if removed {
            tracing::info!(room_code = %code, "room evicted");
        }
        removed
    }

    /// Evicts rooms whose actor has stopped. Returns how many went.
    pub fn sweep(&self) -> usize {
        let mut rooms = self.rooms.write();
        let before = rooms.len();
        rooms.retain(|code, handle| {
            let alive = !handle.is_closed();
            if !alive {
                tracing::info!(room_code = %code, "stopped room swept");
            }
            alive
        });
        before - rooms.len()
    }

    /// Sweeps every `interval` until the registry is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let swept = registry.sweep();
                if swept > 0 {
                    tracing::debug!(swept, remaining = registry.len(), "room sweep");
                }
            }
        })
    }

    /// Queries every live room. Rooms that fail to answer are skipped.
    pub async fn list(&self) -> Vec<RoomInfo> {
        let handles: Vec<RoomHandle> = self.rooms.read().values().cloned().collect();
        let mut infos = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(info) = handle.info().await {
                infos.push(info);
            }
        }
        infos.sort_by(|a, b| a.room_code.as_str().cmp(b.room_code.as_str()));
        infos
    }

    pub fn len(&self) -> usize {
        self.rooms.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.read().is_empty()
    }

    /// Stops every room and empties the registry.
    pub async fn shutdown_all(&self) {
        let handles: Vec<RoomHandle> = self.rooms.write().drain().map(|(_, h)| h).collect();
        tracing::info!(rooms = handles.len(), "shutting down all rooms");
        for handle in handles {
            let _ = handle.shutdown().await;
        }
    }
}

fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    let raw: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    match RoomCode::parse(&raw) {
        Ok(code) => code,
        Err(_) => generate_room_code(),
    }
}
