//! Completion handoff.
//!
//! When a scenario ends the room builds a [`MatchSummary`] and passes it to
//! a [`HistoryRecorder`]. Persisting it is somebody else's job.

use hexhaven_protocol::{PlayerSummary, RoomCode};
use serde::Serialize;

/// Final state of a finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchSummary {
    pub room_code: RoomCode,
    pub scenario_id: String,
    pub victory: bool,
    pub rounds_played: u32,
    pub players: Vec<PlayerSummary>,
    /// Snapshot deliveries that ran out of retries during the match.
    pub snapshot_failures: u32,
}

/// Receives match summaries. Called from inside the room actor, so
/// implementations must not block; spawn if the work is slow.
pub trait HistoryRecorder: Send + Sync + 'static {
    fn record(&self, summary: MatchSummary);
}

/// Logs the summary and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

impl HistoryRecorder for TracingRecorder {
    fn record(&self, summary: MatchSummary) {
        tracing::info!(
            room_code = %summary.room_code,
            scenario_id = %summary.scenario_id,
            victory = summary.victory,
            rounds = summary.rounds_played,
            players = summary.players.len(),
            snapshot_failures = summary.snapshot_failures,
            "match completed"
        );
    }
}
