//! Acknowledged snapshot delivery.
//!
//! A snapshot is only useful if the client actually applied it, so every
//! delivery waits for an application-level `snapshot_ack`. Waiting happens
//! in a detached task per delivery; the room actor is never blocked.
//!
//! ```text
//! room ── deliver() ──→ task: send ─ ack? ─ backoff ─ send ─ ack? ─ …
//!   ↑                      │
//!   └── DeliveryReport ────┘  (Delivered / Failed)
//! room ── acknowledge() ──→ task's ack channel
//! ```
//!
//! At most one delivery per player is pending. A newer delivery aborts the
//! older one, and so do [`defer`](DeliveryTracker::defer) and
//! [`cancel_all`](DeliveryTracker::cancel_all).

use std::collections::HashMap;
use std::sync::Arc;

use hexhaven_protocol::{DeliveryId, PlayerId};
use hexhaven_retry::{RetryConfig, RetrySchedule};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

/// Where a delivery task pushes its payload.
///
/// Every attempt passes the same `Arc`, so a redelivery carries exactly
/// the bytes of the first one.
pub trait DeliverySink<M>: Send + Sync + 'static {
    /// Returns `false` if the socket could not be reached.
    fn deliver(&self, message: Arc<M>) -> bool;
}

/// Final result of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { attempts: u32 },
    /// Every retry was used without a positive ack.
    Failed { attempts: u32 },
}

/// Sent to the room when a delivery task finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub player_id: PlayerId,
    pub delivery_id: DeliveryId,
    pub outcome: DeliveryOutcome,
}

struct Pending {
    delivery_id: DeliveryId,
    ack_tx: mpsc::UnboundedSender<bool>,
    task: JoinHandle<()>,
}

/// Pending deliveries for one room, keyed by player.
pub struct DeliveryTracker {
    config: RetryConfig,
    next_id: u64,
    pending: HashMap<PlayerId, Pending>,
    report_tx: mpsc::UnboundedSender<DeliveryReport>,
}

impl DeliveryTracker {
    /// Creates the tracker and the receiver the room listens on for
    /// [`DeliveryReport`]s.
    pub fn new(config: RetryConfig) -> (Self, mpsc::UnboundedReceiver<DeliveryReport>) {
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let tracker = Self {
            config: config.validated(),
            next_id: 0,
            pending: HashMap::new(),
            report_tx,
        };
        (tracker, report_rx)
    }

    /// Starts delivering a message built for a fresh [`DeliveryId`].
    ///
    /// Any delivery still pending for this player is superseded.
    pub fn deliver<M, S>(
        &mut self,
        player_id: PlayerId,
        sink: S,
        build: impl FnOnce(DeliveryId) -> M,
    ) -> DeliveryId
    where
        M: Send + Sync + 'static,
        S: DeliverySink<M>,
    {
        if let Some(old) = self.pending.remove(&player_id) {
            old.task.abort();
            tracing::debug!(
                %player_id,
                delivery_id = %old.delivery_id,
                "pending delivery superseded"
            );
        }

        self.next_id += 1;
        let delivery_id = DeliveryId(self.next_id);
        let message = Arc::new(build(delivery_id));
        let (ack_tx, ack_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(run_delivery(
            player_id.clone(),
            delivery_id,
            message,
            sink,
            ack_rx,
            RetrySchedule::new(self.config),
            self.report_tx.clone(),
        ));

        tracing::debug!(%player_id, %delivery_id, "snapshot delivery started");
        self.pending.insert(
            player_id,
            Pending {
                delivery_id,
                ack_tx,
                task,
            },
        );
        delivery_id
    }

    /// Routes a client's ack to the matching delivery task.
    ///
    /// Returns `false` for an ack that names no pending delivery (already
    /// settled, superseded, or made up). Those are ignored.
    pub fn acknowledge(&self, player_id: &PlayerId, delivery_id: DeliveryId, ok: bool) -> bool {
        match self.pending.get(player_id) {
            Some(pending) if pending.delivery_id == delivery_id => {
                pending.ack_tx.send(ok).is_ok()
            }
            _ => {
                tracing::debug!(%player_id, %delivery_id, "ignoring ack for unknown delivery");
                false
            }
        }
    }

    /// Clears the entry for a finished delivery. Returns `false` if the
    /// report belongs to a delivery that was already replaced.
    pub fn settle(&mut self, report: &DeliveryReport) -> bool {
        match self.pending.get(&report.player_id) {
            Some(pending) if pending.delivery_id == report.delivery_id => {
                self.pending.remove(&report.player_id);
                true
            }
            _ => false,
        }
    }

    /// Drops a player's pending delivery without a verdict. Used when the
    /// player disconnects; a fresh snapshot goes out when they attach.
    pub fn defer(&mut self, player_id: &PlayerId) -> bool {
        match self.pending.remove(player_id) {
            Some(pending) => {
                pending.task.abort();
                tracing::debug!(
                    %player_id,
                    delivery_id = %pending.delivery_id,
                    "pending delivery deferred"
                );
                true
            }
            None => false,
        }
    }

    /// Aborts every pending delivery.
    pub fn cancel_all(&mut self) {
        for (_, pending) in self.pending.drain() {
            pending.task.abort();
        }
    }

    pub fn pending_for(&self, player_id: &PlayerId) -> Option<DeliveryId> {
        self.pending.get(player_id).map(|p| p.delivery_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Drop for DeliveryTracker {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn run_delivery<M, S>(
    player_id: PlayerId,
    delivery_id: DeliveryId,
    message: Arc<M>,
    sink: S,
    mut ack_rx: mpsc::UnboundedReceiver<bool>,
    mut schedule: RetrySchedule,
    report_tx: mpsc::UnboundedSender<DeliveryReport>,
) where
    M: Send + Sync + 'static,
    S: DeliverySink<M>,
{
    let outcome = loop {
        if !sink.deliver(Arc::clone(&message)) {
            tracing::debug!(%player_id, %delivery_id, "socket unreachable for delivery attempt");
        }

        match time::timeout(schedule.ack_timeout(), ack_rx.recv()).await {
            Ok(Some(true)) => {
                break DeliveryOutcome::Delivered {
                    attempts: schedule.attempts(),
                };
            }
            Ok(Some(false)) => {
                tracing::warn!(
                    %player_id,
                    %delivery_id,
                    attempt = schedule.attempts(),
                    "client rejected snapshot"
                );
            }
            // Tracker dropped; nobody is left to report to.
            Ok(None) => return,
            Err(_) => {
                tracing::warn!(
                    %player_id,
                    %delivery_id,
                    attempt = schedule.attempts(),
                    "snapshot ack timed out"
                );
            }
        }

        if schedule.wait_next().await.is_none() {
            break DeliveryOutcome::Failed {
                attempts: schedule.attempts(),
            };
        }

        // Acks buffered since the window closed answer an earlier send of
        // the same payload. A positive one counts; negatives are dropped so
        // the next attempt gets its full window.
        if drain_late_acks(&mut ack_rx) {
            break DeliveryOutcome::Delivered {
                attempts: schedule.attempts().saturating_sub(1),
            };
        }
    };

    let _ = report_tx.send(DeliveryReport {
        player_id,
        delivery_id,
        outcome,
    });
}

/// Empties the ack buffer. Returns `true` if any buffered ack was positive.
fn drain_late_acks(ack_rx: &mut mpsc::UnboundedReceiver<bool>) -> bool {
    let mut delivered = false;
    while let Ok(ok) = ack_rx.try_recv() {
        delivered |= ok;
    }
    delivered
}

// =========================================================================
// Tests
// =========================================================================
