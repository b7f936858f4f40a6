//! Room actor: an isolated Tokio task that owns one match.
//!
//! Each room runs in its own task and talks to the outside world through
//! an mpsc channel. No room state is shared; every mutation is serialized
//! through the actor loop.
//!
//! ```text
//!            ┌──────────── RoomActor::run ────────────┐
//! commands ─→│ join / detach / request / leave / info │
//! grace    ─→│ grace period expired                   │─→ PlayerLink (fan-out)
//! reports  ─→│ snapshot delivered / failed            │
//! empty TTL ─→│ nobody connected for too long          │
//!            └────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use hexhaven_protocol::{
    ClientMessage, ConnectionStatus, ErrorKind, PlayerId, PlayerSummary, Recipient, RoomCode,
    RoomStatus, ServerMessage, SnapshotReason,
};
use hexhaven_session::{
    AttachOutcome, ConnectionTracker, DeliveryOutcome, DeliveryReport, DeliveryTracker,
    DetachOutcome, GraceExpired, GraceTimers, SessionError, SocketLink, generate_player_id,
};
use hexhaven_transport::SocketId;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::broadcast::{PlayerLink, fan_out};
use crate::game::{GameState, Outbox};
use crate::{
    Catalog, CharacterLoadout, HistoryRecorder, MatchSummary, RoomConfig, RoomError,
    ScenarioSetup,
};

/// Longest nickname accepted, in characters.
const MAX_NICKNAME_LEN: usize = 20;
const MIN_PLAYER_ID_LEN: usize = 8;
const MAX_PLAYER_ID_LEN: usize = 64;

/// Log target for problems an operator should look at.
const ESCALATION: &str = "hexhaven::escalation";

// ---------------------------------------------------------------------------
// Commands and replies
// ---------------------------------------------------------------------------

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel: the caller
/// sends a command and waits for the response on it.
pub(crate) enum RoomCommand {
    /// Seat a new player, or attach a new socket for an existing one.
    Join {
        player_id: Option<PlayerId>,
        nickname: String,
        link: PlayerLink,
        reply: oneshot::Sender<Result<JoinAccepted, RoomError>>,
    },

    /// A socket closed. Fire-and-forget.
    Detach {
        player_id: PlayerId,
        socket_id: SocketId,
    },

    /// An in-room request from a seated player.
    Request {
        player_id: PlayerId,
        message: ClientMessage,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Leave {
        player_id: PlayerId,
        socket_id: SocketId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    Info {
        reply: oneshot::Sender<RoomInfo>,
    },

    Shutdown,
}

/// Successful join. The room has already queued `join_ack` (and a
/// snapshot, when one is due) on the player's link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinAccepted {
    pub room_code: RoomCode,
    pub player_id: PlayerId,
    pub reconnected: bool,
}

/// Room metadata (not the game state itself).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    pub room_code: RoomCode,
    pub status: RoomStatus,
    pub scenario_id: String,
    pub host: Option<PlayerId>,
    /// Seated players in any connection state.
    pub player_count: usize,
    pub connected_count: usize,
    pub max_players: usize,
    pub round_number: Option<u32>,
    pub pending_deliveries: usize,
    pub snapshot_failures: u32,
    pub faulted: bool,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Handle to a running room actor.
///
/// Cheap to clone: it is an `mpsc::Sender` plus the room code. The
/// registry holds one per room and every connection handler in the room
/// caches another.
#[derive(Clone)]
pub struct RoomHandle {
    room_code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_code(&self) -> &RoomCode {
        &self.room_code
    }

    /// True once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Joins the room, or re-attaches when `player_id` names a member.
    pub async fn join(
        &self,
        player_id: Option<PlayerId>,
        nickname: String,
        link: PlayerLink,
    ) -> Result<JoinAccepted, RoomError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_id,
            nickname,
            link,
            reply,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Forwards an in-room request and waits for its verdict.
    pub async fn request(&self, player_id: PlayerId, message: ClientMessage) -> Result<(), RoomError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Request {
            player_id,
            message,
            reply,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Leaves on behalf of `socket_id`, which must hold the player's seat.
    pub async fn leave(&self, player_id: PlayerId, socket_id: SocketId) -> Result<(), RoomError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Leave {
            player_id,
            socket_id,
            reply,
        })
        .await?;
        reply_rx.await.map_err(|_| self.unavailable())?
    }

    /// Reports a closed socket (fire-and-forget).
    pub async fn detach(&self, player_id: PlayerId, socket_id: SocketId) -> Result<(), RoomError> {
        self.send(RoomCommand::Detach {
            player_id,
            socket_id,
        })
        .await
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        let (reply, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Info { reply }).await?;
        reply_rx.await.map_err(|_| self.unavailable())
    }

    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(command)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.room_code.clone())
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    code: RoomCode,
    status: RoomStatus,
    config: RoomConfig,
    scenario: ScenarioSetup,
    catalog: Arc<dyn Catalog>,
    recorder: Arc<dyn HistoryRecorder>,
    tracker: ConnectionTracker<PlayerLink>,
    host: Option<PlayerId>,
    /// Lobby character choices, keyed by player.
    loadouts: BTreeMap<PlayerId, CharacterLoadout>,
    game: Option<GameState>,
    grace: GraceTimers,
    deliveries: DeliveryTracker,
    snapshot_failures: u32,
    faulted: Option<String>,
    /// Set while no member is connected.
    empty_since: Option<Instant>,
}

struct Inboxes {
    commands: mpsc::Receiver<RoomCommand>,
    grace: mpsc::UnboundedReceiver<GraceExpired>,
    reports: mpsc::UnboundedReceiver<DeliveryReport>,
}

impl RoomActor {
    /// Runs the actor loop until shutdown, abandonment, or every handle
    /// is dropped.
    async fn run(mut self, mut inbox: Inboxes) {
        tracing::info!(room_code = %self.code, scenario_id = %self.scenario.id, "room actor started");

        loop {
            let empty_deadline = self.empty_deadline();
            tokio::select! {
                command = inbox.commands.recv() => {
                    let Some(command) = command else { break };
                    if !self.handle_command(command) {
                        break;
                    }
                }
                Some(expired) = inbox.grace.recv() => self.handle_grace_expired(expired),
                Some(report) = inbox.reports.recv() => self.handle_delivery_report(report),
                _ = tokio::time::sleep_until(empty_deadline.unwrap_or_else(Instant::now)),
                    if empty_deadline.is_some() =>
                {
                    if !self.handle_empty_ttl() {
                        break;
                    }
                }
            }
        }

        self.deliveries.cancel_all();
        self.grace.cancel_all();
        tracing::info!(room_code = %self.code, status = %self.status, "room actor stopped");
    }

    /// Returns `false` when the actor should stop.
    fn handle_command(&mut self, command: RoomCommand) -> bool {
        match command {
            RoomCommand::Join {
                player_id,
                nickname,
                link,
                reply,
            } => {
                let result = self.handle_join(player_id, nickname, link);
                let _ = reply.send(result);
            }
            RoomCommand::Detach {
                player_id,
                socket_id,
            } => self.handle_detach(&player_id, socket_id),
            RoomCommand::Request {
                player_id,
                message,
                reply,
            } => {
                let result = self.handle_request(&player_id, message);
                if let Some(err) = result.as_ref().err().filter(|e| e.kind() == ErrorKind::Invariant) {
                    self.fault(err.to_string());
                }
                let _ = reply.send(result);
            }
            RoomCommand::Leave {
                player_id,
                socket_id,
                reply,
            } => {
                let result = self.handle_leave(&player_id, socket_id);
                let _ = reply.send(result);
            }
            RoomCommand::Info { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Shutdown => {
                tracing::info!(room_code = %self.code, "room shutting down");
                return false;
            }
        }
        true
    }

    // -- Membership -------------------------------------------------------

    fn handle_join(
        &mut self,
        player_id: Option<PlayerId>,
        nickname: String,
        link: PlayerLink,
    ) -> Result<JoinAccepted, RoomError> {
        if let Some(player_id) = player_id.as_ref().filter(|p| self.tracker.is_member(p)) {
            return self.handle_attach(player_id.clone(), link);
        }

        if self.status != RoomStatus::Waiting {
            return Err(RoomError::WrongStatus {
                action: "join",
                status: self.status,
            });
        }
        let nickname = validate_nickname(&nickname)?;
        let player_id = match player_id {
            Some(player_id) => validate_player_id(player_id)?,
            None => generate_player_id(),
        };

        self.tracker.join(player_id.clone(), nickname, link)?;
        if self.host.is_none() {
            self.host = Some(player_id.clone());
        }
        self.empty_since = None;

        let accepted = JoinAccepted {
            room_code: self.code.clone(),
            player_id: player_id.clone(),
            reconnected: false,
        };
        self.send_join_ack(&accepted);
        self.broadcast_lobby();
        Ok(accepted)
    }

    /// A member is back on a new socket, whether or not they were ever
    /// seen as disconnected. An active room always sends them a snapshot.
    fn handle_attach(&mut self, player_id: PlayerId, link: PlayerLink) -> Result<JoinAccepted, RoomError> {
        let socket_id = link.socket_id();
        let previous = self
            .tracker
            .get(&player_id)
            .and_then(|session| session.link().cloned());
        let outcome = self.tracker.attach(&player_id, link)?;
        self.empty_since = None;

        if let Some(old) = previous.filter(|old| old.socket_id() != socket_id) {
            tracing::info!(
                room_code = %self.code,
                %player_id,
                old_socket = %old.socket_id(),
                new_socket = %socket_id,
                "seat moved to a new socket"
            );
            old.send(Arc::new(ServerMessage::SessionReplaced {
                room_code: self.code.clone(),
            }));
        }

        let reconnected = outcome == AttachOutcome::Reconnected;
        if reconnected {
            self.grace.cancel(&player_id);
            let nickname = self.nickname(&player_id);
            self.dispatch(vec![(
                Recipient::AllExcept(player_id.clone()),
                ServerMessage::PlayerReconnected {
                    player_id: player_id.clone(),
                    nickname,
                    status: ConnectionStatus::Connected,
                },
            )]);
        }

        let accepted = JoinAccepted {
            room_code: self.code.clone(),
            player_id: player_id.clone(),
            reconnected,
        };
        self.send_join_ack(&accepted);

        match self.status {
            RoomStatus::Waiting => self.broadcast_lobby(),
            RoomStatus::Active => {
                let reason = if reconnected {
                    SnapshotReason::Reconnected
                } else {
                    SnapshotReason::Attached
                };
                self.deliver_snapshot(&player_id, reason);
            }
            RoomStatus::Completed | RoomStatus::Abandoned => {}
        }
        Ok(accepted)
    }

    fn handle_detach(&mut self, player_id: &PlayerId, socket_id: SocketId) {
        match self.tracker.detach(player_id, socket_id) {
            Ok(DetachOutcome::Disconnected) => self.on_disconnected(player_id),
            Ok(outcome) => {
                tracing::debug!(room_code = %self.code, %player_id, %socket_id, ?outcome, "detach ignored");
            }
            Err(err) => {
                tracing::debug!(room_code = %self.code, %player_id, %err, "detach from non-member");
            }
        }
    }

    fn on_disconnected(&mut self, player_id: &PlayerId) {
        self.deliveries.defer(player_id);
        if !self.status.is_terminal() {
            self.grace
                .start(player_id.clone(), self.config.session.reconnect_grace());
            let nickname = self.nickname(player_id);
            self.dispatch(vec![(
                Recipient::AllExcept(player_id.clone()),
                ServerMessage::PlayerDisconnected {
                    player_id: player_id.clone(),
                    nickname,
                    status: ConnectionStatus::Disconnected,
                },
            )]);
        }
        match self.status {
            RoomStatus::Waiting => self.broadcast_lobby(),
            RoomStatus::Active => self.maybe_begin_round(),
            RoomStatus::Completed | RoomStatus::Abandoned => {}
        }
        self.note_if_empty();
    }

    fn handle_grace_expired(&mut self, expired: GraceExpired) {
        if !self.grace.claim(&expired) {
            return;
        }
        let player_id = expired.player_id;
        if self
            .tracker
            .get(&player_id)
            .is_none_or(|s| s.status() != ConnectionStatus::Disconnected)
        {
            return;
        }
        let nickname = self.nickname(&player_id);

        if self.status == RoomStatus::Waiting {
            self.remove_from_lobby(&player_id);
        } else if !self.tracker.expire(&player_id) {
            return;
        }
        tracing::info!(room_code = %self.code, %player_id, "player gone after grace period");
        self.dispatch(vec![(
            Recipient::AllExcept(player_id.clone()),
            ServerMessage::PlayerGone {
                player_id,
                nickname,
                status: ConnectionStatus::Gone,
            },
        )]);
        if self.status == RoomStatus::Active {
            self.maybe_begin_round();
        }
    }

    fn handle_leave(&mut self, player_id: &PlayerId, socket_id: SocketId) -> Result<(), RoomError> {
        let session = self
            .tracker
            .get(player_id)
            .ok_or_else(|| SessionError::NotMember(player_id.clone()))?;
        if session.socket_id().is_some_and(|current| current != socket_id) {
            return Err(RoomError::SeatMoved(player_id.clone()));
        }
        self.grace.cancel(player_id);
        self.deliveries.defer(player_id);
        let nickname = self.nickname(player_id);

        if self.status == RoomStatus::Waiting {
            self.remove_from_lobby(player_id);
        } else {
            self.tracker.mark_gone(player_id)?;
            self.dispatch(vec![(
                Recipient::AllExcept(player_id.clone()),
                ServerMessage::PlayerGone {
                    player_id: player_id.clone(),
                    nickname,
                    status: ConnectionStatus::Gone,
                },
            )]);
            if self.status == RoomStatus::Active {
                self.maybe_begin_round();
            }
        }
        tracing::info!(room_code = %self.code, %player_id, "player left");
        self.note_if_empty();
        Ok(())
    }

    /// Before the game starts a departing player frees their seat and
    /// character; the next player in join order inherits host.
    fn remove_from_lobby(&mut self, player_id: &PlayerId) {
        self.tracker.remove(player_id);
        self.loadouts.remove(player_id);
        if self.host.as_ref() == Some(player_id) {
            self.host = self.tracker.iter().next().map(|s| s.player_id().clone());
        }
        self.broadcast_lobby();
    }

    // -- Requests ---------------------------------------------------------

    fn handle_request(&mut self, player_id: &PlayerId, message: ClientMessage) -> Result<(), RoomError> {
        if !self.tracker.is_member(player_id) {
            return Err(SessionError::NotMember(player_id.clone()).into());
        }
        tracing::debug!(room_code = %self.code, %player_id, request = message.name(), "room request");

        match message {
            ClientMessage::SnapshotAck { delivery_id, ok } => {
                self.deliveries.acknowledge(player_id, delivery_id, ok);
                Ok(())
            }
            ClientMessage::RequestSnapshot => {
                self.require_status(RoomStatus::Active, "request a snapshot")?;
                self.deliver_snapshot(player_id, SnapshotReason::Refresh);
                Ok(())
            }
            ClientMessage::ChooseCharacter { character_id } => {
                self.choose_character(player_id, character_id)
            }
            ClientMessage::StartGame => self.start_game(player_id),
            ClientMessage::SelectCards {
                card_ids,
                initiative_card_id,
            } => {
                let outbox = self
                    .game_mut("select cards")?
                    .select_cards(player_id, &card_ids, &initiative_card_id)?;
                self.commit(outbox)?;
                self.maybe_begin_round();
                Ok(())
            }
            ClientMessage::ExecuteAction { card_id, position } => {
                let outbox = self
                    .game_mut("execute an action")?
                    .execute_action(player_id, card_id, position)?;
                self.commit(outbox)
            }
            ClientMessage::EndTurn => {
                self.ensure_playable("end the turn")?;
                let tracker = &self.tracker;
                let Some(game) = self.game.as_mut() else {
                    return Err(missing_game());
                };
                let outbox = game.end_turn(player_id, |p| {
                    tracker.get(p).is_some_and(|s| s.is_connected())
                })?;
                self.commit(outbox)?;
                self.maybe_begin_round();
                Ok(())
            }
            ClientMessage::InfuseElement { element } => {
                let outbox = self
                    .game_mut("infuse an element")?
                    .infuse_element(player_id, &element)?;
                self.commit(outbox)
            }
            ClientMessage::ConsumeElement { element } => {
                let outbox = self
                    .game_mut("consume an element")?
                    .consume_element(player_id, &element)?;
                self.commit(outbox)
            }
            ClientMessage::DeclareOutcome { victory } => self.complete(player_id, victory),
            other => Err(RoomError::InvalidInput(format!(
                "{} is not a room request",
                other.name()
            ))),
        }
    }

    fn choose_character(&mut self, player_id: &PlayerId, character_id: String) -> Result<(), RoomError> {
        self.require_status(RoomStatus::Waiting, "choose a character")?;
        let loadout = self
            .catalog
            .character(&character_id)
            .ok_or_else(|| RoomError::UnknownCharacter(character_id.clone()))?;
        let taken = self
            .loadouts
            .iter()
            .any(|(owner, chosen)| owner != player_id && chosen.id == character_id);
        if taken {
            return Err(RoomError::CharacterTaken(character_id));
        }

        tracing::info!(room_code = %self.code, %player_id, %character_id, "character chosen");
        self.loadouts.insert(player_id.clone(), loadout);
        self.broadcast_lobby();
        Ok(())
    }

    fn start_game(&mut self, player_id: &PlayerId) -> Result<(), RoomError> {
        self.require_status(RoomStatus::Waiting, "start the game")?;
        if self.host.as_ref() != Some(player_id) {
            return Err(RoomError::NotHost("start the game"));
        }
        let have = self.tracker.len();
        if have < self.config.min_players {
            return Err(RoomError::NotEnoughPlayers {
                have,
                need: self.config.min_players,
            });
        }

        let mut party = Vec::with_capacity(have);
        for session in self.tracker.iter() {
            let loadout = self
                .loadouts
                .get(session.player_id())
                .ok_or_else(|| RoomError::CharacterMissing(session.player_id().clone()))?;
            party.push((session.player_id().clone(), session.seat(), loadout.clone()));
        }

        self.transition(RoomStatus::Active)?;
        self.game = Some(GameState::new(self.scenario.clone(), party));
        tracing::info!(room_code = %self.code, players = have, "game started");

        let members: Vec<PlayerId> = self
            .tracker
            .connected()
            .map(|(player_id, _)| player_id.clone())
            .collect();
        for member in &members {
            self.deliver_snapshot(member, SnapshotReason::GameStarted);
        }
        Ok(())
    }

    fn complete(&mut self, player_id: &PlayerId, victory: bool) -> Result<(), RoomError> {
        self.require_status(RoomStatus::Active, "declare the outcome")?;
        if self.host.as_ref() != Some(player_id) {
            return Err(RoomError::NotHost("declare the outcome"));
        }
        self.transition(RoomStatus::Completed)?;

        let round_number = self.game.as_ref().map_or(0, GameState::round_number);
        self.dispatch(vec![(
            Recipient::All,
            ServerMessage::GameCompleted {
                victory,
                round_number,
            },
        )]);

        self.recorder.record(MatchSummary {
            room_code: self.code.clone(),
            scenario_id: self.scenario.id.clone(),
            victory,
            rounds_played: round_number,
            players: self.player_summaries(),
            snapshot_failures: self.snapshot_failures,
        });
        Ok(())
    }

    // -- Game plumbing ----------------------------------------------------

    fn game_mut(&mut self, action: &'static str) -> Result<&mut GameState, RoomError> {
        self.ensure_playable(action)?;
        self.game.as_mut().ok_or_else(missing_game)
    }

    fn ensure_playable(&self, action: &'static str) -> Result<(), RoomError> {
        if self.faulted.is_some() {
            return Err(RoomError::Faulted(self.code.clone()));
        }
        self.require_status(RoomStatus::Active, action)
    }

    /// Fans out a mutation's messages, then re-checks game invariants.
    fn commit(&mut self, outbox: Outbox) -> Result<(), RoomError> {
        self.dispatch(outbox);
        if let Some(game) = &self.game {
            game.check_invariants()?;
        }
        Ok(())
    }

    /// Starts the acting phase once every connected character has chosen.
    fn maybe_begin_round(&mut self) {
        if self.status != RoomStatus::Active || self.faulted.is_some() {
            return;
        }
        let tracker = &self.tracker;
        let Some(game) = self.game.as_mut() else {
            return;
        };
        if !game.ready_to_begin(|p| tracker.get(p).is_some_and(|s| s.is_connected())) {
            return;
        }
        let outbox = game.begin_round();
        if let Err(err) = self.commit(outbox) {
            self.fault(err.to_string());
        }
    }

    fn deliver_snapshot(&mut self, player_id: &PlayerId, reason: SnapshotReason) {
        let Some(game) = &self.game else {
            return;
        };
        let Some(link) = self.tracker.get(player_id).and_then(|s| s.link()).cloned() else {
            tracing::debug!(room_code = %self.code, %player_id, "no reachable socket for snapshot");
            return;
        };
        let snapshot = Arc::new(game.snapshot(self.code.clone(), self.status, self.player_summaries()));
        let delivery_id = self.deliveries.deliver(player_id.clone(), link, |delivery_id| {
            ServerMessage::GameStarted {
                delivery_id,
                reason,
                snapshot,
            }
        });
        tracing::debug!(room_code = %self.code, %player_id, %delivery_id, ?reason, "snapshot queued");
    }

    fn handle_delivery_report(&mut self, report: DeliveryReport) {
        if !self.deliveries.settle(&report) {
            return;
        }
        let DeliveryReport {
            player_id,
            delivery_id,
            outcome,
        } = report;
        match outcome {
            DeliveryOutcome::Delivered { attempts } => {
                tracing::debug!(room_code = %self.code, %player_id, %delivery_id, attempts, "snapshot acknowledged");
            }
            DeliveryOutcome::Failed { attempts } => {
                self.snapshot_failures += 1;
                tracing::error!(
                    target: ESCALATION,
                    room_code = %self.code,
                    %player_id,
                    %delivery_id,
                    attempts,
                    "snapshot delivery failed after all retries"
                );
                self.dispatch(vec![(
                    Recipient::Player(player_id),
                    ServerMessage::SnapshotFailed {
                        delivery_id,
                        attempts,
                        message: "state could not be synchronized; refresh to retry".into(),
                    },
                )]);
            }
        }
    }

    /// Marks the room faulted. Game mutations are refused from here on.
    fn fault(&mut self, reason: String) {
        if self.faulted.is_some() {
            return;
        }
        tracing::error!(target: ESCALATION, room_code = %self.code, %reason, "room faulted");
        self.deliveries.cancel_all();
        self.faulted = Some(reason.clone());
        self.dispatch(vec![(Recipient::All, ServerMessage::RoomFaulted { reason })]);
    }

    // -- Lifecycle --------------------------------------------------------

    fn transition(&mut self, target: RoomStatus) -> Result<(), RoomError> {
        if !self.status.can_transition_to(target) {
            return Err(RoomError::WrongStatus {
                action: "change status",
                status: self.status,
            });
        }
        tracing::info!(room_code = %self.code, from = %self.status, to = %target, "room status changed");
        self.status = target;
        if target != RoomStatus::Active {
            self.deliveries.cancel_all();
        }
        Ok(())
    }

    fn require_status(&self, status: RoomStatus, action: &'static str) -> Result<(), RoomError> {
        if self.status == status {
            Ok(())
        } else {
            Err(RoomError::WrongStatus {
                action,
                status: self.status,
            })
        }
    }

    fn note_if_empty(&mut self) {
        if self.tracker.connected_count() == 0 && self.empty_since.is_none() {
            self.empty_since = Some(Instant::now());
        }
    }

    fn empty_deadline(&self) -> Option<Instant> {
        self.empty_since.map(|since| since + self.config.empty_ttl())
    }

    /// Returns `false` when the actor should stop.
    fn handle_empty_ttl(&mut self) -> bool {
        self.empty_since = None;
        if self.tracker.connected_count() > 0 {
            return true;
        }
        if self.status.can_transition_to(RoomStatus::Abandoned) {
            let _ = self.transition(RoomStatus::Abandoned);
        }
        tracing::info!(room_code = %self.code, status = %self.status, "room empty past ttl");
        false
    }

    // -- Output -----------------------------------------------------------

    fn dispatch(&mut self, outbox: Outbox) {
        for (recipient, message) in outbox {
            fan_out(&self.tracker, &recipient, message);
        }
        self.reap_unreachable();
    }

    /// A connected player whose socket no longer resolves is treated as
    /// disconnected.
    fn reap_unreachable(&mut self) {
        for (player_id, socket_id) in self.tracker.unresolvable() {
            tracing::debug!(room_code = %self.code, %player_id, %socket_id, "socket unreachable");
            self.handle_detach(&player_id, socket_id);
        }
    }

    fn send_join_ack(&self, accepted: &JoinAccepted) {
        fan_out(
            &self.tracker,
            &Recipient::Player(accepted.player_id.clone()),
            ServerMessage::JoinAck {
                accepted: true,
                reason: None,
                room_code: Some(accepted.room_code.clone()),
                player_id: Some(accepted.player_id.clone()),
                reconnected: accepted.reconnected,
            },
        );
    }

    fn broadcast_lobby(&mut self) {
        let message = ServerMessage::LobbyUpdate {
            room_code: self.code.clone(),
            status: self.status,
            host: self.host.clone(),
            players: self.player_summaries(),
        };
        self.dispatch(vec![(Recipient::All, message)]);
    }

    fn player_summaries(&self) -> Vec<PlayerSummary> {
        self.tracker
            .iter()
            .map(|session| PlayerSummary {
                player_id: session.player_id().clone(),
                nickname: session.nickname().to_string(),
                status: session.status(),
                character_id: self
                    .loadouts
                    .get(session.player_id())
                    .map(|loadout| loadout.id.clone()),
                is_host: self.host.as_ref() == Some(session.player_id()),
            })
            .collect()
    }

    fn nickname(&self, player_id: &PlayerId) -> String {
        self.tracker
            .get(player_id)
            .map(|s| s.nickname().to_string())
            .unwrap_or_default()
    }

    fn info(&self) -> RoomInfo {
        RoomInfo {
            room_code: self.code.clone(),
            status: self.status,
            scenario_id: self.scenario.id.clone(),
            host: self.host.clone(),
            player_count: self.tracker.len(),
            connected_count: self.tracker.connected_count(),
            max_players: self.config.max_players,
            round_number: self.game.as_ref().map(GameState::round_number),
            pending_deliveries: self.deliveries.pending_count(),
            snapshot_failures: self.snapshot_failures,
            faulted: self.faulted.is_some(),
        }
    }
}

fn missing_game() -> RoomError {
    RoomError::Rules(hexhaven_rules::RulesError::Invariant(
        "active room has no game state".into(),
    ))
}

/// Client-chosen ids double as the reconnect credential, so they must be
/// long enough not to be guessed.
fn validate_player_id(player_id: PlayerId) -> Result<PlayerId, RoomError> {
    let raw = player_id.as_str();
    let well_formed = (MIN_PLAYER_ID_LEN..=MAX_PLAYER_ID_LEN).contains(&raw.len())
        && raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if !well_formed {
        return Err(RoomError::InvalidInput(format!(
            "player id must be {MIN_PLAYER_ID_LEN}-{MAX_PLAYER_ID_LEN} characters of [A-Za-z0-9_-]"
        )));
    }
    Ok(player_id)
}

fn validate_nickname(raw: &str) -> Result<String, RoomError> {
    let nickname = raw.trim();
    let len = nickname.chars().count();
    if len == 0 || len > MAX_NICKNAME_LEN {
        return Err(RoomError::InvalidInput(format!(
            "nickname must be 1-{MAX_NICKNAME_LEN} characters"
        )));
    }
    Ok(nickname.to_string())
}

/// Spawns a new room actor task and returns a handle to it.
///
/// The room starts empty; the first player to join becomes host. If
/// nobody connects within the empty TTL the room abandons itself.
pub(crate) fn spawn_room(
    code: RoomCode,
    config: RoomConfig,
    scenario: ScenarioSetup,
    catalog: Arc<dyn Catalog>,
    recorder: Arc<dyn HistoryRecorder>,
) -> RoomHandle {
    let (tx, commands) = mpsc::channel(config.channel_size);
    let (grace, grace_rx) = GraceTimers::new();
    let (deliveries, reports) = DeliveryTracker::new(config.retry);

    let actor = RoomActor {
        code: code.clone(),
        status: RoomStatus::Waiting,
        tracker: ConnectionTracker::new(config.max_players),
        config,
        scenario,
        catalog,
        recorder,
        host: None,
        loadouts: BTreeMap::new(),
        game: None,
        grace,
        deliveries,
        snapshot_failures: 0,
        faulted: None,
        empty_since: Some(Instant::now()),
    };
    let inbox = Inboxes {
        commands,
        grace: grace_rx,
        reports,
    };

    tokio::spawn(actor.run(inbox));

    RoomHandle {
        room_code: code,
        sender: tx,
    }
}
