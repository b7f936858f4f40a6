//! The connection tracker: every player seated in one room.
//!
//! The tracker is owned by a single room actor and never shared, so it is
//! a plain ordered `Vec` with no locking. Player lists are small (a
//! handful of seats) and join order matters for seating and rosters.
//!
//! ## Lifecycle
//!
//! ```text
//! join() ──→ [Connected] ──detach()──→ [Disconnected] ──expire()──→ [Gone]
//!               ↑   ↑                        │
//!               │   └────────attach()────────┘  (Reconnected)
//!               └──attach() while connected      (Replaced: page navigation)
//! ```

use std::time::Instant;

use hexhaven_protocol::{ConnectionStatus, PlayerId};
use hexhaven_transport::SocketId;

use crate::{PlayerSession, SessionError, SocketLink};

/// What [`ConnectionTracker::attach`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The player was disconnected and is back within grace.
    Reconnected,
    /// The player never dropped; a new socket took over (reload or page
    /// navigation). `previous` is the socket it replaced.
    Replaced { previous: Option<SocketId> },
}

/// What [`ConnectionTracker::detach`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetachOutcome {
    /// The player's current socket closed; they are now disconnected.
    Disconnected,
    /// The closing socket had already been replaced. Nothing changed.
    Stale,
    /// The player was not connected to begin with.
    AlreadyDetached,
}

/// Tracks connection state for every player in a room.
pub struct ConnectionTracker<L> {
    sessions: Vec<PlayerSession<L>>,
    max_players: usize,
    next_seat: u32,
}

impl<L: SocketLink> ConnectionTracker<L> {
    pub fn new(max_players: usize) -> Self {
        Self {
            sessions: Vec::new(),
            max_players,
            next_seat: 0,
        }
    }

    /// Seats a new player with their first socket.
    ///
    /// # Errors
    /// - [`SessionError::AlreadyMember`] if the id is already seated
    /// - [`SessionError::RoomFull`] if every seat is taken
    pub fn join(
        &mut self,
        player_id: PlayerId,
        nickname: String,
        link: L,
    ) -> Result<&PlayerSession<L>, SessionError> {
        if self.is_member(&player_id) {
            return Err(SessionError::AlreadyMember(player_id));
        }
        if self.sessions.len() >= self.max_players {
            return Err(SessionError::RoomFull {
                max: self.max_players,
            });
        }

        let seat = self.next_seat;
        self.next_seat += 1;
        tracing::info!(
            %player_id,
            socket_id = %link.socket_id(),
            seat,
            "player joined"
        );
        self.sessions
            .push(PlayerSession::new(player_id, nickname, seat, link));
        let index = self.sessions.len() - 1;
        Ok(&self.sessions[index])
    }

    /// Attaches a new socket for an existing member.
    ///
    /// Works whether or not the player was ever seen as disconnected:
    /// a browser navigating between pages opens a new socket before the
    /// old one is noticed closing.
    ///
    /// # Errors
    /// - [`SessionError::NotMember`] if the player never joined
    /// - [`SessionError::SessionGone`] if their grace period already ran out
    pub fn attach(
        &mut self,
        player_id: &PlayerId,
        link: L,
    ) -> Result<AttachOutcome, SessionError> {
        let session = self
            .find_mut(player_id)
            .ok_or_else(|| SessionError::NotMember(player_id.clone()))?;

        let socket_id = link.socket_id();
        let outcome = match session.status {
            ConnectionStatus::Gone => {
                return Err(SessionError::SessionGone(player_id.clone()));
            }
            ConnectionStatus::Disconnected => AttachOutcome::Reconnected,
            ConnectionStatus::Connected => AttachOutcome::Replaced {
                previous: session.socket_id(),
            },
        };

        session.status = ConnectionStatus::Connected;
        session.disconnected_at = None;
        session.link = Some(link);

        tracing::info!(%player_id, %socket_id, ?outcome, "socket attached");
        Ok(outcome)
    }

    /// Handles a socket closing.
    ///
    /// Only the player's *current* socket can disconnect them; a close
    /// from a socket that was already replaced is reported as
    /// [`DetachOutcome::Stale`] and changes nothing.
    ///
    /// # Errors
    /// Returns [`SessionError::NotMember`] if the player is unknown.
    pub fn detach(
        &mut self,
        player_id: &PlayerId,
        socket_id: SocketId,
    ) -> Result<DetachOutcome, SessionError> {
        let session = self
            .find_mut(player_id)
            .ok_or_else(|| SessionError::NotMember(player_id.clone()))?;

        if session.status != ConnectionStatus::Connected {
            return Ok(DetachOutcome::AlreadyDetached);
        }
        if session.socket_id() != Some(socket_id) {
            tracing::debug!(
                %player_id,
                %socket_id,
                current = ?session.socket_id(),
                "ignoring detach from stale socket"
            );
            return Ok(DetachOutcome::Stale);
        }

        session.status = ConnectionStatus::Disconnected;
        session.disconnected_at = Some(Instant::now());
        session.link = None;

        tracing::info!(%player_id, %socket_id, "player disconnected, grace period started");
        Ok(DetachOutcome::Disconnected)
    }

    /// Grace period ran out: a disconnected player becomes gone.
    ///
    /// Returns `false` (and changes nothing) if the player reconnected in
    /// the meantime.
    pub fn expire(&mut self, player_id: &PlayerId) -> bool {
        match self.find_mut(player_id) {
            Some(session) if session.status == ConnectionStatus::Disconnected => {
                session.status = ConnectionStatus::Gone;
                tracing::info!(%player_id, "session expired (grace period elapsed)");
                true
            }
            _ => false,
        }
    }

    /// Marks a player gone immediately, whatever their state.
    ///
    /// Returns the socket that was attached, if any.
    ///
    /// # Errors
    /// Returns [`SessionError::NotMember`] if the player is unknown.
    pub fn mark_gone(&mut self, player_id: &PlayerId) -> Result<Option<SocketId>, SessionError> {
        let session = self
            .find_mut(player_id)
            .ok_or_else(|| SessionError::NotMember(player_id.clone()))?;
        let previous = session.socket_id();
        session.status = ConnectionStatus::Gone;
        session.link = None;
        tracing::info!(%player_id, "player marked gone");
        Ok(previous)
    }

    /// Removes a player's seat entirely. Used before the game starts.
    pub fn remove(&mut self, player_id: &PlayerId) -> Option<PlayerSession<L>> {
        let index = self
            .sessions
            .iter()
            .position(|s| &s.player_id == player_id)?;
        tracing::info!(%player_id, "player removed");
        Some(self.sessions.remove(index))
    }

    pub fn get(&self, player_id: &PlayerId) -> Option<&PlayerSession<L>> {
        self.sessions.iter().find(|s| &s.player_id == player_id)
    }

    /// All sessions in join order.
    pub fn iter(&self) -> impl Iterator<Item = &PlayerSession<L>> {
        self.sessions.iter()
    }

    /// Connected players whose socket can still be reached.
    pub fn connected(&self) -> impl Iterator<Item = (&PlayerId, &L)> {
        self.sessions
            .iter()
            .filter(|s| s.is_connected())
            .filter_map(|s| s.link().map(|link| (&s.player_id, link)))
    }

    /// Sessions marked connected whose socket can no longer be resolved.
    /// The caller treats each of these as a disconnect.
    pub fn unresolvable(&self) -> Vec<(PlayerId, SocketId)> {
        self.sessions
            .iter()
            .filter(|s| s.is_connected() && s.link().is_none())
            .filter_map(|s| s.socket_id().map(|id| (s.player_id.clone(), id)))
            .collect()
    }

    pub fn is_member(&self, player_id: &PlayerId) -> bool {
        self.get(player_id).is_some()
    }

    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.max_players
    }

    /// Seated players in any state.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.is_connected()).count()
    }

    fn find_mut(&mut self, player_id: &PlayerId) -> Option<&mut PlayerSession<L>> {
        self.sessions.iter_mut().find(|s| &s.player_id == player_id)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `ConnectionTracker`.
    //!
    //! Naming: `test_{function}_{scenario}`.

    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    // -- Helpers ----------------------------------------------------------

    #[derive(Debug, Clone)]
    struct TestLink {
        id: SocketId,
        alive: Arc<AtomicBool>,
    }

    impl TestLink {
        fn new(id: u64) -> Self {
            Self {
                id: SocketId::new(id),
                alive: Arc::new(AtomicBool::new(true)),
            }
        }

        fn kill(&self) {
            self.alive.store(false, Ordering::SeqCst);
        }
    }

    impl SocketLink for TestLink {
        fn socket_id(&self) -> SocketId {
            self.id
        }

        fn is_alive(&self) -> bool {
            self.alive.load(Ordering::SeqCst)
        }
    }

    fn pid(id: &str) -> PlayerId {
        PlayerId::new(id)
    }

    fn tracker_with(players: &[&str]) -> ConnectionTracker<TestLink> {
        let mut tracker = ConnectionTracker::new(4);
        for (i, p) in players.iter().enumerate() {
            tracker
                .join(pid(p), p.to_uppercase(), TestLink::new(i as u64 + 1))
                .unwrap();
        }
        tracker
    }

    // =====================================================================
    // join()
    // =====================================================================

    #[test]
    fn test_join_assigns_seats_in_order() {
        let tracker = tracker_with(&["p1", "p2"]);
        assert_eq!(tracker.len(), 2);
        assert_eq!(tracker.get(&pid("p1")).unwrap().seat(), 0);
        assert_eq!(tracker.get(&pid("p2")).unwrap().seat(), 1);
        assert!(tracker.get(&pid("p1")).unwrap().is_connected());
    }

    #[test]
    fn test_join_duplicate_rejected() {
        let mut tracker = tracker_with(&["p1"]);
        let err = tracker
            .join(pid("p1"), "again".into(), TestLink::new(9))
            .unwrap_err();
        assert_eq!(err, SessionError::AlreadyMember(pid("p1")));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_join_full_room_rejected() {
        let mut tracker = tracker_with(&["a", "b", "c", "d"]);
        let err = tracker
            .join(pid("e"), "E".into(), TestLink::new(9))
            .unwrap_err();
        assert_eq!(err, SessionError::RoomFull { max: 4 });
    }

    #[test]
    fn test_seat_survives_removal() {
        let mut tracker = tracker_with(&["p1", "p2"]);
        tracker.remove(&pid("p1"));
        tracker.join(pid("p3"), "P3".into(), TestLink::new(3)).unwrap();
        assert_eq!(tracker.get(&pid("p2")).unwrap().seat(), 1);
        assert_eq!(tracker.get(&pid("p3")).unwrap().seat(), 2);
    }

    // =====================================================================
    // detach() / attach()
    // =====================================================================

    #[test]
    fn test_detach_then_attach_reconnects() {
        let mut tracker = tracker_with(&["p1", "p2"]);

        let outcome = tracker.detach(&pid("p2"), SocketId::new(2)).unwrap();
        assert_eq!(outcome, DetachOutcome::Disconnected);
        let session = tracker.get(&pid("p2")).unwrap();
        assert_eq!(session.status(), ConnectionStatus::Disconnected);
        assert!(session.disconnected_at().is_some());
        assert_eq!(tracker.connected_count(), 1);

        let outcome = tracker.attach(&pid("p2"), TestLink::new(7)).unwrap();
        assert_eq!(outcome, AttachOutcome::Reconnected);
        assert_eq!(tracker.connected_count(), 2);
        assert_eq!(tracker.len(), 2);
        assert_eq!(
            tracker.get(&pid("p2")).unwrap().socket_id(),
            Some(SocketId::new(7))
        );
    }

    #[test]
    fn test_attach_while_connected_replaces_socket() {
        let mut tracker = tracker_with(&["p1"]);
        let outcome = tracker.attach(&pid("p1"), TestLink::new(5)).unwrap();
        assert_eq!(
            outcome,
            AttachOutcome::Replaced {
                previous: Some(SocketId::new(1))
            }
        );
        assert!(tracker.get(&pid("p1")).unwrap().is_connected());
    }

    #[test]
    fn test_detach_from_stale_socket_ignored() {
        let mut tracker = tracker_with(&["p1"]);
        tracker.attach(&pid("p1"), TestLink::new(5)).unwrap();

        let outcome = tracker.detach(&pid("p1"), SocketId::new(1)).unwrap();
        assert_eq!(outcome, DetachOutcome::Stale);
        assert!(tracker.get(&pid("p1")).unwrap().is_connected());
    }

    #[test]
    fn test_detach_twice_is_already_detached() {
        let mut tracker = tracker_with(&["p1"]);
        tracker.detach(&pid("p1"), SocketId::new(1)).unwrap();
        let outcome = tracker.detach(&pid("p1"), SocketId::new(1)).unwrap();
        assert_eq!(outcome, DetachOutcome::AlreadyDetached);
    }

    #[test]
    fn test_attach_unknown_player_rejected() {
        let mut tracker = tracker_with(&["p1"]);
        let err = tracker.attach(&pid("ghost"), TestLink::new(3)).unwrap_err();
        assert_eq!(err, SessionError::NotMember(pid("ghost")));
    }

    // =====================================================================
    // expire() / mark_gone()
    // =====================================================================

    #[test]
    fn test_expire_disconnected_becomes_gone() {
        let mut tracker = tracker_with(&["p1"]);
        tracker.detach(&pid("p1"), SocketId::new(1)).unwrap();
        assert!(tracker.expire(&pid("p1")));
        assert_eq!(
            tracker.get(&pid("p1")).unwrap().status(),
            ConnectionStatus::Gone
        );

        let err = tracker.attach(&pid("p1"), TestLink::new(2)).unwrap_err();
        assert_eq!(err, SessionError::SessionGone(pid("p1")));
    }

    #[test]
    fn test_expire_after_reconnect_is_noop() {
        let mut tracker = tracker_with(&["p1"]);
        tracker.detach(&pid("p1"), SocketId::new(1)).unwrap();
        tracker.attach(&pid("p1"), TestLink::new(2)).unwrap();
        assert!(!tracker.expire(&pid("p1")));
        assert!(tracker.get(&pid("p1")).unwrap().is_connected());
    }

    #[test]
    fn test_mark_gone_returns_previous_socket() {
        let mut tracker = tracker_with(&["p1"]);
        let previous = tracker.mark_gone(&pid("p1")).unwrap();
        assert_eq!(previous, Some(SocketId::new(1)));
        assert_eq!(tracker.connected_count(), 0);
    }

    // =====================================================================
    // connected() / unresolvable()
    // =====================================================================

    #[test]
    fn test_dead_link_is_unresolvable() {
        let mut tracker = ConnectionTracker::new(4);
        let dead = TestLink::new(1);
        tracker.join(pid("p1"), "P1".into(), dead.clone()).unwrap();
        tracker.join(pid("p2"), "P2".into(), TestLink::new(2)).unwrap();
        dead.kill();

        let reachable: Vec<_> = tracker.connected().map(|(p, _)| p.clone()).collect();
        assert_eq!(reachable, vec![pid("p2")]);
        assert_eq!(
            tracker.unresolvable(),
            vec![(pid("p1"), SocketId::new(1))]
        );
    }
}
