//! Broadcast bus: fan-out from a room to its players' sockets.
//!
//! A room never owns a socket. Each connection handler owns an outbound
//! queue and hands the room a [`PlayerLink`] holding only a weak sender.
//! When the handler goes away the link stops resolving and the room
//! treats the player as disconnected.

use std::sync::Arc;

use hexhaven_protocol::{Recipient, ServerMessage};
use hexhaven_session::{ConnectionTracker, DeliverySink, SocketLink};
use hexhaven_transport::SocketId;
use tokio::sync::mpsc;

/// What a connection handler receives from its room. Shared so one
/// broadcast costs one allocation regardless of room size.
pub type Outbound = Arc<ServerMessage>;

/// Sender half a connection handler keeps for its own socket.
pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Weak route from a room to one socket.
#[derive(Debug, Clone)]
pub struct PlayerLink {
    socket_id: SocketId,
    tx: mpsc::WeakUnboundedSender<Outbound>,
}

impl PlayerLink {
    pub fn new(socket_id: SocketId, tx: &OutboundSender) -> Self {
        Self {
            socket_id,
            tx: tx.downgrade(),
        }
    }

    /// Queues a message. Returns `false` if the socket is gone.
    pub fn send(&self, message: Outbound) -> bool {
        match self.tx.upgrade() {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        }
    }
}

impl SocketLink for PlayerLink {
    fn socket_id(&self) -> SocketId {
        self.socket_id
    }

    fn is_alive(&self) -> bool {
        self.tx.upgrade().is_some_and(|tx| !tx.is_closed())
    }
}

impl DeliverySink<ServerMessage> for PlayerLink {
    fn deliver(&self, message: Arc<ServerMessage>) -> bool {
        self.send(message)
    }
}

/// Sends `message` to every reachable player `recipient` covers.
/// Returns how many sockets it was queued on.
pub fn fan_out(
    tracker: &ConnectionTracker<PlayerLink>,
    recipient: &Recipient,
    message: ServerMessage,
) -> usize {
    let message = Arc::new(message);
    tracker
        .connected()
        .filter(|(player_id, _)| recipient.includes(player_id))
        .filter(|(_, link)| link.send(Arc::clone(&message)))
        .count()
}

#[cfg(test)]
mod tests {
    use hexhaven_protocol::PlayerId;

    use super::*;

    fn heartbeat() -> ServerMessage {
        ServerMessage::HeartbeatAck {
            client_time: 1,
            server_time: 2,
        }
    }

    #[test]
    fn test_link_dies_with_handler() {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = PlayerLink::new(SocketId::new(1), &tx);
        assert!(link.is_alive());
        assert!(link.send(Arc::new(heartbeat())));

        drop(rx);
        assert!(!link.is_alive());
        drop(tx);
        assert!(!link.send(Arc::new(heartbeat())));
    }

    #[test]
    fn test_fan_out_respects_recipient() {
        let mut tracker = ConnectionTracker::new(4);
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        let p1 = PlayerId::new("p1");
        let p2 = PlayerId::new("p2");
        tracker
            .join(p1.clone(), "P1".into(), PlayerLink::new(SocketId::new(1), &tx1))
            .unwrap();
        tracker
            .join(p2.clone(), "P2".into(), PlayerLink::new(SocketId::new(2), &tx2))
            .unwrap();

        assert_eq!(fan_out(&tracker, &Recipient::All, heartbeat()), 2);
        assert_eq!(fan_out(&tracker, &Recipient::AllExcept(p1.clone()), heartbeat()), 1);
        assert_eq!(fan_out(&tracker, &Recipient::Player(p1), heartbeat()), 1);

        let mut got1 = 0;
        while rx1.try_recv().is_ok() {
            got1 += 1;
        }
        let mut got2 = 0;
        while rx2.try_recv().is_ok() {
            got2 += 1;
        }
        assert_eq!((got1, got2), (2, 2));
    }

    #[test]
    fn test_fan_out_shares_one_allocation() {
        let mut tracker = ConnectionTracker::new(4);
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        tracker
            .join(PlayerId::new("a"), "A".into(), PlayerLink::new(SocketId::new(1), &tx1))
            .unwrap();
        tracker
            .join(PlayerId::new("b"), "B".into(), PlayerLink::new(SocketId::new(2), &tx2))
            .unwrap();

        fan_out(&tracker, &Recipient::All, heartbeat());
        let a = rx1.try_recv().unwrap();
        let b = rx2.try_recv().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
