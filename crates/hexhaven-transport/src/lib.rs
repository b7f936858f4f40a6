//! Socket layer for Hexhaven.
//!
//! Provides the [`Transport`] and [`Connection`] traits so the server loop
//! never names a concrete network library. Browsers talk to us over
//! WebSocket, which is the only implementation today.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Process-unique identifier for one accepted socket.
///
/// A player keeps the same `PlayerId` across page reloads, but every
/// reload opens a new socket with a new `SocketId`. Rooms use it to tell a
/// stale socket closing apart from the player's current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(u64);

impl SocketId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SocketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sock-{}", self.0)
    }
}

/// Accepts new incoming sockets.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming socket.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// One accepted socket.
///
/// Sending and receiving may happen concurrently from different tasks:
/// a handler can be parked in [`recv`](Connection::recv) while a snapshot
/// is pushed through [`send`](Connection::send).
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Sends one message. UTF-8 payloads go out as text frames.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message. `Ok(None)` means a clean close.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> SocketId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_socket_id_new_and_into_inner() {
        assert_eq!(SocketId::new(42).into_inner(), 42);
    }

    #[test]
    fn test_socket_id_display() {
        assert_eq!(SocketId::new(7).to_string(), "sock-7");
    }

    #[test]
    fn test_socket_id_orders_by_value() {
        assert!(SocketId::new(1) < SocketId::new(2));
        assert_eq!(SocketId::new(3), SocketId::new(3));
    }
}
