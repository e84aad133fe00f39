use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::protocol::ServerMessage;
use crate::error::RealtimeError;

/// How many outbound frames may queue per connection before the consumer
/// counts as wedged.
pub const SEND_QUEUE_DEPTH: usize = 64;

/// One live duplex channel to a client.
///
/// Owned by the [`ConnectionRegistry`]; created on a successful protocol
/// upgrade and destroyed on disconnect, send failure, or explicit removal.
/// The open to closed transition is terminal: a reconnecting client gets a
/// brand new `Connection` with a new id.
///
/// [`ConnectionRegistry`]: super::registry::ConnectionRegistry
pub struct Connection {
    /// Process-unique connection id.
    pub id: Uuid,
    /// Owning user; one user may hold many simultaneous connections.
    pub user_id: Uuid,
    pub username: String,
    sender: mpsc::Sender<ServerMessage>,
    open: AtomicBool,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("open", &self.is_open())
            .finish()
    }
}

impl Connection {
    pub(crate) fn new(
        sender: mpsc::Sender<ServerMessage>,
        user_id: Uuid,
        username: String,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            username,
            sender,
            open: AtomicBool::new(true),
        }
    }

    /// Queue a frame for the peer without blocking.
    ///
    /// A full queue counts the same as a closed channel: the consumer is
    /// gone or wedged, and a wedged consumer must not stall anyone else, so
    /// the connection is marked closed and the error surfaces to the caller.
    pub fn send(&self, message: ServerMessage) -> Result<(), RealtimeError> {
        if !self.is_open() {
            return Err(RealtimeError::ConnectionDead);
        }

        self.sender.try_send(message).map_err(|_| {
            self.mark_closed();
            RealtimeError::ConnectionDead
        })
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Relaxed) && !self.sender.is_closed()
    }

    pub(crate) fn mark_closed(&self) {
        self.open.store(false, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_queues_while_open() {
        let (tx, mut rx) = mpsc::channel(4);
        let conn = Connection::new(tx, Uuid::new_v4(), "alice".to_string());

        conn.send(ServerMessage::Pong).unwrap();
        assert_eq!(rx.try_recv().unwrap(), ServerMessage::Pong);
        assert!(conn.is_open());
    }

    #[test]
    fn closed_state_is_terminal() {
        let (tx, rx) = mpsc::channel(4);
        let conn = Connection::new(tx, Uuid::new_v4(), "alice".to_string());

        drop(rx);
        assert_eq!(
            conn.send(ServerMessage::Pong),
            Err(RealtimeError::ConnectionDead)
        );

        // Every later send keeps failing; the connection never reopens.
        assert_eq!(
            conn.send(ServerMessage::Pong),
            Err(RealtimeError::ConnectionDead)
        );
        assert!(!conn.is_open());
    }

    #[test]
    fn full_queue_counts_as_dead() {
        let (tx, _rx) = mpsc::channel(1);
        let conn = Connection::new(tx, Uuid::new_v4(), "alice".to_string());

        conn.send(ServerMessage::Pong).unwrap();
        assert_eq!(
            conn.send(ServerMessage::Pong),
            Err(RealtimeError::ConnectionDead)
        );
        assert!(!conn.is_open());
    }
}
