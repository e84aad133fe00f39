use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::connection::Connection;
use super::protocol::{ServerMessage, TaskMutation};

/// Tracks every live WebSocket connection, keyed by connection id.
///
/// All three mutating operations (`add_connection`, `remove_connection`,
/// `broadcast`) may run concurrently from any task; the map is sharded, and
/// broadcasts snapshot their recipients before sending so a connection
/// removed mid-call is either observed-then-removed or already absent,
/// never torn.
#[derive(Clone)]
pub struct ConnectionRegistry {
    connections: Arc<DashMap<Uuid, Arc<Connection>>>,
}

impl fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connection_count", &self.connections.len())
            .finish()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: Arc::new(DashMap::new()),
        }
    }

    /// Register a new connection for `user_id`; returns its process-unique
    /// id.
    pub fn add_connection(
        &self,
        sender: mpsc::Sender<ServerMessage>,
        user_id: Uuid,
        username: impl Into<String>,
    ) -> Uuid {
        let connection = Arc::new(Connection::new(sender, user_id, username.into()));
        let id = connection.id;
        tracing::info!(
            connection_id = %id,
            user_id = %user_id,
            username = %connection.username,
            "client connected"
        );
        self.connections.insert(id, connection);
        id
    }

    /// Remove a connection. Idempotent: removing an unknown id is a no-op,
    /// and racing an in-flight broadcast is fine.
    pub fn remove_connection(&self, connection_id: Uuid) {
        if let Some((_, connection)) = self.connections.remove(&connection_id) {
            connection.mark_closed();
            tracing::info!(connection_id = %connection_id, "client disconnected");
        }
    }

    pub fn get_connection(&self, connection_id: &Uuid) -> Option<Arc<Connection>> {
        self.connections.get(connection_id).map(|c| c.clone())
    }

    /// Deliver one mutation to every live connection owned by `user_id`.
    ///
    /// The envelope is built once, so all recipients see the same
    /// timestamp. A failed send is proof of death: that connection is
    /// removed on the spot and the loop continues; one dead consumer never
    /// aborts delivery to the rest. Returns how many connections accepted
    /// the frame (observability only).
    pub fn broadcast(&self, user_id: Uuid, mutation: TaskMutation) -> usize {
        let event_type = mutation.event_type();
        let message = ServerMessage::Task {
            mutation,
            timestamp: Utc::now().timestamp_millis(),
        };

        let recipients: Vec<Arc<Connection>> = self
            .connections
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();

        let mut delivered = 0;
        for connection in recipients {
            match connection.send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::warn!(
                        connection_id = %connection.id,
                        user_id = %user_id,
                        "dropping dead connection during broadcast"
                    );
                    self.remove_connection(connection.id);
                }
            }
        }

        tracing::debug!(
            event = event_type,
            delivered,
            user_id = %user_id,
            "broadcast complete"
        );
        delivered
    }

    pub fn connection_count_for_user(&self, user_id: Uuid) -> usize {
        self.connections
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .count()
    }

    pub fn total_connections(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use taskhub_model::{Task, TaskPriority, TaskStatus};

    use super::*;
    use crate::realtime::protocol::DeletedTask;

    fn task_for(user_id: Uuid, id: i64) -> Task {
        Task {
            id,
            user_id,
            title: format!("task {id}"),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            module: Some("core".to_string()),
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn add_then_remove_restores_counts() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();
        assert_eq!(registry.total_connections(), 0);

        let (tx, _rx) = mpsc::channel(8);
        let id = registry.add_connection(tx, user, "alice");
        assert_eq!(registry.connection_count_for_user(user), 1);
        assert_eq!(registry.total_connections(), 1);

        registry.remove_connection(id);
        assert_eq!(registry.connection_count_for_user(user), 0);
        assert_eq!(registry.total_connections(), 0);

        // Removing again is a no-op.
        registry.remove_connection(id);
        assert_eq!(registry.total_connections(), 0);
    }

    #[test]
    fn broadcast_delivers_identical_envelope_to_every_connection() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.add_connection(tx1, user, "phone");
        registry.add_connection(tx2, user, "laptop");

        let delivered = registry.broadcast(user, TaskMutation::Update(task_for(user, 7)));
        assert_eq!(delivered, 2);

        let first = rx1.try_recv().unwrap();
        let second = rx2.try_recv().unwrap();
        assert_eq!(first, second);
        let ServerMessage::Task { mutation, .. } = &first else {
            panic!("expected a task envelope");
        };
        assert_eq!(mutation.event_type(), "update");

        // Delivery does not consume registrations.
        assert_eq!(registry.connection_count_for_user(user), 2);
    }

    #[test]
    fn broadcast_only_reaches_the_owning_user() {
        let registry = ConnectionRegistry::new();
        let owner = Uuid::new_v4();
        let bystander = Uuid::new_v4();

        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        registry.add_connection(tx1, owner, "owner");
        registry.add_connection(tx2, bystander, "bystander");

        let delivered = registry.broadcast(owner, TaskMutation::Delete(DeletedTask { id: 3 }));
        assert_eq!(delivered, 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[test]
    fn dead_connection_is_removed_without_aborting_delivery() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (tx_alive, mut rx_alive) = mpsc::channel(8);
        let (tx_dead, rx_dead) = mpsc::channel(8);
        registry.add_connection(tx_alive, user, "alive");
        registry.add_connection(tx_dead, user, "dead");
        drop(rx_dead);

        let delivered = registry.broadcast(user, TaskMutation::Create(task_for(user, 1)));

        assert_eq!(delivered, 1);
        assert!(rx_alive.try_recv().is_ok());
        assert_eq!(registry.connection_count_for_user(user), 1);
        assert_eq!(registry.total_connections(), 1);
    }

    #[test]
    fn successive_broadcasts_arrive_in_call_order() {
        let registry = ConnectionRegistry::new();
        let user = Uuid::new_v4();

        let (tx, mut rx) = mpsc::channel(8);
        registry.add_connection(tx, user, "alice");

        registry.broadcast(user, TaskMutation::Create(task_for(user, 1)));
        registry.broadcast(user, TaskMutation::Delete(DeletedTask { id: 1 }));

        let ServerMessage::Task { mutation: first, .. } = rx.try_recv().unwrap() else {
            panic!("expected a task envelope");
        };
        let ServerMessage::Task { mutation: second, .. } = rx.try_recv().unwrap() else {
            panic!("expected a task envelope");
        };
        assert_eq!(first.event_type(), "create");
        assert_eq!(second.event_type(), "delete");
    }
}
