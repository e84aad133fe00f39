use uuid::Uuid;

use super::protocol::{ClientMessage, ServerMessage, TaskMutation};
use super::registry::ConnectionRegistry;

/// Bridges committed task mutations into the connection registry and
/// classifies inbound client frames.
#[derive(Debug, Clone)]
pub struct RealtimeDispatcher {
    registry: ConnectionRegistry,
}

impl RealtimeDispatcher {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Push one committed mutation to the owner's live connections.
    ///
    /// Contract: callers invoke this strictly after the storage transaction
    /// has committed, so a connected client never observes a change that
    /// could still roll back. Returns the delivered count.
    pub fn on_mutation(&self, user_id: Uuid, mutation: TaskMutation) -> usize {
        self.registry.broadcast(user_id, mutation)
    }

    /// Handle one raw inbound frame from a client.
    ///
    /// A ping earns a pong; every other `type` value, recognized or not,
    /// is logged at debug and dropped. Malformed input never closes the
    /// connection and is never treated as a task event.
    pub fn handle_client_frame(&self, raw: &str) -> Option<ServerMessage> {
        match serde_json::from_str::<ClientMessage>(raw) {
            Ok(ClientMessage::Ping) => Some(ServerMessage::Pong),
            Err(err) => {
                tracing::debug!(error = %err, "ignoring unrecognized client frame");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use taskhub_model::{Task, TaskPriority, TaskStatus};
    use tokio::sync::mpsc;

    use super::*;

    fn dispatcher() -> (RealtimeDispatcher, ConnectionRegistry) {
        let registry = ConnectionRegistry::new();
        (RealtimeDispatcher::new(registry.clone()), registry)
    }

    #[test]
    fn ping_earns_a_pong() {
        let (dispatcher, _) = dispatcher();
        assert_eq!(
            dispatcher.handle_client_frame(r#"{"type":"ping"}"#),
            Some(ServerMessage::Pong)
        );
    }

    #[test]
    fn unrecognized_frames_are_dropped_silently() {
        let (dispatcher, _) = dispatcher();

        assert_eq!(dispatcher.handle_client_frame(r#"{"type":"hello"}"#), None);
        assert_eq!(dispatcher.handle_client_frame("{broken"), None);
        assert_eq!(dispatcher.handle_client_frame(""), None);
        // A client echoing a server-side task envelope is not a task event.
        assert_eq!(
            dispatcher.handle_client_frame(r#"{"type":"task","eventType":"create"}"#),
            None
        );
    }

    #[test]
    fn mutations_flow_through_the_registry() {
        let (dispatcher, registry) = dispatcher();
        let user = Uuid::new_v4();
        let (tx, mut rx) = mpsc::channel(8);
        registry.add_connection(tx, user, "alice");

        let task = Task {
            id: 9,
            user_id: user,
            title: "review".to_string(),
            status: TaskStatus::InProgress,
            priority: TaskPriority::Low,
            module: None,
            created_at: 0,
        };
        let delivered = dispatcher.on_mutation(user, TaskMutation::Create(task));

        assert_eq!(delivered, 1);
        assert!(matches!(
            rx.try_recv().unwrap(),
            ServerMessage::Task { .. }
        ));
    }
}
