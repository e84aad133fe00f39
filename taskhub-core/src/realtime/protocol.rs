//! Wire protocol between the server and its WebSocket clients.

use serde::{Deserialize, Serialize};
use taskhub_model::Task;

/// Payload of a delete event; the full row is gone, only the id survives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedTask {
    pub id: i64,
}

/// A committed change to one user's task list.
///
/// Serializes to the `eventType`/`task` pair of the wire envelope, so the
/// payload shape is decided here once instead of at every call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType", content = "task", rename_all = "lowercase")]
pub enum TaskMutation {
    Create(Task),
    Update(Task),
    Delete(DeletedTask),
}

impl TaskMutation {
    pub fn event_type(&self) -> &'static str {
        match self {
            TaskMutation::Create(_) => "create",
            TaskMutation::Update(_) => "update",
            TaskMutation::Delete(_) => "delete",
        }
    }
}

/// Server → client frames.
///
/// The task envelope is exactly
/// `{"type":"task","eventType":...,"task":...,"timestamp":...}` with the
/// timestamp in epoch milliseconds, shared by every recipient of one
/// broadcast call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    Task {
        #[serde(flatten)]
        mutation: TaskMutation,
        timestamp: i64,
    },
    Pong,
}

/// Client → server control frames. Anything that does not parse as one of
/// these is dropped without closing the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Ping,
}

#[cfg(test)]
mod tests {
    use taskhub_model::{TaskPriority, TaskStatus};
    use uuid::Uuid;

    use super::*;

    fn sample_task() -> Task {
        Task {
            id: 7,
            user_id: Uuid::new_v4(),
            title: "write the report".to_string(),
            status: TaskStatus::Todo,
            priority: TaskPriority::High,
            module: None,
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn task_envelope_matches_wire_shape() {
        let message = ServerMessage::Task {
            mutation: TaskMutation::Update(sample_task()),
            timestamp: 1_700_000_123_456,
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "task");
        assert_eq!(value["eventType"], "update");
        assert_eq!(value["task"]["id"], 7);
        assert_eq!(value["task"]["title"], "write the report");
        assert_eq!(value["timestamp"], 1_700_000_123_456i64);
    }

    #[test]
    fn delete_envelope_carries_only_the_id() {
        let message = ServerMessage::Task {
            mutation: TaskMutation::Delete(DeletedTask { id: 42 }),
            timestamp: 0,
        };

        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["eventType"], "delete");
        assert_eq!(value["task"], serde_json::json!({ "id": 42 }));
    }

    #[test]
    fn pong_is_a_bare_type_tag() {
        assert_eq!(
            serde_json::to_string(&ServerMessage::Pong).unwrap(),
            r#"{"type":"pong"}"#
        );
    }

    #[test]
    fn ping_parses_and_unknown_types_do_not() {
        let ping: ClientMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(ping, ClientMessage::Ping);

        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"subscribe"}"#).is_err());
        assert!(serde_json::from_str::<ClientMessage>("not even json").is_err());
    }

    #[test]
    fn event_type_names_match_serialization() {
        let create = TaskMutation::Create(sample_task());
        let value = serde_json::to_value(&create).unwrap();
        assert_eq!(value["eventType"], create.event_type());
    }
}
