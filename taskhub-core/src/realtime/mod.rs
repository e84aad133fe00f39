//! Real-time delivery of task mutations to connected clients.

pub mod connection;
pub mod dispatch;
pub mod protocol;
pub mod registry;

pub use connection::{Connection, SEND_QUEUE_DEPTH};
pub use dispatch::RealtimeDispatcher;
pub use protocol::{ClientMessage, DeletedTask, ServerMessage, TaskMutation};
pub use registry::ConnectionRegistry;
