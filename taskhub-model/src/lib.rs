//! Core data model definitions shared across Taskhub crates.
#![allow(missing_docs)]

pub mod api;
pub mod task;
pub mod user;

pub use api::ApiResponse;
pub use task::{CreateTaskRequest, Task, TaskPriority, TaskStatus, UpdateTaskRequest};
pub use user::{
    AuthResponse, Claims, LoginRequest, PublicUser, RegisterRequest, User, VerifyRequest,
    VerifyResponse,
};
