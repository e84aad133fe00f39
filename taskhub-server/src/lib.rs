//! HTTP/WebSocket surface of the Taskhub task tracker.
//!
//! Routing, handlers, and storage live here; the revocation filter, access
//! pipeline, and connection registry they drive live in `taskhub-core`.

pub mod auth;
pub mod errors;
pub mod infra;
pub mod routes;
pub mod tasks;
pub mod websocket;

pub use infra::app_state::AppState;

#[cfg(test)]
mod tests;
