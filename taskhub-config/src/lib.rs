//! Shared configuration library for Taskhub.
//!
//! Centralizes env-var loading, defaults, and validation so the server
//! binary and tests agree on a single source of truth for config keys.
//! Every knob has a sensible default except `JWT_SECRET`, which the loader
//! refuses to invent.

pub mod loader;
pub mod models;

pub use loader::ConfigError;
pub use models::{
    AuthConfig, Config, CorsConfig, DatabaseConfig, RevocationConfig, ServerConfig,
};
