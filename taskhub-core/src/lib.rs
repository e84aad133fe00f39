//! Domain core for the Taskhub task tracker.
//!
//! This crate owns the two genuinely stateful pieces of the system (the
//! probabilistic revocation filter and the live connection registry) plus
//! the access-decision pipeline and realtime dispatcher that sit on top of
//! them. It deliberately knows nothing about HTTP or storage; those live in
//! `taskhub-server` and talk to this crate through plain types and the
//! [`access::TokenVerifier`] seam.

pub mod access;
pub mod error;
pub mod realtime;
pub mod revocation;

pub use access::{AccessPipeline, Decision, DenyReason, Identity, TokenVerifier, VerifyError};
pub use error::{AccessError, RealtimeError};
pub use revocation::{FilterStats, RevocationFilter};
