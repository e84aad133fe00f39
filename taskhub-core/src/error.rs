use thiserror::Error;

/// Failures inside the access-decision path.
///
/// A `HashFailure` is fatal for the one check that hit it: callers must
/// treat the credential as untrusted and deny, never fall through to
/// "not revoked".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("digest output too short to derive bit positions")]
    HashFailure,
}

/// Failures inside the realtime fan-out path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RealtimeError {
    #[error("connection is closed")]
    ConnectionDead,
}
