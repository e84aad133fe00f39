use std::fmt;
use std::sync::Arc;

use sqlx::SqlitePool;
use taskhub_config::Config;
use taskhub_core::realtime::{ConnectionRegistry, RealtimeDispatcher};
use taskhub_core::{AccessPipeline, RevocationFilter};

use crate::auth::jwt::{JwtVerifier, TokenIssuer};
use crate::auth::middleware::PUBLIC_PATHS;

/// Shared handles for everything a handler can touch.
///
/// Constructed exactly once in `main` and cloned into each request; no
/// component is reachable through a global.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<Config>,
    pub revocations: Arc<RevocationFilter>,
    pub registry: ConnectionRegistry,
    pub dispatcher: RealtimeDispatcher,
    pub access: Arc<AccessPipeline>,
    pub verifier: Arc<JwtVerifier>,
    pub tokens: Arc<TokenIssuer>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: Config, pool: SqlitePool) -> Self {
        let revocations = Arc::new(RevocationFilter::new(
            config.revocation.capacity_hint,
            config.revocation.hash_count,
        ));
        let registry = ConnectionRegistry::new();
        let dispatcher = RealtimeDispatcher::new(registry.clone());
        let verifier = Arc::new(JwtVerifier::new(&config.auth.jwt_secret));
        let tokens = Arc::new(TokenIssuer::new(
            &config.auth.jwt_secret,
            config.auth.token_ttl_secs,
        ));
        let access = Arc::new(AccessPipeline::new(
            PUBLIC_PATHS,
            Arc::clone(&revocations),
            verifier.clone(),
        ));

        Self {
            pool,
            config: Arc::new(config),
            revocations,
            registry,
            dispatcher,
            access,
            verifier,
            tokens,
        }
    }
}
