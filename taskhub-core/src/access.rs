//! Request admission: public allow-list, bearer extraction, revocation
//! check, then cryptographic verification, in that order.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use taskhub_model::Claims;
use thiserror::Error;

use crate::error::AccessError;
use crate::revocation::RevocationFilter;

const BEARER_PREFIX: &str = "Bearer ";

/// Why the external verifier rejected a token. Opaque to the pipeline; the
/// detail only ever reaches debug logs.
#[derive(Debug, Clone, Error)]
#[error("token verification failed: {0}")]
pub struct VerifyError(pub String);

/// Contract for the external credential verifier (signature + expiry).
///
/// "Now" is owned by the implementation; the pipeline never looks at a
/// clock itself.
pub trait TokenVerifier: Send + Sync {
    fn verify(&self, token: &str) -> Result<Claims, VerifyError>;
}

/// Who is making the request, once admitted.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    /// A request on the public allow-list; no token was inspected.
    Anonymous,
    /// A verified, non-revoked bearer of these claims.
    User(Claims),
}

/// Stable denial reasons. Recoverable per request, never retried by the
/// server; the client must re-authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoToken,
    Revoked,
    InvalidOrExpired,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NoToken => "No token provided",
            DenyReason::Revoked => "Token has been revoked",
            DenyReason::InvalidOrExpired => "Invalid or expired token",
        }
    }
}

/// Outcome of an admission decision.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow(Identity),
    Deny(DenyReason),
}

/// Composes the revocation filter with the external verifier.
///
/// `decide` is a pure function of its arguments, the current filter state,
/// and whatever clock the verifier consults; it mutates nothing.
#[derive(Clone)]
pub struct AccessPipeline {
    public_paths: HashSet<String>,
    revocations: Arc<RevocationFilter>,
    verifier: Arc<dyn TokenVerifier>,
}

impl fmt::Debug for AccessPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessPipeline")
            .field("public_paths", &self.public_paths)
            .field("filter", &self.revocations.stats())
            .finish_non_exhaustive()
    }
}

impl AccessPipeline {
    pub fn new(
        public_paths: impl IntoIterator<Item = impl Into<String>>,
        revocations: Arc<RevocationFilter>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            public_paths: public_paths.into_iter().map(Into::into).collect(),
            revocations,
            verifier,
        }
    }

    /// Admit or deny one inbound request.
    ///
    /// An `Err` means the revocation check itself could not be trusted;
    /// the HTTP layer must fail closed and deny.
    pub fn decide(
        &self,
        path: &str,
        authorization: Option<&str>,
    ) -> Result<Decision, AccessError> {
        if self.public_paths.contains(path) {
            return Ok(Decision::Allow(Identity::Anonymous));
        }

        let Some(token) = authorization.and_then(bearer_token) else {
            return Ok(Decision::Deny(DenyReason::NoToken));
        };

        self.authenticate(token)
    }

    /// Steps 3–4 of `decide` for callers that obtain the token somewhere
    /// other than the Authorization header (the WebSocket upgrade reads a
    /// query parameter).
    pub fn authenticate(&self, token: &str) -> Result<Decision, AccessError> {
        // Revocation is checked before the signature: logout must win even
        // against a token that still verifies, and the filter lookup costs
        // O(hash rounds) regardless of key material.
        if self.revocations.contains(token)? {
            return Ok(Decision::Deny(DenyReason::Revoked));
        }

        match self.verifier.verify(token) {
            Ok(claims) => Ok(Decision::Allow(Identity::User(claims))),
            Err(err) => {
                tracing::debug!(error = %err, "token failed verification");
                Ok(Decision::Deny(DenyReason::InvalidOrExpired))
            }
        }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix(BEARER_PREFIX)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    struct StubVerifier {
        accept: bool,
    }

    impl TokenVerifier for StubVerifier {
        fn verify(&self, _token: &str) -> Result<Claims, VerifyError> {
            if self.accept {
                Ok(test_claims())
            } else {
                Err(VerifyError("bad signature".to_string()))
            }
        }
    }

    fn test_claims() -> Claims {
        Claims {
            sub: Uuid::nil(),
            username: "alice".to_string(),
            iat: 0,
            exp: i64::MAX,
        }
    }

    fn pipeline(accept: bool) -> (AccessPipeline, Arc<RevocationFilter>) {
        let filter = Arc::new(RevocationFilter::new(10_000, 3));
        let pipeline = AccessPipeline::new(
            ["/api/auth/login", "/api/auth/register"],
            Arc::clone(&filter),
            Arc::new(StubVerifier { accept }),
        );
        (pipeline, filter)
    }

    #[test]
    fn public_path_allows_anonymous_without_token_inspection() {
        let (pipeline, _) = pipeline(false);

        // Even a garbage header is ignored on the allow-list.
        let decision = pipeline
            .decide("/api/auth/login", Some("Bearer completely-bogus"))
            .unwrap();
        assert_eq!(decision, Decision::Allow(Identity::Anonymous));
    }

    #[test]
    fn missing_or_malformed_header_is_no_token() {
        let (pipeline, _) = pipeline(true);

        for authorization in [None, Some("Basic abc"), Some("Bearer "), Some("token")] {
            let decision = pipeline.decide("/api/tasks", authorization).unwrap();
            assert_eq!(decision, Decision::Deny(DenyReason::NoToken));
        }
    }

    #[test]
    fn revocation_wins_over_a_valid_signature() {
        let (pipeline, filter) = pipeline(true);
        filter.add("still-signed").unwrap();

        let decision = pipeline
            .decide("/api/tasks", Some("Bearer still-signed"))
            .unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::Revoked));
    }

    #[test]
    fn failed_verification_is_invalid_or_expired() {
        let (pipeline, _) = pipeline(false);

        let decision = pipeline
            .decide("/api/tasks", Some("Bearer tampered"))
            .unwrap();
        assert_eq!(decision, Decision::Deny(DenyReason::InvalidOrExpired));
    }

    #[test]
    fn valid_token_allows_with_claims() {
        let (pipeline, _) = pipeline(true);

        let decision = pipeline
            .decide("/api/tasks", Some("Bearer good-token"))
            .unwrap();
        assert_eq!(decision, Decision::Allow(Identity::User(test_claims())));
    }

    #[test]
    fn clear_forgets_previous_revocations() {
        let (pipeline, filter) = pipeline(true);
        filter.add("tok").unwrap();
        filter.clear();

        let decision = pipeline.decide("/api/tasks", Some("Bearer tok")).unwrap();
        assert_eq!(decision, Decision::Allow(Identity::User(test_claims())));
    }

    #[test]
    fn bearer_extraction_requires_exact_scheme() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token(""), None);
    }
}
