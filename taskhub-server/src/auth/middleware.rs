//! Global admission middleware: every request passes through the access
//! pipeline before it reaches a handler.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use taskhub_core::{Decision, Identity};

use crate::errors::AppError;
use crate::infra::app_state::AppState;

/// Paths admitted without token inspection. `/ws` is listed because the
/// upgrade handler authenticates its own query-string token; everything
/// else here genuinely needs no identity.
pub const PUBLIC_PATHS: [&str; 6] = [
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/verify",
    "/api/auth/logout",
    "/api/health",
    "/ws",
];

pub async fn access_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let decision = state
        .access
        .decide(&path, authorization.as_deref())
        .map_err(|err| {
            // The check itself could not be trusted; fail closed.
            tracing::error!(error = %err, "revocation check failed");
            AppError::unauthorized("Unauthorized - revocation check unavailable")
        })?;

    match decision {
        Decision::Allow(Identity::Anonymous) => Ok(next.run(request).await),
        Decision::Allow(Identity::User(claims)) => {
            request.extensions_mut().insert(claims);
            Ok(next.run(request).await)
        }
        Decision::Deny(reason) => Err(AppError::unauthorized(format!(
            "Unauthorized - {}",
            reason.message()
        ))),
    }
}
