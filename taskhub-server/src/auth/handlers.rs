//! Account lifecycle endpoints: register, login, logout, token
//! introspection.

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskhub_core::FilterStats;
use taskhub_core::access::{self, TokenVerifier};
use taskhub_model::{
    ApiResponse, AuthResponse, LoginRequest, PublicUser, RegisterRequest, User, VerifyRequest,
    VerifyResponse,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::{password, store};
use crate::errors::{AppError, AppResult};
use crate::infra::app_state::AppState;

/// Response of the `check-revoked` diagnostic endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationCheckResponse {
    /// First characters of the probed token, for log correlation.
    pub token: String,
    pub revoked: bool,
    pub stats: FilterStats,
}

fn validate_registration(request: &RegisterRequest) -> Result<(), AppError> {
    if request.username.trim().len() < 3 {
        return Err(AppError::bad_request(
            "Username must be at least 3 characters",
        ));
    }
    let email = request.email.trim();
    if !email.contains('@') || !email.contains('.') {
        return Err(AppError::bad_request("Invalid email"));
    }
    if request.password.len() < 6 {
        return Err(AppError::bad_request(
            "Password must be at least 6 characters",
        ));
    }
    Ok(())
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<AuthResponse>>)> {
    validate_registration(&body)?;
    let username = body.username.trim().to_string();
    let email = body.email.trim().to_string();

    if store::find_by_username(&state.pool, &username).await?.is_some() {
        return Err(AppError::bad_request("Username already exists"));
    }
    if store::find_by_email(&state.pool, &email).await?.is_some() {
        return Err(AppError::bad_request("Email already exists"));
    }

    let password_hash = password::hash_password(&body.password)
        .map_err(|err| AppError::internal(format!("password hashing failed: {err}")))?;
    let user = User {
        id: Uuid::new_v4(),
        username,
        email,
        password_hash,
        created_at: Utc::now().timestamp(),
    };
    store::insert_user(&state.pool, &user).await?;

    let token = state
        .tokens
        .issue(&user)
        .map_err(|err| AppError::internal(format!("token issuance failed: {err}")))?;

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(
            ApiResponse::success(AuthResponse {
                user: PublicUser::from(&user),
                token,
            })
            .with_message("User created successfully".to_string()),
        ),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<AuthResponse>>> {
    // Unknown user and wrong password answer identically.
    let Some(user) = store::find_by_username(&state.pool, body.username.trim()).await? else {
        return Err(AppError::unauthorized("Invalid credentials"));
    };

    let valid = password::verify_password(&body.password, &user.password_hash)
        .map_err(|err| AppError::internal(format!("password verification failed: {err}")))?;
    if !valid {
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let token = state
        .tokens
        .issue(&user)
        .map_err(|err| AppError::internal(format!("token issuance failed: {err}")))?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(
        ApiResponse::success(AuthResponse {
            user: PublicUser::from(&user),
            token,
        })
        .with_message("Login successful".to_string()),
    ))
}

/// Revoke the presented token.
///
/// Logging out without a token is not an error (the session may already be
/// gone client-side); a filter failure is, because the revocation would be
/// silently lost.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<()>>> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(access::bearer_token);

    if let Some(token) = token {
        state.revocations.add(token).map_err(|err| {
            tracing::error!(error = %err, "failed to record revocation");
            AppError::internal("Logout failed")
        })?;
        info!("token revoked on logout");
    }

    Ok(Json(ApiResponse::message("Logged out successfully".to_string())))
}

/// Signature/expiry check only; the middleware path is where revocation is
/// enforced.
pub async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> (StatusCode, Json<VerifyResponse>) {
    match state.verifier.verify(&body.token) {
        Ok(claims) => (
            StatusCode::OK,
            Json(VerifyResponse {
                valid: true,
                user: Some(claims),
            }),
        ),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(VerifyResponse {
                valid: false,
                user: None,
            }),
        ),
    }
}

/// Diagnostic endpoint: probe the revocation filter for a token.
pub async fn check_revoked(
    State(state): State<AppState>,
    Json(body): Json<VerifyRequest>,
) -> AppResult<Json<RevocationCheckResponse>> {
    if body.token.is_empty() {
        return Err(AppError::bad_request("Token required"));
    }

    let revoked = state.revocations.contains(&body.token).map_err(|err| {
        tracing::error!(error = %err, "revocation probe failed");
        AppError::internal("Check failed")
    })?;

    let preview: String = body.token.chars().take(20).collect();
    Ok(Json(RevocationCheckResponse {
        token: format!("{preview}..."),
        revoked,
        stats: state.revocations.stats(),
    }))
}
