use axum::{
    Json, Router,
    http::HeaderValue,
    middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};
use taskhub_config::CorsConfig;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth, infra::app_state::AppState, tasks, websocket};

/// Assemble the full application router.
///
/// The access middleware wraps every route; public paths are admitted
/// inside `decide`, not by routing tricks, so the allow-list lives in one
/// place.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        // Authentication
        .route("/api/auth/register", post(auth::handlers::register))
        .route("/api/auth/login", post(auth::handlers::login))
        .route("/api/auth/logout", post(auth::handlers::logout))
        .route("/api/auth/verify", post(auth::handlers::verify))
        .route("/api/auth/check-revoked", post(auth::handlers::check_revoked))
        // Tasks
        .route(
            "/api/tasks",
            get(tasks::handlers::list_tasks).post(tasks::handlers::create_task),
        )
        .route(
            "/api/tasks/{id}",
            put(tasks::handlers::update_task).delete(tasks::handlers::delete_task),
        )
        // Realtime
        .route("/ws", get(websocket::websocket_handler))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::access_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    if config.is_wildcard_included() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
