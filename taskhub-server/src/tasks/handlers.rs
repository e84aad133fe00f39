//! Task CRUD endpoints.
//!
//! Every mutation broadcasts to the owner's live connections only after the
//! row is committed, so a subscriber can never observe a change that might
//! still roll back.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
};
use serde::Deserialize;
use taskhub_core::realtime::{DeletedTask, TaskMutation};
use taskhub_model::{ApiResponse, Claims, CreateTaskRequest, Task, UpdateTaskRequest};

use crate::errors::{AppError, AppResult};
use crate::infra::app_state::AppState;
use crate::tasks::store;

#[derive(Debug, Clone, Deserialize)]
pub struct ListTasksQuery {
    pub q: Option<String>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListTasksQuery>,
) -> AppResult<Json<ApiResponse<Vec<Task>>>> {
    let tasks = store::list_for_user(&state.pool, claims.sub, query.q.as_deref()).await?;
    Ok(Json(ApiResponse::success(tasks)))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(body): Json<CreateTaskRequest>,
) -> AppResult<(StatusCode, [(header::HeaderName, String); 1], Json<ApiResponse<Task>>)> {
    let title = body.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title required"));
    }

    let task = store::insert(
        &state.pool,
        claims.sub,
        title,
        body.status.unwrap_or_default(),
        body.priority.unwrap_or_default(),
        body.module.as_deref(),
    )
    .await?;

    state
        .dispatcher
        .on_mutation(claims.sub, TaskMutation::Create(task.clone()));

    let location = format!("/api/tasks/{}", task.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiResponse::success(task)),
    ))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(patch): Json<UpdateTaskRequest>,
) -> AppResult<Json<ApiResponse<Task>>> {
    let Some(mut task) = store::get(&state.pool, id).await? else {
        return Err(AppError::not_found("task not found"));
    };
    if task.user_id != claims.sub {
        return Err(AppError::forbidden("task belongs to another user"));
    }

    if let Some(title) = patch.title {
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(AppError::bad_request("title required"));
        }
        task.title = title;
    }
    if let Some(status) = patch.status {
        task.status = status;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }
    if let Some(module) = patch.module {
        task.module = Some(module);
    }

    store::update(&state.pool, &task).await?;

    state
        .dispatcher
        .on_mutation(claims.sub, TaskMutation::Update(task.clone()));

    Ok(Json(ApiResponse::success(task)))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<()>>> {
    let Some(task) = store::get(&state.pool, id).await? else {
        return Err(AppError::not_found("task not found"));
    };
    if task.user_id != claims.sub {
        return Err(AppError::forbidden("task belongs to another user"));
    }

    store::delete(&state.pool, id).await?;

    state
        .dispatcher
        .on_mutation(claims.sub, TaskMutation::Delete(DeletedTask { id }));

    Ok(Json(ApiResponse::message("task deleted".to_string())))
}
