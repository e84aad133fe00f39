//! Task repository. Ownership checks live at this layer (fetch, then
//! compare), before any mutation reaches the realtime dispatcher.

use chrono::Utc;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use taskhub_model::{Task, TaskPriority, TaskStatus};
use uuid::Uuid;

use crate::infra::db::StoreError;

fn row_to_task(row: &SqliteRow) -> Result<Task, StoreError> {
    let user_id: String = row.try_get("user_id")?;
    let status: String = row.try_get("status")?;
    let priority: String = row.try_get("priority")?;

    Ok(Task {
        id: row.try_get("id")?,
        user_id: Uuid::parse_str(&user_id)
            .map_err(|err| StoreError::Corrupt(format!("task owner {user_id}: {err}")))?,
        title: row.try_get("title")?,
        status: TaskStatus::parse(&status)
            .ok_or_else(|| StoreError::Corrupt(format!("task status {status:?}")))?,
        priority: TaskPriority::parse(&priority)
            .ok_or_else(|| StoreError::Corrupt(format!("task priority {priority:?}")))?,
        module: row.try_get("module")?,
        created_at: row.try_get("created_at")?,
    })
}

const TASK_COLUMNS: &str = "id, user_id, title, status, priority, module, created_at";

/// All tasks owned by `user_id`, optionally filtered by a case-insensitive
/// title substring.
pub async fn list_for_user(
    pool: &SqlitePool,
    user_id: Uuid,
    filter: Option<&str>,
) -> Result<Vec<Task>, StoreError> {
    let rows = sqlx::query(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1 ORDER BY id"
    ))
    .bind(user_id.to_string())
    .fetch_all(pool)
    .await?;

    let mut tasks = rows
        .iter()
        .map(row_to_task)
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(filter) = filter {
        let needle = filter.to_lowercase();
        if !needle.is_empty() {
            tasks.retain(|task| task.title.to_lowercase().contains(&needle));
        }
    }

    Ok(tasks)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Option<Task>, StoreError> {
    let row = sqlx::query(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(row_to_task).transpose()
}

pub async fn insert(
    pool: &SqlitePool,
    user_id: Uuid,
    title: &str,
    status: TaskStatus,
    priority: TaskPriority,
    module: Option<&str>,
) -> Result<Task, StoreError> {
    let created_at = Utc::now().timestamp();
    let result = sqlx::query(
        "INSERT INTO tasks (user_id, title, status, priority, module, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )
    .bind(user_id.to_string())
    .bind(title)
    .bind(status.as_str())
    .bind(priority.as_str())
    .bind(module)
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(Task {
        id: result.last_insert_rowid(),
        user_id,
        title: title.to_string(),
        status,
        priority,
        module: module.map(str::to_string),
        created_at,
    })
}

pub async fn update(pool: &SqlitePool, task: &Task) -> Result<(), StoreError> {
    sqlx::query(
        "UPDATE tasks SET title = ?1, status = ?2, priority = ?3, module = ?4 WHERE id = ?5",
    )
    .bind(&task.title)
    .bind(task.status.as_str())
    .bind(task.priority.as_str())
    .bind(&task.module)
    .bind(task.id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM tasks WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
