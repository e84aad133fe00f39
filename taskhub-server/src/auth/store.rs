//! User repository.

use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use taskhub_model::User;
use uuid::Uuid;

use crate::infra::db::StoreError;

fn row_to_user(row: &SqliteRow) -> Result<User, StoreError> {
    let id: String = row.try_get("id")?;
    Ok(User {
        id: Uuid::parse_str(&id)
            .map_err(|err| StoreError::Corrupt(format!("user id {id}: {err}")))?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

pub async fn insert_user(pool: &SqlitePool, user: &User) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO users (id, email, username, password_hash, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(user.id.to_string())
    .bind(&user.email)
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, StoreError> {
    let row = sqlx::query(
        "SELECT id, email, username, password_hash, created_at \
         FROM users WHERE username = ?1",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_user).transpose()
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, StoreError> {
    let row = sqlx::query(
        "SELECT id, email, username, password_hash, created_at \
         FROM users WHERE email = ?1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_user).transpose()
}
