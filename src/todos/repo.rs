use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Todo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub done: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

pub async fn list_by_owner(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Todo>> {
    let rows = sqlx::query_as::<_, Todo>(
        r#"
        SELECT id, user_id, title, description, done, created_at, updated_at
        FROM todos
        WHERE user_id = $1
        ORDER BY created_at DESC
    "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    description: Option<&str>,
) -> anyhow::Result<Todo> {
    let todo = sqlx::query_as::<_, Todo>(
        r#"
        INSERT INTO todos (user_id, title, description)
        VALUES ($1, $2, $3)
        RETURNING id, user_id, title, description, done, created_at, updated_at
    "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(description)
    .fetch_one(db)
    .await?;
    Ok(todo)
}

/// Flip the done flag on a todo the user owns. `None` covers both a missing
/// row and a row owned by someone else; callers cannot tell the two apart.
pub async fn set_done(
    db: &PgPool,
    user_id: Uuid,
    todo_id: Uuid,
    done: bool,
) -> anyhow::Result<Option<Todo>> {
    let todo = sqlx::query_as::<_, Todo>(
        r#"
        UPDATE todos
        SET done = $1, updated_at = now()
        WHERE id = $2 AND user_id = $3
        RETURNING id, user_id, title, description, done, created_at, updated_at
    "#,
    )
    .bind(done)
    .bind(todo_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(todo)
}
