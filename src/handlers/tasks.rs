use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::CurrentUser,
    models::{CreateTask, MessageResponse, PageQuery, Task, TaskPage, UpdateTask},
};

pub const DEFAULT_PAGE_SIZE: u32 = 6;
pub const MAX_PAGE_SIZE: u32 = 100;

fn required_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    Ok(title.to_string())
}

fn count_to_u32(count: i64) -> Result<u32, AppError> {
    u32::try_from(count).map_err(|_| AppError::Internal(format!("Task count out of range: {count}")))
}

async fn find_owned(pool: &SqlitePool, id: &str, user_id: i64) -> Result<Task, AppError> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Note not found".to_string()))
}

#[utoipa::path(
    post,
    path = "/api/notes",
    request_body = CreateTask,
    responses(
        (status = 201, description = "Task created", body = Task),
        (status = 400, description = "Title is required"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
pub async fn create_task(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), AppError> {
    let title = required_title(&payload.title)?;
    let now = Utc::now();

    let task = Task {
        id: Uuid::new_v4().to_string(),
        title,
        completed: payload.completed,
        user_id: user.id,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO tasks (id, title, completed, user_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&task.id)
    .bind(&task.title)
    .bind(task.completed)
    .bind(task.user_id)
    .bind(task.created_at)
    .bind(task.updated_at)
    .execute(&pool)
    .await?;

    tracing::debug!(task_id = %task.id, user_id = user.id, "created task");
    Ok((StatusCode::CREATED, Json(task)))
}

#[utoipa::path(
    get,
    path = "/api/notes",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of the caller's tasks, newest first", body = TaskPage),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
pub async fn list_tasks(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Query(params): Query<PageQuery>,
) -> Result<Json<TaskPage>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = i64::from(page - 1) * i64::from(limit);

    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE user_id = ?")
        .bind(user.id)
        .fetch_one(&pool)
        .await?;
    let total_count = count_to_u32(total_count)?;

    // rowid breaks ties between tasks created within the same instant
    let todos = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE user_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT ? OFFSET ?",
    )
    .bind(user.id)
    .bind(i64::from(limit))
    .bind(offset)
    .fetch_all(&pool)
    .await?;

    Ok(Json(TaskPage {
        todos,
        total_pages: total_count.div_ceil(limit),
        current_page: page,
        total_count,
    }))
}

#[utoipa::path(
    get,
    path = "/api/notes/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task details", body = Task),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
pub async fn get_task(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Task>, AppError> {
    find_owned(&pool, &id, user.id).await.map(Json)
}

#[utoipa::path(
    put,
    path = "/api/notes/{id}",
    params(("id" = String, Path, description = "Task ID")),
    request_body = UpdateTask,
    responses(
        (status = 200, description = "Task updated", body = Task),
        (status = 400, description = "Title cannot be empty"),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
pub async fn update_task(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTask>,
) -> Result<Json<Task>, AppError> {
    let mut task = find_owned(&pool, &id, user.id).await?;

    if let Some(title) = payload.title.as_deref() {
        task.title = required_title(title)
            .map_err(|_| AppError::Validation("Title cannot be empty".to_string()))?;
    }
    if let Some(completed) = payload.completed {
        task.completed = completed;
    }
    task.updated_at = Utc::now();

    sqlx::query(
        "UPDATE tasks SET title = ?, completed = ?, updated_at = ?
        WHERE id = ? AND user_id = ?",
    )
    .bind(&task.title)
    .bind(task.completed)
    .bind(task.updated_at)
    .bind(&task.id)
    .bind(user.id)
    .execute(&pool)
    .await?;

    Ok(Json(task))
}

#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    params(("id" = String, Path, description = "Task ID")),
    responses(
        (status = 200, description = "Task deleted", body = MessageResponse),
        (status = 404, description = "Task not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer" = [])),
    tag = "notes"
)]
pub async fn delete_task(
    State(pool): State<SqlitePool>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
        .bind(&id)
        .bind(user.id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Note not found".to_string()));
    }

    tracing::debug!(task_id = %id, user_id = user.id, "deleted task");
    Ok(Json(MessageResponse {
        message: "Note deleted successfully".to_string(),
    }))
}
