/// Task endpoints
///
/// Tasks are scoped to the authenticated owner; another user's task answers
/// `TASK_NOT_FOUND`. Creation and deletion, and any change to the task's
/// goal link, go through the graph module so both sides of the goal<->task
/// relation move in one transaction.
///
/// # Endpoints
///
/// - `POST   /v1/tasks` - Create a task, optionally linked to a goal
/// - `GET    /v1/tasks` - List tasks
/// - `GET    /v1/tasks/:id` - Fetch one task
/// - `PATCH  /v1/tasks/:id` - Update fields and/or re-link
/// - `DELETE /v1/tasks/:id` - Delete the task
///
/// # Re-linking
///
/// The PATCH body's `goal_id` field is tri-state: omitting it leaves the
/// link untouched, sending `null` detaches the task, and sending an id
/// moves it to that goal.

use crate::{
    app::{AppState, AuthUser},
    error::{validation_errors, ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use taskipline_shared::{
    graph,
    models::task::{CreateTask, Task, TaskPriority, UpdateTask},
};
use uuid::Uuid;
use validator::Validate;

/// Task creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub priority: Option<TaskPriority>,

    /// Goal to link the new task to, if any
    pub goal_id: Option<Uuid>,
}

/// Task update request
///
/// `goal_id` distinguishes "field absent" from "field null" so a PATCH can
/// detach a task without touching anything else.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub priority: Option<TaskPriority>,

    pub is_completed: Option<bool>,

    /// Absent: keep link. `null`: detach. Id: move to that goal.
    #[serde(default, deserialize_with = "double_option")]
    pub goal_id: Option<Option<Uuid>>,
}

/// Generic message-only response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Deserializes a field where absence and explicit `null` mean different
/// things: absence never reaches this function (serde falls back to the
/// `default`), so a seen `null` becomes `Some(None)`.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

/// Create a task, optionally linked to one of the caller's goals
///
/// # Errors
///
/// - `404 Not Found`: `GOAL_NOT_FOUND` when the referenced goal does not
///   exist or belongs to another user
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate().map_err(validation_errors)?;

    let task = graph::create_task(
        &state.db,
        auth.user_id,
        CreateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            priority: req.priority,
            goal_id: req.goal_id,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// List the caller's tasks, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = Task::list_by_owner(&state.db, auth.user_id).await?;
    Ok(Json(tasks))
}

/// Fetch one task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = Task::find_by_id_and_owner(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(ApiError::task_not_found)?;

    Ok(Json(task))
}

/// Update task fields and/or re-link it to a different goal
///
/// # Errors
///
/// - `404 Not Found`: `TASK_NOT_FOUND`, or `GOAL_NOT_FOUND` when the
///   re-link target does not exist or belongs to another user
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate().map_err(validation_errors)?;

    let task = graph::update_task(
        &state.db,
        auth.user_id,
        id,
        UpdateTask {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            priority: req.priority,
            is_completed: req.is_completed,
        },
        req.goal_id,
    )
    .await?;

    Ok(Json(task))
}

/// Delete the task, detaching it from its goal if linked
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    graph::delete_task(&state.db, auth.user_id, id).await?;

    Ok(Json(MessageResponse {
        message: "Task deleted.".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_id_absent_keeps_link() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"title": "x"}"#).unwrap();
        assert_eq!(req.goal_id, None);
    }

    #[test]
    fn test_goal_id_null_detaches() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"goal_id": null}"#).unwrap();
        assert_eq!(req.goal_id, Some(None));
    }

    #[test]
    fn test_goal_id_value_relinks() {
        let id = Uuid::new_v4();
        let req: UpdateTaskRequest =
            serde_json::from_str(&format!(r#"{{"goal_id": "{id}"}}"#)).unwrap();
        assert_eq!(req.goal_id, Some(Some(id)));
    }
}
