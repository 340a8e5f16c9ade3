/// Goal endpoints
///
/// Goals are always scoped to the authenticated owner; another user's goal
/// answers `GOAL_NOT_FOUND`, indistinguishable from a goal that does not
/// exist. Reads annotate each goal with a completion percentage derived
/// from its linked tasks.
///
/// # Endpoints
///
/// - `POST   /v1/goals` - Create a goal, optionally with initial tasks
/// - `GET    /v1/goals` - List goals with completion stats
/// - `GET    /v1/goals/:id` - Fetch one goal with completion stats
/// - `PATCH  /v1/goals/:id` - Update scalar fields
/// - `DELETE /v1/goals/:id` - Delete the goal and its linked tasks

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
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use taskipline_shared::{
    graph,
    models::{
        goal::{completion_percentage, Goal, GoalStatus, UpdateGoal},
        task::{CreateTask, Task, TaskPriority},
    },
};
use uuid::Uuid;
use validator::Validate;

/// A task created inline with a new goal
#[derive(Debug, Deserialize, Validate)]
pub struct InlineTaskRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub priority: Option<TaskPriority>,
}

/// Goal creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGoalRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub status: Option<GoalStatus>,

    /// Tasks to create and link in the same transaction
    #[serde(default)]
    #[validate(nested)]
    pub tasks: Vec<InlineTaskRequest>,
}

/// Goal update request (scalar fields only)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGoalRequest {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub due_date: Option<DateTime<Utc>>,

    pub status: Option<GoalStatus>,
}

/// Goal annotated with task completion stats
#[derive(Debug, Serialize)]
pub struct GoalResponse {
    #[serde(flatten)]
    pub goal: Goal,

    /// `round(100 * completed / total)`; 0 for a goal with no tasks
    pub completion_percentage: u8,
}

/// Newly created goal together with its initial tasks
#[derive(Debug, Serialize)]
pub struct GoalWithTasksResponse {
    #[serde(flatten)]
    pub goal: GoalResponse,

    pub tasks: Vec<Task>,
}

/// Generic message-only response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Create a goal, optionally with initial tasks
///
/// The goal row, every task row, and the goal's member list land in one
/// transaction: either the whole structure exists or none of it does.
pub async fn create_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(req): Json<CreateGoalRequest>,
) -> ApiResult<(StatusCode, Json<GoalWithTasksResponse>)> {
    req.validate().map_err(validation_errors)?;

    let tasks = req
        .tasks
        .into_iter()
        .map(|t| CreateTask {
            title: t.title,
            description: t.description,
            due_date: t.due_date,
            priority: t.priority,
            goal_id: None,
        })
        .collect();

    let (goal, tasks) = graph::create_goal_with_tasks(
        &state.db,
        auth.user_id,
        graph::CreateGoal {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            status: req.status,
            tasks,
        },
    )
    .await?;

    // Freshly created tasks are never completed.
    let total = tasks.len() as i64;
    let response = GoalWithTasksResponse {
        goal: GoalResponse {
            goal,
            completion_percentage: completion_percentage(0, total),
        },
        tasks,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// List goals with completion stats, newest first
pub async fn list_goals(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<Vec<GoalResponse>>> {
    let goals = Goal::list_by_owner(&state.db, auth.user_id).await?;
    let counts: HashMap<Uuid, (i64, i64)> = Task::counts_by_goal(&state.db, auth.user_id)
        .await?
        .into_iter()
        .map(|c| (c.goal_id, (c.completed, c.total)))
        .collect();

    let response = goals
        .into_iter()
        .map(|goal| {
            let (completed, total) = counts.get(&goal.id).copied().unwrap_or((0, 0));
            GoalResponse {
                goal,
                completion_percentage: completion_percentage(completed, total),
            }
        })
        .collect();

    Ok(Json(response))
}

/// Fetch one goal with completion stats
pub async fn get_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<GoalResponse>> {
    let goal = Goal::find_by_id_and_owner(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(ApiError::goal_not_found)?;

    let (total, completed) = Task::counts_for_goal(&state.db, goal.id).await?;

    Ok(Json(GoalResponse {
        goal,
        completion_percentage: completion_percentage(completed, total),
    }))
}

/// Update scalar goal fields; absent fields keep their current value
pub async fn update_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateGoalRequest>,
) -> ApiResult<Json<GoalResponse>> {
    req.validate().map_err(validation_errors)?;

    let goal = Goal::update(
        &state.db,
        id,
        auth.user_id,
        UpdateGoal {
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            status: req.status,
        },
    )
    .await?
    .ok_or_else(ApiError::goal_not_found)?;

    let (total, completed) = Task::counts_for_goal(&state.db, goal.id).await?;

    Ok(Json(GoalResponse {
        goal,
        completion_percentage: completion_percentage(completed, total),
    }))
}

/// Delete the goal and every task linked to it
pub async fn delete_goal(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    graph::delete_goal(&state.db, auth.user_id, id).await?;

    Ok(Json(MessageResponse {
        message: "Goal and its tasks deleted.".to_string(),
    }))
}
