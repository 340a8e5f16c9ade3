/// Goal model
///
/// A goal aggregates zero or more tasks. `task_ids` is the goal's side of
/// the bidirectional goal<->task link; the task's side is `tasks.goal_id`.
/// After every committed mutation the two sides agree exactly - all writes
/// to the relation happen inside `crate::graph` transactions, never here.
///
/// Scalar fields (title, description, due date, status) are updated through
/// plain single-row operations in this module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Goal progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "goal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    /// Goal is being worked on
    InProgress,

    /// Goal has been completed
    Completed,
}

/// Goal aggregate
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Goal {
    /// Unique goal id
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Goal title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Progress status
    pub status: GoalStatus,

    /// Ids of the tasks linked to this goal, in linking order
    pub task_ids: Vec<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Scalar fields for updating a goal (the task list is managed by `graph`)
#[derive(Debug, Clone, Default)]
pub struct UpdateGoal {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: Option<GoalStatus>,
}

/// Derives a goal's completion percentage from its task counts.
///
/// `round(100 * completed / total)`, defined as 0 for a goal with no tasks.
pub fn completion_percentage(completed: i64, total: i64) -> u8 {
    if total <= 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

impl Goal {
    /// Finds a goal by id, scoped to its owner.
    ///
    /// A goal belonging to another user is reported as absent, identical to
    /// a goal that does not exist.
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's goals, newest first.
    pub async fn list_by_owner(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Goal>(
            "SELECT * FROM goals WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Updates scalar goal fields; absent fields keep their current value.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateGoal,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Goal>(
            r#"
            UPDATE goals
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                due_date = COALESCE($5, due_date),
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.due_date)
        .bind(data.status)
        .fetch_optional(pool)
        .await
    }
}
