/// Task model
///
/// A task is owned by a user and optionally linked to one of that user's
/// goals through `goal_id`. Creating, deleting, and re-linking tasks goes
/// through `crate::graph` so both sides of the goal<->task relation move
/// together; this module only covers single-row reads and scalar updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Task priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

/// Task record
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task id
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Goal this task is linked to, if any
    pub goal_id: Option<Uuid>,

    /// Task title
    pub title: String,

    /// Optional description
    pub description: Option<String>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Priority level
    pub priority: TaskPriority,

    /// Whether the task has been completed
    pub is_completed: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub goal_id: Option<Uuid>,
}

/// Scalar fields for updating a task (re-linking goes through `graph`)
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub is_completed: Option<bool>,
}

/// Completed/total task counts for one goal
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct GoalTaskCounts {
    pub goal_id: Uuid,
    pub total: i64,
    pub completed: i64,
}

impl Task {
    /// Finds a task by id, scoped to its owner.
    ///
    /// Another user's task is reported as absent, identical to a task that
    /// does not exist.
    pub async fn find_by_id_and_owner(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Lists a user's tasks, newest first.
    pub async fn list_by_owner(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Counts completed and total tasks per goal for a user's goals.
    ///
    /// Goals with no tasks produce no row; callers treat a missing goal id
    /// as (0, 0).
    pub async fn counts_by_goal(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<GoalTaskCounts>, sqlx::Error> {
        sqlx::query_as::<_, GoalTaskCounts>(
            r#"
            SELECT goal_id,
                   COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE is_completed) AS completed
            FROM tasks
            WHERE user_id = $1 AND goal_id IS NOT NULL
            GROUP BY goal_id
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Counts completed and total tasks for a single goal.
    pub async fn counts_for_goal(
        pool: &PgPool,
        goal_id: Uuid,
    ) -> Result<(i64, i64), sqlx::Error> {
        let row: (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*),
                   COUNT(*) FILTER (WHERE is_completed)
            FROM tasks
            WHERE goal_id = $1
            "#,
        )
        .bind(goal_id)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_priority_serialization() {
        assert_eq!(serde_json::to_string(&TaskPriority::Low).unwrap(), "\"low\"");
        assert_eq!(
            serde_json::to_string(&TaskPriority::Medium).unwrap(),
            "\"medium\""
        );
        assert_eq!(
            serde_json::to_string(&TaskPriority::High).unwrap(),
            "\"high\""
        );
    }

    #[test]
    fn test_task_priority_deserialization() {
        let p: TaskPriority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(p, TaskPriority::High);
        assert!(serde_json::from_str::<TaskPriority>("\"urgent\"").is_err());
    }
}
