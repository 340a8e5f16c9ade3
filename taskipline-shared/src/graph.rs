/// Goal/task consistency coordinator
///
/// Every write that touches the goal<->task relation lives here and runs in
/// a single database transaction. The relation is stored on both sides:
/// `goals.task_ids` holds the goal's ordered member list and `tasks.goal_id`
/// holds the task's back-reference. After any committed operation the two
/// sides agree exactly; a rolled-back operation leaves both untouched.
///
/// Rows being re-linked are locked with `SELECT ... FOR UPDATE` so that
/// concurrent moves of the same task serialize instead of interleaving.
///
/// # Example
///
/// ```rust,no_run
/// use taskipline_shared::graph;
/// use taskipline_shared::models::task::CreateTask;
///
/// # async fn example(pool: sqlx::PgPool, user_id: uuid::Uuid, goal_id: uuid::Uuid) {
/// let task = graph::create_task(
///     &pool,
///     user_id,
///     CreateTask {
///         title: "Write chapter one".to_string(),
///         description: None,
///         due_date: None,
///         priority: None,
///         goal_id: Some(goal_id),
///     },
/// )
/// .await
/// .unwrap();
/// assert_eq!(task.goal_id, Some(goal_id));
/// # }
/// ```

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::goal::{Goal, GoalStatus};
use crate::models::task::{CreateTask, Task, UpdateTask};

/// Errors from goal/task graph operations
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The referenced goal does not exist or belongs to another user
    #[error("goal not found")]
    GoalNotFound,

    /// The referenced task does not exist or belongs to another user
    #[error("task not found")]
    TaskNotFound,

    /// Database error
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Fields for creating a goal together with its initial tasks
#[derive(Debug, Clone)]
pub struct CreateGoal {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<chrono::DateTime<chrono::Utc>>,
    pub status: Option<GoalStatus>,
    /// Tasks to create and link to the new goal in one transaction
    pub tasks: Vec<CreateTask>,
}

/// Creates a goal and its initial tasks atomically.
///
/// Each task row is inserted with the new goal's id and appended to the
/// goal's `task_ids` in input order. Either everything lands or nothing
/// does.
pub async fn create_goal_with_tasks(
    pool: &PgPool,
    user_id: Uuid,
    data: CreateGoal,
) -> Result<(Goal, Vec<Task>), GraphError> {
    let mut tx = pool.begin().await?;

    let goal = sqlx::query_as::<_, Goal>(
        r#"
        INSERT INTO goals (user_id, title, description, due_date, status)
        VALUES ($1, $2, $3, $4, COALESCE($5, 'in_progress'))
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&data.title)
    .bind(&data.description)
    .bind(data.due_date)
    .bind(data.status)
    .fetch_one(&mut *tx)
    .await?;

    let mut tasks = Vec::with_capacity(data.tasks.len());
    for task in data.tasks {
        let task = insert_task(&mut tx, user_id, Some(goal.id), &task).await?;
        tasks.push(task);
    }

    // Re-read the goal so task_ids reflects the appends made above.
    let goal = sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = $1")
        .bind(goal.id)
        .fetch_one(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok((goal, tasks))
}

/// Creates a task, optionally linked to one of the user's goals.
///
/// When a goal id is given, the goal must exist and belong to the user; the
/// task row and the goal's `task_ids` append commit together.
pub async fn create_task(
    pool: &PgPool,
    user_id: Uuid,
    data: CreateTask,
) -> Result<Task, GraphError> {
    let mut tx = pool.begin().await?;

    let goal_id = match data.goal_id {
        Some(goal_id) => {
            lock_goal(&mut tx, goal_id, user_id).await?;
            Some(goal_id)
        }
        None => None,
    };

    let task = insert_task(&mut tx, user_id, goal_id, &data).await?;

    tx.commit().await?;
    Ok(task)
}

/// Updates a task's scalar fields and, when `goal_change` is present,
/// re-links it.
///
/// `goal_change` is tri-state: `None` leaves the link alone,
/// `Some(None)` detaches the task from its current goal, and
/// `Some(Some(id))` moves it to the given goal. A move detaches from the
/// old goal and attaches to the new one in the same transaction; the task
/// never appears in two goals or in none mid-move.
pub async fn update_task(
    pool: &PgPool,
    user_id: Uuid,
    task_id: Uuid,
    data: UpdateTask,
    goal_change: Option<Option<Uuid>>,
) -> Result<Task, GraphError> {
    let mut tx = pool.begin().await?;

    // Lock the task row so concurrent re-links of the same task serialize.
    let current = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(GraphError::TaskNotFound)?;

    let new_goal_id = match goal_change {
        None => current.goal_id,
        Some(target) => {
            if target != current.goal_id {
                // Lock every goal row the move touches, in id order, before
                // mutating either member list. Two moves between the same
                // pair of goals then take the locks in the same order and
                // serialize instead of deadlocking.
                let mut affected: Vec<Uuid> =
                    current.goal_id.into_iter().chain(target).collect();
                affected.sort();
                for goal_id in &affected {
                    lock_goal(&mut tx, *goal_id, user_id).await?;
                }

                if let Some(old_goal) = current.goal_id {
                    detach_from_goal(&mut tx, old_goal, task_id).await?;
                }
                if let Some(new_goal) = target {
                    attach_to_goal(&mut tx, new_goal, task_id).await?;
                }
            }
            target
        }
    };

    let task = sqlx::query_as::<_, Task>(
        r#"
        UPDATE tasks
        SET title = COALESCE($3, title),
            description = COALESCE($4, description),
            due_date = COALESCE($5, due_date),
            priority = COALESCE($6, priority),
            is_completed = COALESCE($7, is_completed),
            goal_id = $8,
            updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(task_id)
    .bind(user_id)
    .bind(data.title)
    .bind(data.description)
    .bind(data.due_date)
    .bind(data.priority)
    .bind(data.is_completed)
    .bind(new_goal_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(task)
}

/// Deletes a goal and every task linked to it, atomically.
pub async fn delete_goal(pool: &PgPool, user_id: Uuid, goal_id: Uuid) -> Result<(), GraphError> {
    let mut tx = pool.begin().await?;

    lock_goal(&mut tx, goal_id, user_id).await?;

    sqlx::query("DELETE FROM tasks WHERE goal_id = $1")
        .bind(goal_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM goals WHERE id = $1")
        .bind(goal_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Deletes a task, removing it from its goal's member list if linked.
pub async fn delete_task(pool: &PgPool, user_id: Uuid, task_id: Uuid) -> Result<(), GraphError> {
    let mut tx = pool.begin().await?;

    let task = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(task_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(GraphError::TaskNotFound)?;

    if let Some(goal_id) = task.goal_id {
        detach_from_goal(&mut tx, goal_id, task_id).await?;
    }

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Deletes a user and everything they own, atomically.
///
/// Tasks go first, then goals, then the account row; the foreign keys
/// require this order.
pub async fn purge_user(pool: &PgPool, user_id: Uuid) -> Result<(), GraphError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM tasks WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM goals WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Locks a goal row for the rest of the transaction, verifying ownership.
async fn lock_goal(
    tx: &mut Transaction<'_, Postgres>,
    goal_id: Uuid,
    user_id: Uuid,
) -> Result<(), GraphError> {
    let found: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM goals WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(goal_id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await?;
    found.map(|_| ()).ok_or(GraphError::GoalNotFound)
}

async fn attach_to_goal(
    tx: &mut Transaction<'_, Postgres>,
    goal_id: Uuid,
    task_id: Uuid,
) -> Result<(), GraphError> {
    sqlx::query(
        "UPDATE goals SET task_ids = array_append(task_ids, $2), updated_at = NOW() WHERE id = $1",
    )
    .bind(goal_id)
    .bind(task_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn detach_from_goal(
    tx: &mut Transaction<'_, Postgres>,
    goal_id: Uuid,
    task_id: Uuid,
) -> Result<(), GraphError> {
    sqlx::query(
        "UPDATE goals SET task_ids = array_remove(task_ids, $2), updated_at = NOW() WHERE id = $1",
    )
    .bind(goal_id)
    .bind(task_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_task(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    goal_id: Option<Uuid>,
    data: &CreateTask,
) -> Result<Task, GraphError> {
    let task = sqlx::query_as::<_, Task>(
        r#"
        INSERT INTO tasks (user_id, goal_id, title, description, due_date, priority)
        VALUES ($1, $2, $3, $4, $5, COALESCE($6, 'medium'))
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(goal_id)
    .bind(&data.title)
    .bind(&data.description)
    .bind(data.due_date)
    .bind(data.priority)
    .fetch_one(&mut **tx)
    .await?;

    if let Some(goal_id) = goal_id {
        attach_to_goal(tx, goal_id, task.id).await?;
    }

    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_error_display() {
        assert_eq!(GraphError::GoalNotFound.to_string(), "goal not found");
        assert_eq!(GraphError::TaskNotFound.to_string(), "task not found");
    }
}
