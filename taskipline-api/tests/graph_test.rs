/// Integration tests for goal/task consistency
///
/// Verifies that both sides of the goal<->task link move together through
/// every operation that touches the relation. Skipped when `DATABASE_URL`
/// is not set.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;
use taskipline_shared::graph;
use taskipline_shared::models::goal::Goal;
use taskipline_shared::models::task::{Task, UpdateTask};
use uuid::Uuid;

async fn assert_link_consistent(ctx: &common::TestContext, user_id: Uuid) {
    let goals = Goal::list_by_owner(&ctx.db, user_id).await.unwrap();
    let tasks = Task::list_by_owner(&ctx.db, user_id).await.unwrap();

    for goal in &goals {
        for task_id in &goal.task_ids {
            let task = tasks.iter().find(|t| t.id == *task_id).unwrap_or_else(|| {
                panic!("goal {} lists missing task {}", goal.id, task_id)
            });
            assert_eq!(task.goal_id, Some(goal.id), "task back-reference mismatch");
        }
    }

    for task in &tasks {
        if let Some(goal_id) = task.goal_id {
            let goal = goals
                .iter()
                .find(|g| g.id == goal_id)
                .unwrap_or_else(|| panic!("task {} points at missing goal", task.id));
            assert!(
                goal.task_ids.contains(&task.id),
                "goal {} does not list task {}",
                goal.id,
                task.id
            );
        }
    }
}

#[tokio::test]
async fn test_create_goal_with_tasks_links_both_sides() {
    let Some(ctx) = common::try_context().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let user = ctx.create_verified_user().await;
    let token = ctx.access_token(&user);

    let (status, body, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&token),
            None,
            Some(json!({
                "title": "Write a novel",
                "tasks": [
                    { "title": "Outline the plot" },
                    { "title": "Draft chapter one", "priority": "high" },
                ],
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["task_ids"].as_array().unwrap().len(), 2);
    assert_eq!(body["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(body["completion_percentage"], 0);

    let goal_id: Uuid = body["id"].as_str().unwrap().parse().unwrap();
    for task in body["tasks"].as_array().unwrap() {
        assert_eq!(task["goal_id"].as_str().unwrap(), goal_id.to_string());
    }

    assert_link_consistent(&ctx, user.id).await;
    ctx.cleanup_user(user.id).await;
}

#[tokio::test]
async fn test_move_task_between_goals() {
    let Some(ctx) = common::try_context().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let user = ctx.create_verified_user().await;
    let token = ctx.access_token(&user);

    let (_, goal_a, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&token),
            None,
            Some(json!({ "title": "Goal A", "tasks": [{ "title": "Movable task" }] })),
        )
        .await;
    let (_, goal_b, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&token),
            None,
            Some(json!({ "title": "Goal B" })),
        )
        .await;

    let task_id = goal_a["tasks"][0]["id"].as_str().unwrap();
    let goal_a_id: Uuid = goal_a["id"].as_str().unwrap().parse().unwrap();
    let goal_b_id: Uuid = goal_b["id"].as_str().unwrap().parse().unwrap();

    let (status, body, _) = ctx
        .send(
            Method::PATCH,
            &format!("/v1/tasks/{task_id}"),
            Some(&token),
            None,
            Some(json!({ "goal_id": goal_b_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["goal_id"].as_str().unwrap(), goal_b_id.to_string());

    let a = Goal::find_by_id_and_owner(&ctx.db, goal_a_id, user.id)
        .await
        .unwrap()
        .unwrap();
    let b = Goal::find_by_id_and_owner(&ctx.db, goal_b_id, user.id)
        .await
        .unwrap()
        .unwrap();
    let task_uuid: Uuid = task_id.parse().unwrap();
    assert!(!a.task_ids.contains(&task_uuid));
    assert!(b.task_ids.contains(&task_uuid));

    assert_link_consistent(&ctx, user.id).await;
    ctx.cleanup_user(user.id).await;
}

#[tokio::test]
async fn test_concurrent_opposite_moves_serialize() {
    let Some(ctx) = common::try_context().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let user = ctx.create_verified_user().await;
    let token = ctx.access_token(&user);

    let (_, goal_a, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&token),
            None,
            Some(json!({ "title": "Goal A", "tasks": [{ "title": "Task in A" }] })),
        )
        .await;
    let (_, goal_b, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&token),
            None,
            Some(json!({ "title": "Goal B", "tasks": [{ "title": "Task in B" }] })),
        )
        .await;

    let goal_a_id: Uuid = goal_a["id"].as_str().unwrap().parse().unwrap();
    let goal_b_id: Uuid = goal_b["id"].as_str().unwrap().parse().unwrap();
    let task_a: Uuid = goal_a["tasks"][0]["id"].as_str().unwrap().parse().unwrap();
    let task_b: Uuid = goal_b["tasks"][0]["id"].as_str().unwrap().parse().unwrap();

    // Swap the two tasks at the same time. Both moves touch the same pair
    // of goal rows; they must serialize and both land, never deadlock.
    let (moved_a, moved_b) = tokio::join!(
        graph::update_task(
            &ctx.db,
            user.id,
            task_a,
            UpdateTask::default(),
            Some(Some(goal_b_id)),
        ),
        graph::update_task(
            &ctx.db,
            user.id,
            task_b,
            UpdateTask::default(),
            Some(Some(goal_a_id)),
        ),
    );
    assert_eq!(moved_a.unwrap().goal_id, Some(goal_b_id));
    assert_eq!(moved_b.unwrap().goal_id, Some(goal_a_id));

    assert_link_consistent(&ctx, user.id).await;
    ctx.cleanup_user(user.id).await;
}

#[tokio::test]
async fn test_null_goal_id_detaches_and_absence_keeps_link() {
    let Some(ctx) = common::try_context().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let user = ctx.create_verified_user().await;
    let token = ctx.access_token(&user);

    let (_, goal, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&token),
            None,
            Some(json!({ "title": "Goal", "tasks": [{ "title": "Task" }] })),
        )
        .await;
    let task_id = goal["tasks"][0]["id"].as_str().unwrap().to_string();

    // PATCH without goal_id leaves the link alone.
    let (status, body, _) = ctx
        .send(
            Method::PATCH,
            &format!("/v1/tasks/{task_id}"),
            Some(&token),
            None,
            Some(json!({ "title": "Renamed task" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["goal_id"].is_string());

    // Explicit null detaches.
    let (status, body, _) = ctx
        .send(
            Method::PATCH,
            &format!("/v1/tasks/{task_id}"),
            Some(&token),
            None,
            Some(json!({ "goal_id": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["goal_id"].is_null());

    let goal_id: Uuid = goal["id"].as_str().unwrap().parse().unwrap();
    let g = Goal::find_by_id_and_owner(&ctx.db, goal_id, user.id)
        .await
        .unwrap()
        .unwrap();
    assert!(g.task_ids.is_empty());

    assert_link_consistent(&ctx, user.id).await;
    ctx.cleanup_user(user.id).await;
}

#[tokio::test]
async fn test_linking_to_foreign_goal_is_refused() {
    let Some(ctx) = common::try_context().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let owner = ctx.create_verified_user().await;
    let intruder = ctx.create_verified_user().await;

    let (_, goal, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&ctx.access_token(&owner)),
            None,
            Some(json!({ "title": "Private goal" })),
        )
        .await;
    let goal_id = goal["id"].as_str().unwrap();

    // Another user's goal answers GOAL_NOT_FOUND, not FORBIDDEN.
    let (status, body, _) = ctx
        .send(
            Method::POST,
            "/v1/tasks",
            Some(&ctx.access_token(&intruder)),
            None,
            Some(json!({ "title": "Sneaky task", "goal_id": goal_id })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "GOAL_NOT_FOUND");

    // Nothing was created for the intruder.
    let tasks = Task::list_by_owner(&ctx.db, intruder.id).await.unwrap();
    assert!(tasks.is_empty());

    ctx.cleanup_user(owner.id).await;
    ctx.cleanup_user(intruder.id).await;
}

#[tokio::test]
async fn test_delete_goal_removes_linked_tasks() {
    let Some(ctx) = common::try_context().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let user = ctx.create_verified_user().await;
    let token = ctx.access_token(&user);

    let (_, goal, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&token),
            None,
            Some(json!({
                "title": "Doomed goal",
                "tasks": [{ "title": "T1" }, { "title": "T2" }],
            })),
        )
        .await;
    let goal_id = goal["id"].as_str().unwrap();

    // A standalone task survives the goal deletion.
    let (_, standalone, _) = ctx
        .send(
            Method::POST,
            "/v1/tasks",
            Some(&token),
            None,
            Some(json!({ "title": "Standalone" })),
        )
        .await;

    let (status, _, _) = ctx
        .send(
            Method::DELETE,
            &format!("/v1/goals/{goal_id}"),
            Some(&token),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let tasks = Task::list_by_owner(&ctx.db, user.id).await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id.to_string(), standalone["id"].as_str().unwrap());

    ctx.cleanup_user(user.id).await;
}

#[tokio::test]
async fn test_delete_task_detaches_from_goal() {
    let Some(ctx) = common::try_context().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let user = ctx.create_verified_user().await;
    let token = ctx.access_token(&user);

    let (_, goal, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&token),
            None,
            Some(json!({ "title": "Goal", "tasks": [{ "title": "Task" }] })),
        )
        .await;
    let task_id = goal["tasks"][0]["id"].as_str().unwrap();

    let (status, _, _) = ctx
        .send(
            Method::DELETE,
            &format!("/v1/tasks/{task_id}"),
            Some(&token),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let goal_id: Uuid = goal["id"].as_str().unwrap().parse().unwrap();
    let g = Goal::find_by_id_and_owner(&ctx.db, goal_id, user.id)
        .await
        .unwrap()
        .unwrap();
    assert!(g.task_ids.is_empty());

    ctx.cleanup_user(user.id).await;
}

#[tokio::test]
async fn test_completion_percentage_tracks_task_state() {
    let Some(ctx) = common::try_context().await else {
        eprintln!("skipping: DATABASE_URL not set");
        return;
    };

    let user = ctx.create_verified_user().await;
    let token = ctx.access_token(&user);

    let (_, goal, _) = ctx
        .send(
            Method::POST,
            "/v1/goals",
            Some(&token),
            None,
            Some(json!({ "title": "Goal", "tasks": [{ "title": "A" }, { "title": "B" }] })),
        )
        .await;
    let goal_id = goal["id"].as_str().unwrap();
    let task_id = goal["tasks"][0]["id"].as_str().unwrap();

    let (status, _, _) = ctx
        .send(
            Method::PATCH,
            &format!("/v1/tasks/{task_id}"),
            Some(&token),
            None,
            Some(json!({ "is_completed": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body, _) = ctx
        .send(
            Method::GET,
            &format!("/v1/goals/{goal_id}"),
            Some(&token),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["completion_percentage"], 50);

    ctx.cleanup_user(user.id).await;
}
