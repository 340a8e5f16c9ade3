/// API route handlers
///
/// - `health`: liveness and database connectivity
/// - `auth`: session lifecycle (signup through password reset)
/// - `users`: authenticated account management
/// - `goals`: goal CRUD
/// - `tasks`: task CRUD

pub mod auth;
pub mod goals;
pub mod health;
pub mod tasks;
pub mod users;
