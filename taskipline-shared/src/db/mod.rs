/// Database layer for Taskipline
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with a health check
/// - `migrations`: sqlx migration runner
///
/// Models live in the `models` module at crate root; multi-row transactional
/// operations live in `graph`.

pub mod migrations;
pub mod pool;
