/// Database models for Taskipline
///
/// # Models
///
/// - `user`: accounts and their security-relevant fields
/// - `goal`: goal aggregates owning an ordered set of task ids
/// - `task`: tasks, optionally linked to one goal
///
/// Each model exposes single-row atomic operations only. Anything that
/// touches the goal<->task relation across rows goes through `crate::graph`.

pub mod goal;
pub mod task;
pub mod user;
