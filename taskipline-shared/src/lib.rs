//! # Taskipline Shared Library
//!
//! This crate contains the types, persistence layer, and security primitives
//! shared by the Taskipline API server.
//!
//! ## Module Organization
//!
//! - `models`: database models and single-row operations
//! - `auth`: password hashing and token primitives
//! - `graph`: transactional goal/task linkage operations
//! - `db`: connection pool and migrations
//! - `email`: outbound email dispatch

pub mod auth;
pub mod db;
pub mod email;
pub mod graph;
pub mod models;

/// Current version of the Taskipline shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
