//! # Taskipline API Server Library
//!
//! This library provides the core functionality for the Taskipline API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `cookie`: Refresh-token cookie handling
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod cookie;
pub mod error;
pub mod routes;
