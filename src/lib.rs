//! Post Guard - a blog post API behind a request-validation pipeline
//!
//! Anti-forgery tokens, request validation, rate limiting and a read-through
//! cache in front of an in-memory post store.

pub mod antiforgery;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod health;
pub mod models;
pub mod rate_limit;
pub mod store;
pub mod tasks;
pub mod validation;

pub use api::{create_router, AppState};
pub use config::Config;
pub use tasks::spawn_maintenance_task;
