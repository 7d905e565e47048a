//! Background Tasks Module
//!
//! # Tasks
//! - Maintenance: expired cache entries, rate limit windows and anti-forgery
//!   sessions, at a fixed interval

mod maintenance;

pub use maintenance::spawn_maintenance_task;
