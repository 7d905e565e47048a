//! Domain record and request/response models for the post API
//!
//! This module defines the `Post` record plus the DTOs (Data Transfer Objects)
//! used for serializing/deserializing HTTP request and response bodies.

pub mod post;
pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use post::Post;
pub use requests::{CreatePostRequest, ExceptionQuery, UpdatePostRequest};
pub use responses::{AfToken, HealthCheckEntry, HealthReport};
