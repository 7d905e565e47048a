//! API Module
//!
//! HTTP handlers, pipeline middleware and routing for the post API.
//!
//! # Endpoints
//! - `GET /posts` - List posts (issues an anti-forgery token)
//! - `GET /posts/:id` - Get a post
//! - `POST /posts` - Create a post
//! - `PUT /posts` - Update a post
//! - `DELETE /posts/:id` - Delete a post
//! - `GET /aft` - Get an anti-forgery token
//! - `GET /health`, `GET /healthCheck` - Health
//! - `GET /exception` - Fault demonstration

pub mod extract;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod routes;

pub use extract::Validated;
pub use handlers::{AppState, DATA_SOURCE_HEADER};
pub use routes::create_router;
