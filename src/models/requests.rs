//! Request DTOs for the post API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.
//! Field names also accept PascalCase (`Title`). Bodies carry their
//! validation rules as `validator` attributes.

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

/// Request body for `POST /posts`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[serde(alias = "Title")]
    #[validate(
        length(min = 5, message = "The length of 'Title' must be at least 5 characters."),
        custom(function = "crate::validation::validate_title")
    )]
    pub title: String,
    #[serde(alias = "Content")]
    #[validate(
        length(min = 15, message = "The length of 'Content' must be at least 15 characters."),
        custom(function = "crate::validation::validate_content")
    )]
    pub content: String,
}

/// Request body for `PUT /posts`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[serde(alias = "Id")]
    #[validate(custom(function = "crate::validation::validate_post_id"))]
    pub id: Uuid,
    #[serde(alias = "Title")]
    #[validate(
        length(min = 5, message = "The length of 'Title' must be at least 5 characters."),
        custom(function = "crate::validation::validate_title")
    )]
    pub title: String,
    #[serde(alias = "Content")]
    #[validate(
        length(min = 15, message = "The length of 'Content' must be at least 15 characters."),
        custom(function = "crate::validation::validate_content")
    )]
    pub content: String,
}

/// Query string for `GET /exception`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExceptionQuery {
    #[serde(alias = "Name")]
    pub name: Option<String>,
}
