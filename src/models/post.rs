//! The blog post record.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A blog post owned by the [`PostStore`](crate::store::PostStore).
///
/// The id is a time-ordered version 7 UUID assigned at creation and never
/// changed afterwards; title and content are replaced in place by updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
}

impl Post {
    /// Creates a post with a fresh version 7 id. Title and content are trimmed.
    pub fn new(title: &str, content: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            title: title.trim().to_string(),
            content: content.trim().to_string(),
        }
    }
}
