//! Post Store Module
//!
//! Volatile in-memory collection of posts. Writers take the lock exclusively;
//! readers receive cloned snapshots so nothing iterates the live list.

use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::Post;

/// Errors raised by store mutations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    /// A post with this id already exists
    #[error("Duplicate post id: {0}")]
    DuplicateId(Uuid),
}

// == Post Store ==
/// Ordered, id-unique collection of posts.
#[derive(Debug, Default)]
pub struct PostStore {
    posts: RwLock<Vec<Post>>,
}

impl PostStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with the fixture posts.
    pub fn seeded() -> Self {
        Self {
            posts: RwLock::new(seed_posts()),
        }
    }

    // == Reads ==
    /// Returns a snapshot of every post in insertion order.
    pub async fn list(&self) -> Vec<Post> {
        self.posts.read().await.clone()
    }

    /// Returns a copy of the post with the given id.
    pub async fn get(&self, id: Uuid) -> Option<Post> {
        self.posts.read().await.iter().find(|p| p.id == id).cloned()
    }

    /// Returns the number of stored posts.
    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    /// Returns true if the store holds no posts.
    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }

    // == Writes ==
    /// Appends a post, rejecting duplicate ids.
    pub async fn insert(&self, post: Post) -> Result<(), StoreError> {
        let mut posts = self.posts.write().await;
        if posts.iter().any(|p| p.id == post.id) {
            return Err(StoreError::DuplicateId(post.id));
        }
        posts.push(post);
        Ok(())
    }

    /// Replaces title and content of an existing post.
    ///
    /// Returns false when no post has the given id.
    pub async fn update(&self, id: Uuid, title: &str, content: &str) -> bool {
        let mut posts = self.posts.write().await;
        match posts.iter_mut().find(|p| p.id == id) {
            Some(post) => {
                post.title = title.trim().to_string();
                post.content = content.trim().to_string();
                true
            }
            None => false,
        }
    }

    /// Removes the post with the given id. Returns false when it did not exist.
    pub async fn remove(&self, id: Uuid) -> bool {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        posts.len() != before
    }
}

// == Fixtures ==
fn seed_posts() -> Vec<Post> {
    [
        (
            "Hello, World!",
            "This is a sample post. Welcome to a blog about building web services.",
        ),
        (
            "Designing HTTP APIs that age well",
            "Stable resource names, explicit status codes and structured error bodies keep clients working long after the first release.",
        ),
        (
            "Getting started with async request handlers",
            "Async handlers let one process serve many concurrent requests. This post walks through writing a first endpoint and wiring it into a router.",
        ),
        (
            "Passing shared state to handlers",
            "Stores, caches and limiters are built once at startup and handed to every handler. This post shows how to keep that state explicit and testable.",
        ),
        (
            "Validating request bodies",
            "Rejecting bad input before it reaches business logic keeps handlers small and error messages consistent.",
        ),
        (
            "Streaming updates to the browser",
            "Server-sent events and websockets make it easy to push live updates from a web service to its clients.",
        ),
        (
            "Protecting forms against cross-site request forgery",
            "Anti-forgery tokens bind a state-changing request to the session that fetched the page. This post covers token issue, transport and verification.",
        ),
        (
            "Caching reads without serving stale data",
            "A read-through cache is only as good as its invalidation policy. This post explains evicting every affected key on each write.",
        ),
        (
            "Deploying behind a reverse proxy",
            "Forwarded headers, TLS termination and health probes all change once a proxy sits in front of the service.",
        ),
        (
            "Testing handlers end to end",
            "Driving the real router in tests exercises middleware, extractors and handlers together. This post shows how to write those tests.",
        ),
    ]
    .into_iter()
    .map(|(title, content)| Post::new(title, content))
    .collect()
}
