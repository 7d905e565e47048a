//! API Handlers
//!
//! Post CRUD, anti-forgery token issue and the fault demonstration endpoint.
//! Reads go through the read-through cache; every successful mutation evicts
//! the list key and the affected post's key before returning.

use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;
use uuid::Uuid;

use super::extract::Validated;
use crate::antiforgery::Antiforgery;
use crate::cache::{DataSource, HybridCache};
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::health::{CacheCheck, DatabaseCheck, HealthClient, HealthClientError, HealthService};
use crate::models::{AfToken, CreatePostRequest, ExceptionQuery, Post, UpdatePostRequest};
use crate::rate_limit::RateLimiterRegistry;
use crate::store::PostStore;

pub const DATA_SOURCE_HEADER: &str = "x-data-source";

/// Application state shared across all handlers and pipeline stages.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<PostStore>,
    pub cache: HybridCache,
    pub antiforgery: Arc<Antiforgery>,
    pub limiters: RateLimiterRegistry,
    pub health: HealthService,
    pub health_client: HealthClient,
}

impl AppState {
    /// Wires every component around the given store.
    pub fn new(config: Config, store: PostStore) -> std::result::Result<Self, HealthClientError> {
        let store = Arc::new(store);
        let cache = HybridCache::from_config(&config);
        let health = HealthService::new()
            .with_check(DatabaseCheck::new(store.clone()))
            .with_check(CacheCheck::new(cache.clone()));
        let health_client = HealthClient::new(&config.health_base_url, config.health_timeout)?;

        Ok(Self {
            antiforgery: Arc::new(Antiforgery::from_config(&config)),
            limiters: RateLimiterRegistry::from_config(&config.rate_limit),
            config: Arc::new(config),
            store,
            cache,
            health,
            health_client,
        })
    }

    /// State over the seeded store.
    pub fn from_config(config: &Config) -> std::result::Result<Self, HealthClientError> {
        Self::new(config.clone(), PostStore::seeded())
    }

    fn post_key(&self, id: Uuid) -> String {
        format!("{}{}", self.config.post_cache_key_prefix, id)
    }

    /// Evicts every key that could hold `id` or the post list.
    async fn invalidate(&self, id: Uuid) {
        self.cache.remove(&self.config.posts_cache_key).await;
        self.cache.remove(&self.post_key(id)).await;
    }
}

// == Helpers ==
fn set_data_source(response: &mut Response, source: DataSource) {
    response.headers_mut().insert(
        DATA_SOURCE_HEADER,
        HeaderValue::from_static(source.as_str()),
    );
}

/// Issues a request token for the caller's session and writes it to the
/// configured header, setting the session cookie when a session was created.
fn issue_antiforgery(
    state: &AppState,
    request_headers: &HeaderMap,
    response: &mut Response,
) -> Result<String> {
    let guard = &state.antiforgery;
    let session = guard.session_id(request_headers);
    let pair = guard
        .issue_token(session.as_deref())
        .map_err(anyhow::Error::from)?;

    let name = HeaderName::from_bytes(guard.header_name().as_bytes()).map_err(anyhow::Error::from)?;
    let value = HeaderValue::from_str(&pair.request_token).map_err(anyhow::Error::from)?;
    response.headers_mut().insert(name, value);

    if pair.new_session {
        let cookie = HeaderValue::from_str(&guard.session_cookie(&pair.session_id))
            .map_err(anyhow::Error::from)?;
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    Ok(pair.request_token)
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound)
}

// == Posts ==
/// Handler for GET /posts
///
/// 200 with every post, or 204 when the store is empty. Always issues an
/// anti-forgery token.
pub async fn list_posts(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let store = state.store.clone();
    let (posts, source) = state
        .cache
        .get_or_create(&state.config.posts_cache_key, || async move {
            store.list().await
        })
        .await;

    let mut response = if posts.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        Json(posts).into_response()
    };
    set_data_source(&mut response, source);
    issue_antiforgery(&state, &headers, &mut response)?;
    Ok(response)
}

/// Handler for GET /posts/:id
pub async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response> {
    let id = parse_id(&id)?;
    let store = state.store.clone();
    let (post, source) = state
        .cache
        .get_or_create(&state.post_key(id), || async move { store.get(id).await })
        .await;

    let post: Post = post.ok_or(ApiError::NotFound)?;
    let mut response = Json(post).into_response();
    set_data_source(&mut response, source);
    Ok(response)
}

/// Handler for POST /posts
///
/// 201 with the new id as body and its URL in `Location`.
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Validated(request): Validated<CreatePostRequest>,
) -> Result<Response> {
    let post = Post::new(&request.title, &request.content);
    let id = post.id;
    state.store.insert(post).await.map_err(anyhow::Error::from)?;
    state.invalidate(id).await;
    info!(post_id = %id, "Post created");

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let location = format!("{scheme}://{host}/posts/{id}");

    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(id)).into_response())
}

/// Handler for PUT /posts
pub async fn update_post(
    State(state): State<AppState>,
    Validated(request): Validated<UpdatePostRequest>,
) -> Result<StatusCode> {
    if !state
        .store
        .update(request.id, &request.title, &request.content)
        .await
    {
        return Err(ApiError::NotFound);
    }
    state.invalidate(request.id).await;
    info!(post_id = %request.id, "Post updated");
    Ok(StatusCode::OK)
}

/// Handler for DELETE /posts/:id
pub async fn delete_post(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode> {
    let id = parse_id(&id)?;
    if !state.store.remove(id).await {
        return Err(ApiError::NotFound);
    }
    state.invalidate(id).await;
    info!(post_id = %id, "Post deleted");
    Ok(StatusCode::OK)
}

// == Misc ==
/// Handler for GET /aft
pub async fn get_antiforgery_token(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response> {
    let mut response = StatusCode::OK.into_response();
    let token = issue_antiforgery(&state, &headers, &mut response)?;
    let (parts, _) = response.into_parts();
    Ok((parts, Json(AfToken { token })).into_response())
}

/// Handler for GET /exception
///
/// Echoes `name`; a missing or empty name is an unhandled fault.
pub async fn exception(Query(query): Query<ExceptionQuery>) -> Result<Json<String>> {
    match query.name.filter(|n| !n.is_empty()) {
        Some(name) => Ok(Json(name)),
        None => Err(ApiError::Unhandled(anyhow!(
            "Value cannot be null. (Parameter 'Name')"
        ))),
    }
}
