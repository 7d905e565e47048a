//! API Routes
//!
//! Builds the route table and wraps it in the request pipeline.

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_post, delete_post, exception, get_antiforgery_token, get_post, list_posts, update_post,
    AppState,
};
use super::health::{health, health_check};
use crate::rate_limit::RateLimitRoutes;
use super::middleware::{
    antiforgery, cors_layer, exception_boundary, https_redirect, panic_response, rate_limit,
    static_assets, REQUEST_ID_HEADER,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /posts`, `POST /posts`, `PUT /posts` - list, create, update
/// - `GET /posts/:id`, `DELETE /posts/:id` - read, delete
/// - `GET /health` - HTTP probe of `/healthCheck`
/// - `GET /healthCheck` - in-process health checks
/// - `GET /aft` - anti-forgery token
/// - `GET /exception` - fault demonstration
///
/// `/posts` and `/health` are rate limited with their configured policies;
/// the rest are not. Anti-forgery validation applies to every state-changing
/// request, including ones no route matches.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();
    let request_id = axum::http::HeaderName::from_static(REQUEST_ID_HEADER);

    let limits = RateLimitRoutes::new()
        .route("/posts", state.limiters.group(&config.rate_limit.posts_policies))
        .route("/health", state.limiters.group(&config.rate_limit.health_policies));

    Router::new()
        .route("/posts", get(list_posts).post(create_post).put(update_post))
        .route("/posts/:id", get(get_post).delete(delete_post))
        .route("/health", get(health))
        .route("/healthCheck", get(health_check))
        .route("/aft", get(get_antiforgery_token))
        .route("/exception", get(exception))
        .layer(from_fn_with_state(state.antiforgery.clone(), antiforgery))
        .layer(from_fn_with_state(limits, rate_limit))
        .layer(from_fn_with_state(state.clone(), https_redirect))
        .layer(cors_layer(&config))
        .layer(from_fn_with_state(state.clone(), static_assets))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(from_fn(exception_boundary))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
        .with_state(state)
}
