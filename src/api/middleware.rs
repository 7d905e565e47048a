//! Pipeline stages.
//!
//! Outermost to innermost: exception boundary, panic capture, static assets,
//! CORS, HTTPS redirect, rate limiting (policies picked by route group) and
//! anti-forgery validation, all ahead of route dispatch. Each stage either
//! passes the request on or answers it.

use std::any::Any;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower::ServiceExt;
use tower_http::cors::{AllowOrigin, Any as AnyCors, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{error, warn};

use super::handlers::{AppState, DATA_SOURCE_HEADER};
use crate::antiforgery::Antiforgery;
use crate::config::Config;
use crate::error::{ApiError, Fault, Problem, PROBLEM_CONTENT_TYPE};
use crate::rate_limit::RateLimitRoutes;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// == Exception Boundary ==
/// Finalizes every error response as a problem document carrying the request
/// context, and logs unhandled faults. This is the only place faults are
/// logged.
pub async fn exception_boundary(request: Request, next: Next) -> Response {
    let instance = format!("{} {}", request.method(), request.uri().path());
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let response = next.run(request).await;

    if let Some(Fault(detail)) = response.extensions().get::<Fault>() {
        error!(
            request_id = request_id.as_deref().unwrap_or("-"),
            instance = %instance,
            error = %detail,
            "Unhandled exception"
        );
    }

    let problem = match response.extensions().get::<Problem>() {
        Some(problem) => problem.clone(),
        None if is_bare_error(&response) => Problem::from_status(response.status()),
        None => return response,
    };

    let problem = Problem {
        instance: Some(instance),
        request_id,
        ..problem
    };
    let body = match serde_json::to_vec(&problem) {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "Problem document could not be serialized");
            return response;
        }
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
    );
    parts.extensions.insert(problem);
    Response::from_parts(parts, Body::from(body))
}

/// Error statuses produced without a body, e.g. unmatched routes.
fn is_bare_error(response: &Response) -> bool {
    let status = response.status();
    (status.is_client_error() || status.is_server_error())
        && !response.headers().contains_key(header::CONTENT_TYPE)
}

/// Converts a handler panic into a 500 fault response.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Unhandled(anyhow!("handler panicked: {detail}")).into_response()
}

// == Static Assets ==
/// Serves GET/HEAD requests under the static prefix from the static
/// directory. Files that do not exist fall through to the routes.
pub async fn static_assets(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let config = &state.config;
    let is_read = matches!(*request.method(), Method::GET | Method::HEAD);
    if !is_read || !request.uri().path().starts_with(config.static_prefix.as_str()) {
        return next.run(request).await;
    }

    let mut lookup = Request::new(Body::empty());
    *lookup.method_mut() = request.method().clone();
    *lookup.uri_mut() = request.uri().clone();
    *lookup.headers_mut() = request.headers().clone();

    let response = match ServeDir::new(&config.static_dir).oneshot(lookup).await {
        Ok(response) => response,
        Err(never) => match never {},
    };
    if response.status() == StatusCode::NOT_FOUND {
        return next.run(request).await;
    }
    response.map(Body::new)
}

// == CORS ==
/// Allows the configured public origins with any method and header.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = [&config.http_url, &config.https_url]
        .into_iter()
        .filter_map(|url| match HeaderValue::from_str(url.trim_end_matches('/')) {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!(url = %url, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let exposed: Vec<HeaderName> = [
        config.antiforgery_header.as_str(),
        DATA_SOURCE_HEADER,
        REQUEST_ID_HEADER,
    ]
    .into_iter()
    .filter_map(|name| HeaderName::from_bytes(name.as_bytes()).ok())
    .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AnyCors)
        .allow_headers(AnyCors)
        .expose_headers(exposed)
}

// == HTTPS Redirect ==
/// Outside development, redirects plain HTTP requests to the HTTPS URL.
pub async fn https_redirect(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if state.config.is_development() || is_https(&request) {
        return next.run(request).await;
    }

    let path = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let target = format!("{}{}", state.config.https_url.trim_end_matches('/'), path);
    Redirect::temporary(&target).into_response()
}

fn is_https(request: &Request) -> bool {
    request.uri().scheme_str() == Some("https")
        || request
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|proto| proto.eq_ignore_ascii_case("https"))
}

// == Rate Limiting ==
/// Admits the request under every policy of its route group. Leases are held
/// until the inner service finishes or the request is dropped. Paths outside
/// every group are not limited.
pub async fn rate_limit(
    State(routes): State<RateLimitRoutes>,
    request: Request,
    next: Next,
) -> Response {
    let Some(group) = routes.group_for(request.uri().path()) else {
        return next.run(request).await;
    };
    let _leases = match group.try_acquire() {
        Ok(leases) => leases,
        Err(policy) => {
            warn!(
                policy,
                method = %request.method(),
                path = request.uri().path(),
                "Rate limit exceeded"
            );
            return ApiError::RateLimited {
                policy: policy.to_string(),
            }
            .into_response();
        }
    };
    next.run(request).await
}

// == Anti-Forgery ==
/// Verifies the anti-forgery token on state-changing requests.
pub async fn antiforgery(
    State(guard): State<Arc<Antiforgery>>,
    request: Request,
    next: Next,
) -> Response {
    if Antiforgery::requires_validation(request.method()) {
        if let Err(reason) = guard.verify(request.headers()) {
            let token_received = guard
                .request_token(request.headers())
                .unwrap_or_default()
                .to_string();
            warn!(
                %reason,
                method = %request.method(),
                path = request.uri().path(),
                "Anti-forgery validation failed"
            );
            return ApiError::AntiForgery { token_received }.into_response();
        }
    }
    next.run(request).await
}
