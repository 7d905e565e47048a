//! Integration Tests for API Endpoints
//!
//! Full request/response cycles through the real router and pipeline.

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, Response, StatusCode},
    Router,
};
use post_guard::{
    api::create_router,
    config::{Config, RateLimitConfig},
    store::PostStore,
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

// == Helper Functions ==

fn relaxed_config() -> Config {
    Config {
        rate_limit: RateLimitConfig {
            permit_limit: 1000,
            token_limit: 1000,
            window: Duration::from_secs(60),
            ..RateLimitConfig::default()
        },
        ..Config::default()
    }
}

fn create_app(config: Config, store: PostStore) -> Router {
    create_router(AppState::new(config, store).unwrap())
}

fn create_test_app() -> Router {
    create_app(relaxed_config(), PostStore::seeded())
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Session cookie pair and request token, as a browser would hold them.
struct Aft {
    cookie: String,
    token: String,
}

async fn fetch_aft(app: &Router) -> Aft {
    let response = send(app, get("/aft")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let header_token = response.headers()["X-AFT-Value"].to_str().unwrap().to_string();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["token"], header_token.as_str());

    Aft {
        cookie,
        token: header_token,
    }
}

fn json_request(method: &str, uri: &str, aft: Option<&Aft>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(aft) = aft {
        builder = builder
            .header(header::COOKIE, &aft.cookie)
            .header("X-AFT-Value", &aft.token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn delete_request(uri: &str, aft: &Aft) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::COOKIE, &aft.cookie)
        .header("X-AFT-Value", &aft.token)
        .body(Body::empty())
        .unwrap()
}

async fn post_count(app: &Router) -> usize {
    let response = send(app, get("/posts")).await;
    if response.status() == StatusCode::NO_CONTENT {
        return 0;
    }
    body_to_json(response.into_body())
        .await
        .as_array()
        .unwrap()
        .len()
}

fn data_source(response: &Response<Body>) -> String {
    response.headers()["x-data-source"]
        .to_str()
        .unwrap()
        .to_string()
}

const VALID_POST: &str = r#"{"title":"  A fresh title  ","content":"  Content that is long enough  "}"#;

// == Anti-Forgery ==

#[tokio::test]
async fn test_create_with_token_round_trip() {
    let app = create_test_app();
    let aft = fetch_aft(&app).await;

    let response = send(&app, json_request("POST", "/posts", Some(&aft), VALID_POST)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()[header::LOCATION].to_str().unwrap().to_string();

    let id = body_to_json(response.into_body()).await;
    let id: Uuid = id.as_str().unwrap().parse().unwrap();
    assert_eq!(id.get_version_num(), 7);
    assert!(location.ends_with(&format!("/posts/{id}")));

    let response = send(&app, get(&format!("/posts/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let post = body_to_json(response.into_body()).await;
    assert_eq!(post["title"], "A fresh title");
    assert_eq!(post["content"], "Content that is long enough");
}

#[tokio::test]
async fn test_create_without_token_rejected() {
    let app = create_test_app();

    let response = send(&app, json_request("POST", "/posts", None, VALID_POST)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["errors"]["message"], "Invalid anti-forgery token.");
    assert_eq!(json["errors"]["tokenReceived"], "");
    assert_eq!(json["instance"], "POST /posts");
    assert_eq!(post_count(&app).await, 10);
}

#[tokio::test]
async fn test_token_from_other_session_rejected() {
    let app = create_test_app();
    let first = fetch_aft(&app).await;
    let second = fetch_aft(&app).await;
    let mixed = Aft {
        cookie: first.cookie,
        token: second.token.clone(),
    };

    let response = send(&app, json_request("POST", "/posts", Some(&mixed), VALID_POST)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["errors"]["tokenReceived"], second.token.as_str());
}

async fn first_post(app: &Router) -> Value {
    let response = send(app, get("/posts")).await;
    body_to_json(response.into_body()).await[0].clone()
}

#[tokio::test]
async fn test_update_without_valid_token_leaves_store_unchanged() {
    let app = create_test_app();
    let post = first_post(&app).await;
    let id = post["id"].as_str().unwrap().to_string();
    let body = format!(r#"{{"id":"{id}","title":"Rewritten title","content":"Rewritten content body"}}"#);

    let response = send(&app, json_request("PUT", "/posts", None, &body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["errors"]["message"], "Invalid anti-forgery token.");

    let first = fetch_aft(&app).await;
    let second = fetch_aft(&app).await;
    let mixed = Aft {
        cookie: first.cookie,
        token: second.token,
    };
    let response = send(&app, json_request("PUT", "/posts", Some(&mixed), &body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(&app, get(&format!("/posts/{id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = body_to_json(response.into_body()).await;
    assert_eq!(stored["title"], post["title"]);
    assert_eq!(stored["content"], post["content"]);
}

#[tokio::test]
async fn test_delete_without_valid_token_keeps_post() {
    let app = create_test_app();
    let id = first_post(&app).await["id"].as_str().unwrap().to_string();
    let uri = format!("/posts/{id}");

    let response = send(
        &app,
        Request::builder()
            .method("DELETE")
            .uri(&uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let first = fetch_aft(&app).await;
    let second = fetch_aft(&app).await;
    let mixed = Aft {
        cookie: second.cookie,
        token: first.token,
    };
    let response = send(&app, delete_request(&uri, &mixed)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(send(&app, get(&uri)).await.status(), StatusCode::OK);
    assert_eq!(post_count(&app).await, 10);
}

#[tokio::test]
async fn test_token_issued_by_list_is_accepted() {
    let app = create_test_app();
    let response = send(&app, get("/posts")).await;
    let cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    let token = response.headers()["X-AFT-Value"].to_str().unwrap().to_string();
    let aft = Aft { cookie, token };

    let response = send(&app, json_request("POST", "/posts", Some(&aft), VALID_POST)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

// == Validation ==

#[tokio::test]
async fn test_invalid_create_returns_field_errors() {
    let app = create_test_app();
    let aft = fetch_aft(&app).await;

    let response = send(
        &app,
        json_request("POST", "/posts", Some(&aft), r#"{"title":"string","content":"short"}"#),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["title"], "Validation error(s)");
    assert!(json["errors"]["Title"]
        .as_array()
        .unwrap()
        .iter()
        .any(|m| m == "Title cannot be 'string'"));
    assert!(!json["errors"]["Content"].as_array().unwrap().is_empty());
    assert_eq!(post_count(&app).await, 10);
}

#[tokio::test]
async fn test_update_requires_version_seven_id() {
    let app = create_test_app();
    let aft = fetch_aft(&app).await;
    let body = format!(
        r#"{{"id":"{}","title":"Valid title","content":"Valid content body"}}"#,
        Uuid::new_v4()
    );

    let response = send(&app, json_request("PUT", "/posts", Some(&aft), &body)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["errors"]["Id"][0], "Id must be a valid Version 7 Guid");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = create_test_app();
    let aft = fetch_aft(&app).await;

    let response = send(&app, json_request("POST", "/posts", Some(&aft), "{oops")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// == Cache Invalidation ==

#[tokio::test]
async fn test_list_reflects_each_mutation() {
    let app = create_test_app();
    let aft = fetch_aft(&app).await;

    let response = send(&app, get("/posts")).await;
    assert_eq!(data_source(&response), "Database");
    let response = send(&app, get("/posts")).await;
    assert_eq!(data_source(&response), "Cache");

    // Create
    let response = send(&app, json_request("POST", "/posts", Some(&aft), VALID_POST)).await;
    let id = body_to_json(response.into_body()).await;
    let id = id.as_str().unwrap().to_string();

    let response = send(&app, get("/posts")).await;
    assert_eq!(data_source(&response), "Database");
    assert_eq!(body_to_json(response.into_body()).await.as_array().unwrap().len(), 11);

    // Update
    let body = format!(r#"{{"id":"{id}","title":"Renamed title","content":"Rewritten content body"}}"#);
    let response = send(&app, json_request("PUT", "/posts", Some(&aft), &body)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get(&format!("/posts/{id}"))).await;
    assert_eq!(data_source(&response), "Database");
    assert_eq!(body_to_json(response.into_body()).await["title"], "Renamed title");

    // Delete
    let response = send(&app, delete_request(&format!("/posts/{id}"), &aft)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get(&format!("/posts/{id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(post_count(&app).await, 10);
}

#[tokio::test]
async fn test_get_post_served_from_cache_second_time() {
    let app = create_test_app();
    let posts = body_to_json(send(&app, get("/posts")).await.into_body()).await;
    let id = posts[0]["id"].as_str().unwrap().to_string();

    let first = send(&app, get(&format!("/posts/{id}"))).await;
    assert_eq!(data_source(&first), "Database");
    let second = send(&app, get(&format!("/posts/{id}"))).await;
    assert_eq!(data_source(&second), "Cache");
}

// == Not Found / Empty ==

#[tokio::test]
async fn test_empty_store_lists_no_content() {
    let app = create_app(relaxed_config(), PostStore::new());

    let response = send(&app, get("/posts")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(response.headers().contains_key("X-AFT-Value"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_delete_missing_post() {
    let app = create_test_app();
    let aft = fetch_aft(&app).await;

    let response = send(&app, delete_request(&format!("/posts/{}", Uuid::now_v7()), &aft)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 404);
    assert_eq!(post_count(&app).await, 10);
}

#[tokio::test]
async fn test_get_post_malformed_id_not_found() {
    let app = create_test_app();
    let response = send(&app, get("/posts/not-a-guid")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// == Exception Boundary ==

#[tokio::test]
async fn test_exception_endpoint_returns_problem() {
    let app = create_test_app();

    let response = send(&app, get("/exception")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let request_id = response.headers()["x-request-id"].to_str().unwrap().to_string();

    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 500);
    assert_eq!(json["title"], "An unexpected error occurred!");
    assert_eq!(json["instance"], "GET /exception");
    assert_eq!(json["requestId"], request_id.as_str());
    assert!(!json.to_string().contains("Parameter"));
}

#[tokio::test]
async fn test_exception_endpoint_with_name() {
    let app = create_test_app();
    let response = send(&app, get("/exception?name=Ada")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_to_json(response.into_body()).await, "Ada");
}

// == Rate Limiting ==

#[tokio::test]
async fn test_fixed_window_rejects_third_request() {
    let config = Config {
        rate_limit: RateLimitConfig {
            posts_policies: vec!["FixedWindow".to_string()],
            ..RateLimitConfig::default()
        },
        ..Config::default()
    };
    let app = create_app(config, PostStore::seeded());

    assert_eq!(send(&app, get("/posts")).await.status(), StatusCode::OK);
    assert_eq!(send(&app, get("/posts")).await.status(), StatusCode::OK);

    let response = send(&app, get("/posts")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 429);
    assert_eq!(json["errors"]["policy"], "FixedWindow");

    // Routes outside the group are not limited
    assert_eq!(send(&app, get("/healthCheck")).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_concurrency_limit_releases_after_completion() {
    // Accepts connections and never answers, holding the probe open.
    let silent = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let silent_addr = silent.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = silent.accept().await {
            held.push(socket);
        }
    });

    let config = Config {
        health_base_url: format!("http://{silent_addr}"),
        health_timeout: Duration::from_millis(500),
        rate_limit: RateLimitConfig {
            permit_limit: 1,
            health_policies: vec!["Concurrency".to_string()],
            ..RateLimitConfig::default()
        },
        ..Config::default()
    };
    let app = create_app(config, PostStore::seeded());

    let in_flight = tokio::spawn(app.clone().oneshot(get("/health")));
    tokio::time::sleep(Duration::from_millis(100)).await;

    let rejected = send(&app, get("/health")).await;
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);

    let finished = in_flight.await.unwrap().unwrap();
    assert_eq!(finished.status(), StatusCode::NO_CONTENT);

    let next = send(&app, get("/health")).await;
    assert_eq!(next.status(), StatusCode::NO_CONTENT);
}

// == Health ==

#[tokio::test]
async fn test_health_proxies_health_check() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = Config {
        health_base_url: format!("http://{addr}"),
        ..relaxed_config()
    };
    let app = create_app(config, PostStore::seeded());

    let server = app.clone();
    tokio::spawn(async move { axum::serve(listener, server).await });

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["apiStatus"], "Healthy");
    assert_eq!(json["checks"][0]["name"], "Database");
    assert_eq!(json["checks"][0]["description"], "10 Record found!");
}

#[tokio::test]
async fn test_health_unreachable_is_no_content() {
    // Bind then drop to obtain a closed port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = Config {
        health_base_url: format!("http://{addr}"),
        ..relaxed_config()
    };
    let app = create_app(config, PostStore::seeded());

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_health_check_unhealthy_when_empty() {
    let app = create_app(relaxed_config(), PostStore::new());
    let response = send(&app, get("/healthCheck")).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["apiStatus"], "Unhealthy");
    assert_eq!(json["checks"][0]["description"], "The database is unhealthy.");
}

// == Static Assets ==

#[tokio::test]
async fn test_static_assets_served_and_fall_through() {
    let dir = std::env::temp_dir().join(format!("post_guard_static_{}", Uuid::new_v4()));
    std::fs::create_dir_all(dir.join("css")).unwrap();
    std::fs::write(dir.join("css").join("site.css"), "body { color: black; }").unwrap();

    let config = Config {
        static_dir: dir.to_string_lossy().into_owned(),
        ..relaxed_config()
    };
    let app = create_app(config, PostStore::seeded());

    let response = send(&app, get("/css/site.css")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"body { color: black; }");

    let response = send(&app, get("/css/missing.css")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    std::fs::remove_dir_all(dir).ok();
}
