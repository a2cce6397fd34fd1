use super::*;

use crate::{ServerConfig, SqliteStore};
use axum::body::Body;
use lootcase_execution::mocks::Memory;
use lootcase_types::Catalog;
use serde_json::{json, Value};
use tower::ServiceExt;

const ORIGIN: &str = "https://lootcase.test";

fn test_config() -> ServerConfig {
    ServerConfig {
        allowed_origins: vec![ORIGIN.to_string()],
        http_rate_limit_per_second: None,
        http_rate_limit_burst: None,
        action_rate_limit_per_minute: None,
        action_rate_limit_burst: None,
        ..ServerConfig::default()
    }
}

fn server_with<B: Backend + 'static>(config: ServerConfig, backend: B) -> (Arc<Server<B>>, Router) {
    let server = Arc::new(Server::new(config, backend, Catalog::default()));
    let router = Api::new(server.clone()).router();
    (server, router)
}

fn memory() -> Memory {
    Memory::new().with_user("alice", "token", "csrf", 100.0)
}

fn post_action(body: Value) -> Request<Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri("/api/cases")
        .header(header::ORIGIN, ORIGIN)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    axum::http::Request::builder()
        .uri(uri)
        .header(header::ORIGIN, ORIGIN)
        .body(Body::empty())
        .unwrap()
}

fn open_body(auth_token: &str, csrf_token: &str) -> Value {
    json!({
        "action": "openCases",
        "userId": "alice",
        "authToken": auth_token,
        "csrfToken": csrf_token,
        "caseId": "starter_box",
        "quantity": 1,
    })
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_healthz() {
    let (_, router) = server_with(test_config(), memory());
    let response = router.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(json_body(response).await, json!({ "ok": true }));
}

#[tokio::test]
async fn test_origin_enforced() {
    let (server, router) = server_with(test_config(), memory());

    let missing = axum::http::Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(missing).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let foreign = axum::http::Request::builder()
        .uri("/healthz")
        .header(header::ORIGIN, "https://evil.test")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(foreign).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(server.http_metrics().snapshot().reject_origin, 2);
}

#[tokio::test]
async fn test_no_origin_allowed_when_configured() {
    let config = ServerConfig {
        allow_no_origin: true,
        ..test_config()
    };
    let (_, router) = server_with(config, memory());
    let request = axum::http::Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_open_cases_over_http() {
    let (server, router) = server_with(test_config(), memory());
    let response = router
        .oneshot(post_action(open_body("token", "csrf")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["totalCost"], json!(5.0));
    assert_eq!(body["newBalance"], json!(95.0));
    assert_eq!(body["slots"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["seed"].as_str().map(str::len), Some(64));

    let snapshot = server.metrics_snapshot();
    assert_eq!(snapshot.http.open_cases.count, 1);
    assert_eq!(snapshot.outcomes.openings, 1);
}

#[tokio::test]
async fn test_action_errors_map_to_status() {
    let (server, router) = server_with(test_config(), memory());

    let response = router
        .clone()
        .oneshot(post_action(open_body("forged", "csrf")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["error"], json!("Invalid session"));

    let response = router
        .oneshot(post_action(open_body("token", "wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], json!("Invalid CSRF token"));

    // Layer rejections are not origin rejections.
    assert_eq!(server.http_metrics().snapshot().reject_origin, 0);
}

#[tokio::test]
async fn test_malformed_and_unknown_actions() {
    let (server, router) = server_with(test_config(), memory());

    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/cases")
        .header(header::ORIGIN, ORIGIN)
        .body(Body::from("{not json"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await, json!({ "error": "Invalid request" }));

    let response = router
        .oneshot(post_action(json!({ "action": "sellEverything" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(server.http_metrics().snapshot().reject_malformed, 2);
}

#[tokio::test]
async fn test_preview_needs_no_session() {
    let (_, router) = server_with(test_config(), Memory::new());
    let response = router
        .oneshot(post_action(json!({
            "action": "generatePreview",
            "caseId": "neon_box",
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["caseId"], json!("neon_box"));
    assert!(body["dropRates"].as_array().is_some_and(|rates| !rates.is_empty()));
}

#[tokio::test]
async fn test_body_limit() {
    let config = ServerConfig {
        http_body_limit_bytes: Some(64),
        ..test_config()
    };
    let (server, router) = server_with(config, memory());
    let padding = "x".repeat(256);
    let response = router
        .oneshot(post_action(json!({
            "action": "generatePreview",
            "caseId": padding,
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(server.http_metrics().snapshot().reject_body_limit, 1);
}

#[tokio::test]
async fn test_action_rate_limit() {
    let config = ServerConfig {
        action_rate_limit_per_minute: Some(1),
        action_rate_limit_burst: Some(1),
        ..test_config()
    };
    let (server, router) = server_with(config, memory());
    let preview = json!({ "action": "generatePreview", "caseId": "starter_box" });

    let response = router.clone().oneshot(post_action(preview.clone())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = router.clone().oneshot(post_action(preview)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(server.http_metrics().snapshot().reject_rate_limit, 1);

    // Read-only routes use the general limiter.
    let response = router.oneshot(get("/cases")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_cases_listing() {
    let (_, router) = server_with(test_config(), memory());
    let response = router.oneshot(get("/cases")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    let cases = body.as_array().unwrap();
    assert_eq!(cases.len(), Catalog::default().len());
    assert_eq!(cases[0]["id"], json!("starter_box"));
    assert_eq!(cases[0]["dropRates"][0]["color"], json!("#b0b3b8"));
    let total: f64 = cases[0]["dropRates"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|rate| rate["chance"].as_f64())
        .sum();
    assert!((total - 100.0).abs() < 0.1, "chances sum to {total}");
}

#[tokio::test]
async fn test_metrics_token() {
    let config = ServerConfig {
        metrics_auth_token: Some("secret".to_string()),
        ..test_config()
    };
    let (_, router) = server_with(config, memory());

    let response = router.clone().oneshot(get("/metrics/http")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = axum::http::Request::builder()
        .uri("/metrics/http")
        .header(header::ORIGIN, ORIGIN)
        .header(header::AUTHORIZATION, "Bearer secret")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["outcomes"]["openings"], json!(0));

    let request = axum::http::Request::builder()
        .uri("/metrics/http")
        .header(header::ORIGIN, ORIGIN)
        .header("x-metrics-token", "secret")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_open_cases_against_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(&dir.path().join("lootcase.db"), 500).unwrap();
    store.upsert_user("alice", 20.0).await.unwrap();
    let tokens = store
        .create_session("alice", Duration::from_secs(600))
        .await
        .unwrap();

    let (server, router) = server_with(test_config(), store);
    let response = router
        .oneshot(post_action(open_body(&tokens.auth_token, &tokens.csrf_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["newBalance"], json!(15.0));

    let profile = server
        .layer()
        .backend()
        .load_profile("alice")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(profile.balance, 15.0);
    assert_eq!(profile.inventory_count, 1);
    assert_eq!(server.layer().backend().drop_history_count().await.unwrap(), 1);
}
