// ==========================================
// HTTP 接口集成测试
// ==========================================
// 测试目标: 路由、JSON 请求/响应、错误码映射
// 驱动方式: tower::ServiceExt::oneshot，不占用端口
// ==========================================

mod test_helpers;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ferment_risk_board::app::router;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::NamedTempFile;
use test_helpers::{create_test_state, t0};
use tower::ServiceExt;

fn test_app() -> (NamedTempFile, Router) {
    let (temp, state) = create_test_state();
    (temp, router(Arc::new(state)))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (_temp, app) = test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["active_batches"], 0);

    send(&app, "POST", "/api/batches", Some(json!({ "tank_code": "01" }))).await;
    let (_, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(body["active_batches"], 1);
}

#[tokio::test]
async fn test_create_record_confirm_over_http() {
    let (_temp, app) = test_app();
    let started = t0().timestamp_millis();

    let (status, created) = send(
        &app,
        "POST",
        "/api/batches",
        Some(json!({ "tank_code": "01", "started_at": started })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["label"], "STG 01");
    assert_eq!(created["started_at"], started);
    assert_eq!(created["status"], "ACTIVE");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, updated) = send(
        &app,
        "POST",
        &format!("/api/batches/{}/ph", id),
        Some(json!({ "ph": 6.0, "sensory": "NORMAL", "observed_at": started })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["measurements"].as_array().unwrap().len(), 1);
    assert_eq!(updated["measurements"][0]["sensory_flag"], "NORMAL");

    let (status, board) = send(&app, "GET", "/api/board", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board["entries"][0]["batch_id"], id.as_str());
    assert_eq!(board["entries"][0]["rank"], 1);

    let (status, record) = send(&app, "POST", &format!("/api/batches/{}/confirm", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["batch_id"], id.as_str());
    assert!(record["final_score"].as_f64().unwrap() <= 1.0);

    let (status, err) = send(&app, "POST", &format!("/api/batches/{}/confirm", id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "INVALID_STATE_TRANSITION");

    let (_, state) = send(&app, "GET", "/api/state", None).await;
    assert_eq!(state["batches"].as_array().unwrap().len(), 0);
    assert_eq!(state["history"].as_array().unwrap().len(), 1);

    let (_, grouped) = send(&app, "GET", "/api/history/grouped", None).await;
    assert_eq!(grouped["STG 01"].as_array().unwrap().len(), 1);

    let (status, cleared) = send(&app, "DELETE", "/api/history", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["removed"], 1);
}

#[tokio::test]
async fn test_validation_errors_are_400() {
    let (_temp, app) = test_app();

    let (status, err) = send(&app, "POST", "/api/batches", Some(json!({ "tank_code": "  " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    // 缺少必填字段
    let (status, err) = send(&app, "POST", "/api/batches", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (_, created) = send(&app, "POST", "/api/batches", Some(json!({ "tank_code": "02" }))).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, err) = send(
        &app,
        "POST",
        &format!("/api/batches/{}/ph", id),
        Some(json!({ "ph": 6.1, "sensory": "SOUR" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/batches/{}/ph", id),
        Some(json!({ "ph": 15.0, "sensory": "NORMAL" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_batch_is_404_and_delete_works() {
    let (_temp, app) = test_app();

    let (status, err) = send(
        &app,
        "POST",
        "/api/batches/missing/ph",
        Some(json!({ "ph": 6.1, "sensory": "NORMAL" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(err["code"], "NOT_FOUND");

    let (_, created) = send(&app, "POST", "/api/batches", Some(json!({ "tank_code": "03" }))).await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "DELETE", &format!("/api/batches/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/batches/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, batches) = send(&app, "GET", "/api/batches", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(batches.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_batch_is_409() {
    let (_temp, app) = test_app();
    let body = json!({ "tank_code": "04", "started_at": t0().timestamp_millis() });

    let (status, _) = send(&app, "POST", "/api/batches", Some(body.clone())).await;
    assert_eq!(status, StatusCode::OK);
    let (status, err) = send(&app, "POST", "/api/batches", Some(body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(err["code"], "BUSINESS_RULE_VIOLATION");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_measurement_requests() {
    let (_temp, app) = test_app();
    let started = t0().timestamp_millis();

    let (_, created) = send(
        &app,
        "POST",
        "/api/batches",
        Some(json!({ "tank_code": "05", "started_at": started })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let tasks: Vec<_> = (0..16i64)
        .map(|i| {
            let app = app.clone();
            let uri = format!("/api/batches/{}/ph", id);
            tokio::spawn(async move {
                let body = json!({
                    "ph": 6.3 - 0.01 * i as f64,
                    "sensory": "NORMAL",
                    "observed_at": started + i * 60_000,
                });
                send(&app, "POST", &uri, Some(body)).await.0
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    let (status, batch) = send(&app, "GET", &format!("/api/batches/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(batch["measurements"].as_array().unwrap().len(), 16);
}
