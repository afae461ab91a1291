use axum::{http::StatusCode, routing::get, Router};
use serde_json::json;
use std::collections::HashMap;

use datasync_service::models::SyncEngineError;
use datasync_service::readers::{HttpReader, HttpSettings};

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{}", addr)
}

fn settings(url: String) -> HttpSettings {
    HttpSettings {
        url,
        headers: HashMap::new(),
        bearer_token: None,
        timeout_seconds: None,
    }
}

#[tokio::test]
async fn envelope_and_bare_array_payloads_normalize_to_records() {
    let app = Router::new()
        .route("/data", get(|| async { axum::Json(json!({"data": [{"id":"a"},{"id":"b"}]})) }))
        .route("/items", get(|| async { axum::Json(json!({"items": [{"id":"c"}]})) }))
        .route("/results", get(|| async { axum::Json(json!({"results": [{"id":"d"}]})) }))
        .route("/records", get(|| async { axum::Json(json!({"records": [{"id":"e"},{"id":"f"}]})) }))
        .route("/array", get(|| async { axum::Json(json!([{"id":"g"},{"id":"h"},{"id":"i"}])) }));
    let base = serve(app).await;

    let reader = HttpReader::new();
    for (path, expected) in [("/data", 2), ("/items", 1), ("/results", 1), ("/records", 2), ("/array", 3)] {
        let records = reader
            .fetch_records(&settings(format!("{}{}", base, path)))
            .await
            .unwrap();
        assert_eq!(records.len(), expected, "{} should yield {} records", path, expected);
    }
}

#[tokio::test]
async fn unrecognized_payload_shape_is_a_read_error() {
    let app = Router::new().route("/object", get(|| async { axum::Json(json!({"id": "lonely"})) }));
    let base = serve(app).await;

    let err = HttpReader::new()
        .fetch_records(&settings(format!("{}/object", base)))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SyncEngineError::Read(_)));
    assert!(err.to_string().contains("not an array payload"));
}

#[tokio::test]
async fn non_2xx_status_is_a_read_error() {
    let app = Router::new().route("/bad", get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }));
    let base = serve(app).await;

    let err = HttpReader::new()
        .fetch_records(&settings(format!("{}/bad", base)))
        .await
        .err()
        .unwrap();
    let msg = err.to_string();
    assert!(msg.contains("502"), "error should carry the status: {}", msg);
}

#[tokio::test]
async fn bearer_token_and_custom_headers_are_sent() {
    let app = Router::new().route(
        "/secure",
        get(|headers: axum::http::HeaderMap| async move {
            let authed = headers
                .get(axum::http::header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                == Some("Bearer sesame");
            let tenant_ok = headers.get("X-Tenant").and_then(|v| v.to_str().ok()) == Some("acme");
            if authed && tenant_ok {
                (StatusCode::OK, axum::Json(json!([{"ok": true}])))
            } else {
                (StatusCode::UNAUTHORIZED, axum::Json(json!({"error": "unauth"})))
            }
        }),
    );
    let base = serve(app).await;

    let mut headers = HashMap::new();
    headers.insert("X-Tenant".to_string(), "acme".to_string());
    let records = HttpReader::new()
        .fetch_records(&HttpSettings {
            url: format!("{}/secure", base),
            headers,
            bearer_token: Some("sesame".to_string()),
            timeout_seconds: None,
        })
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
}
