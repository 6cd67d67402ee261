//! Integration tests over the full axum router (spec.md §6).

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use gopiler_web::{router, AppState};
use tower::ServiceExt;

async fn post_compile(app: axum::Router, code: &str) -> axum::Router {
    let body = serde_json::to_vec(&serde_json::json!({ "code": code, "verbose": false })).unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/compile")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    app
}

#[tokio::test]
async fn get_cst_reflects_last_compile() {
    let app = router(Arc::new(AppState::new()));
    let app = post_compile(app, "{}$").await;

    let response = app
        .oneshot(Request::builder().uri("/getCST").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("Program 1"));
    assert!(text.contains("Block"));
}

#[tokio::test]
async fn get_assembly_indexes_by_requested_program_not_always_zero() {
    // Regression for DESIGN NOTES §9's "GetAssembly always returns program
    // 0" bug: program 1 is a no-op block, program 2 actually prints, so
    // their assembly must differ.
    let app = router(Arc::new(AppState::new()));
    let app = post_compile(app, "{}$ { int a a = 3 print(a) }$").await;

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/getAssembly/0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let second = app
        .oneshot(
            Request::builder()
                .uri("/getAssembly/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let first_text = String::from_utf8(
        axum::body::to_bytes(first.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec(),
    )
    .unwrap();
    let second_text = String::from_utf8(
        axum::body::to_bytes(second.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec(),
    )
    .unwrap();

    assert_ne!(first_text, second_text);
    assert!(second_text.contains("SYS"));
}

#[tokio::test]
async fn empty_code_body_warns_without_compiling() {
    let app = router(Arc::new(AppState::new()));
    let body = serde_json::to_vec(&serde_json::json!({ "code": "", "verbose": true })).unwrap();
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/compile")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(json["output"].as_str().unwrap().contains("No code provided"));
}
