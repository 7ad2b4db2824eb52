//! Tests for the HTTP router / HTTP路由器测试

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceExt;

#[derive(Debug, Deserialize)]
struct Echo {
    msg: String,
}

fn test_router() -> Router {
    let mut router = Router::new();
    router
        .get(
            "/hello",
            |ctx: Context| async move { ctx.text(StatusCode::OK, "hello") },
            vec![],
        )
        .post(
            "/echo",
            |ctx: Context| async move {
                let echo: Echo = ctx.json_body()?;
                ctx.serve_json(StatusCode::OK, &json!({ "msg": echo.msg }))
            },
            vec![],
        )
        .get(
            "/users/:id",
            |ctx: Context| async move {
                let id = ctx.path_param("id").unwrap_or_default().to_string();
                ctx.serve_json(StatusCode::OK, &json!({ "id": id }))
            },
            vec![],
        )
        .get(
            "/guarded",
            |ctx: Context| async move { ctx.text(StatusCode::OK, "inside") },
            vec![filter(|ctx: &Context| ctx.header("x-key") == "open")],
        );
    router
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_get_route() {
    // Test plain GET route / 测试GET路由
    let app = test_router().into_axum();
    let resp = app
        .oneshot(Request::builder().uri("/hello").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await, "hello");
}

#[tokio::test]
async fn test_post_json_route() {
    // Test JSON body round trip / 测试JSON请求体处理
    let app = test_router().into_axum();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"msg":"hi"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/json; charset=UTF-8"
    );
    assert_eq!(body_json(resp).await["msg"], "hi");
}

#[tokio::test]
async fn test_handler_error_uses_default_handler() {
    // Test default error handler / 测试默认错误处理器
    let app = test_router().into_axum();
    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .header("content-type", "text/plain")
                .body(Body::from("hi"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "request body is not JSON");
}

#[tokio::test]
async fn test_custom_error_handler() {
    // Test custom error handler / 测试自定义错误处理器
    let mut router = test_router();
    router.set_error_handler(|err: &ServerError| {
        (StatusCode::IM_A_TEAPOT, format!("custom: {}", err)).into_response()
    });
    let resp = router
        .into_axum()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_text(resp).await, "custom: request body is empty");
}

#[tokio::test]
async fn test_path_params() {
    // Test :name path params / 测试路径参数
    let app = test_router().into_axum();
    let resp = app
        .oneshot(Request::builder().uri("/users/42").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["id"], "42");
}

#[tokio::test]
async fn test_filters() {
    // Test route filters / 测试路由过滤器
    let app = test_router().into_axum();

    let rejected = app
        .clone()
        .oneshot(Request::builder().uri("/guarded").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::FORBIDDEN);

    let passed = app
        .oneshot(
            Request::builder()
                .uri("/guarded")
                .header("x-key", "open")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(passed.status(), StatusCode::OK);
    assert_eq!(body_text(passed).await, "inside");
}

#[tokio::test]
async fn test_not_found_and_method_not_allowed() {
    // Test 404 and 405 / 测试404和405
    let app = test_router().into_axum();

    let missing = app
        .clone()
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(missing).await, "404 page not found");

    let wrong = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/hello")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_text(wrong).await, "405 method not allowed");
}
