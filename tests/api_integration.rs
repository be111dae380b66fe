//! HTTP surface tests: requests go through the real router with
//! `tower::ServiceExt::oneshot`, no socket involved.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use common::{test_config, TestRepo};
use git_desk::config::SessionConfig;
use git_desk::routes::create_router;
use git_desk::session::Workspace;

fn app() -> (Arc<Workspace>, Router) {
    let workspace = Arc::new(Workspace::new(test_config()));
    let router = create_router(workspace.clone());
    (workspace, router)
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    // Extractor rejections answer in plain text.
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()));
    (status, value)
}

#[tokio::test]
async fn requests_without_a_session_conflict() {
    let (_, router) = app();

    let (status, body) = send(&router, Method::GET, "/api/v1/status", None).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "no_session");
}

#[tokio::test]
async fn open_then_read_repository_info() {
    let repo = TestRepo::new();
    let (_, router) = app();

    let path = repo.path().to_string_lossy().to_string();
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/repository/open",
        Some(json!({ "path": path })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["head_branch"], "main");

    let (status, body) = send(&router, Method::GET, "/api/v1/repository", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["path"], repo.canonical_path().to_string_lossy().to_string());
}

#[tokio::test]
async fn opening_a_plain_directory_is_not_found() {
    let dir = tempfile::TempDir::new().unwrap();
    let (_, router) = app();

    let path = dir.path().to_string_lossy().to_string();
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/repository/open",
        Some(json!({ "path": path })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_a_repository");
}

#[tokio::test]
async fn status_filter_narrows_changed_files() {
    let repo = TestRepo::new();
    repo.write("src/main.rs", "fn main() {}\n");
    repo.write("docs/guide.md", "guide\n");
    let (workspace, router) = app();
    workspace.open(repo.path()).await.unwrap();

    let (status, body) = send(&router, Method::GET, "/api/v1/status?filter=MAIN", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed_files"]["state"], "present");
    let files = body["changed_files"]["value"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["path"], "src/main.rs");
    assert_eq!(files[0]["kind"], "untracked");
    assert_eq!(body["divergence"]["state"], "local_only");
}

#[tokio::test]
async fn manual_refresh_sees_new_files() {
    let repo = TestRepo::new();
    let (workspace, router) = app();
    workspace.open(repo.path()).await.unwrap();

    repo.write("later.txt", "later\n");
    let (status, body) = send(&router, Method::POST, "/api/v1/status/refresh", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed_files"]["value"][0]["path"], "later.txt");
}

#[tokio::test]
async fn commit_operation_returns_outcome() {
    let repo = TestRepo::new();
    repo.write("readme.txt", "hello\n");
    let (workspace, router) = app();
    workspace.open(repo.path()).await.unwrap();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/operations",
        Some(json!({ "op": "commit", "summary": "fix bug" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["operation"], "commit");
    assert_eq!(body["message"], "Committed: fix bug");
    assert_eq!(body["snapshot"]["history"]["value"][0]["summary"], "fix bug");
    assert_eq!(body["snapshot"]["changed_files"]["value"], json!([]));
}

#[tokio::test]
async fn operation_errors_map_to_status_codes() {
    let repo = TestRepo::new();
    let (workspace, router) = app();
    workspace.open(repo.path()).await.unwrap();

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/operations",
        Some(json!({ "op": "commit", "summary": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/operations",
        Some(json!({ "op": "delete_branch", "name": "main" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "invalid_operation");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/operations",
        Some(json!({ "op": "stash_pop" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["kind"], "external_tool");
    assert_eq!(body["operation"], "stash pop");
    assert!(body["stderr"].as_str().is_some());
}

#[tokio::test]
async fn unknown_operation_is_rejected() {
    let repo = TestRepo::new();
    let (workspace, router) = app();
    workspace.open(repo.path()).await.unwrap();

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/v1/operations",
        Some(json!({ "op": "rebase", "onto": "main" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn diff_blame_and_show_render_lines() {
    let repo = TestRepo::new();
    let head = repo.rev_parse("HEAD");
    repo.write("README.md", "# Changed\n");
    let (workspace, router) = app();
    workspace.open(repo.path()).await.unwrap();

    let (status, body) = send(&router, Method::GET, "/api/v1/diff?path=README.md", None).await;
    assert_eq!(status, StatusCode::OK);
    let classes: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|line| line["class"].as_str().unwrap())
        .collect();
    assert!(classes.contains(&"hunk_header"));
    assert!(classes.contains(&"addition"));
    assert!(classes.contains(&"deletion"));

    let (status, body) = send(&router, Method::GET, "/api/v1/blame?path=README.md", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let uri = format!("/api/v1/commits/{}", head);
    let (status, body) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["class"], "metadata");
}

#[tokio::test]
async fn escaping_paths_are_bad_requests() {
    let repo = TestRepo::new();
    let (workspace, router) = app();
    workspace.open(repo.path()).await.unwrap();

    let (status, body) = send(&router, Method::GET, "/api/v1/diff?path=../secret", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_path");
}

#[tokio::test]
async fn init_endpoint_opens_a_new_repository() {
    let parent = tempfile::TempDir::new().unwrap();
    let (_, router) = app();

    let path = parent.path().join("created").to_string_lossy().to_string();
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/repository/init",
        Some(json!({ "path": path })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "created");
}

#[tokio::test]
async fn clone_endpoint_opens_the_copy() {
    let source = TestRepo::new();
    let parent = tempfile::TempDir::new().unwrap();
    let (_, router) = app();

    let url = source.path().to_string_lossy().to_string();
    let path = parent.path().join("copy").to_string_lossy().to_string();
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/v1/repository/clone",
        Some(json!({ "url": url, "path": path })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "copy");
    assert_eq!(body["head_branch"], "main");

    let (status, body) = send(&router, Method::GET, "/api/v1/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["history"]["value"][0]["summary"], "Initial commit");
}

#[tokio::test]
async fn degraded_fields_are_tagged_in_the_status_body() {
    let repo = TestRepo::new();
    let workspace = Arc::new(Workspace::new(SessionConfig {
        git_program: "git-desk-no-such-tool".to_string(),
        ..test_config()
    }));
    let router = create_router(workspace.clone());
    workspace.open(repo.path()).await.unwrap();

    let (status, body) = send(&router, Method::GET, "/api/v1/status", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["stashes"]["state"], "degraded");
    assert!(body["stashes"]["reason"].as_str().is_some());
    assert_eq!(body["history"]["state"], "present");
}
