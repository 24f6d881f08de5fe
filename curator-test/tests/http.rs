use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use curator_http::router;
use curator_test::TestWorkspace;

async fn call(repo: &TestWorkspace, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Value) {
    let response = router(repo.service()).oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, serde_json::from_slice(&bytes).unwrap())
}

fn post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn review_party_out_of_range_is_rejected_without_writing() {
    let repo = TestWorkspace::acme();
    let path = "projects/acme/batches/b1/metadata.json";
    let before = repo.read(path);

    let (status, _, body) = call(
        &repo,
        post(
            "/update-review-status",
            &json!({"projectId": "acme", "batchId": "b1", "partyNumber": 5}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["errorDetails"]["errorCode"], "ERR_VALIDATION");
    assert_eq!(repo.read(path), before);
    assert!(repo.dirty_paths().is_empty());
}

#[tokio::test]
async fn graph_data_uses_no_cache_headers_on_hit_and_miss() {
    let repo = TestWorkspace::acme();

    let (status, headers, _) = call(&repo, get("/graph-data?projectId=acme&batchId=b1")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(headers["pragma"], "no-cache");

    let (status, headers, body) = call(&repo, get("/graph-data?projectId=acme&batchId=b2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["expires"], "0");
    assert_eq!(body["kgCandidateData"]["edges"][0]["id"], "edge2");
}

#[tokio::test]
async fn publish_then_history_then_rollback() {
    let repo = TestWorkspace::acme();
    let initial = repo.head();

    let (status, _, body) = call(
        &repo,
        post(
            "/publish",
            &json!({
                "projectId": "acme",
                "batchId": "b1",
                "candidateGraph": {"nodes": [{"id": "n1"}], "edges": []},
                "comment": "ok"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["commitId"], repo.head());

    let (_, _, body) = call(&repo, get("/commits")).await;
    let commits = body["commits"].as_array().unwrap();
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[1]["id"], initial);

    let (status, _, body) = call(&repo, post("/rollback", &json!({"commitId": initial}))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["reloadRequired"], true);

    let (status, _, _) = call(&repo, get("/merged-graph?projectId=acme")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = call(&repo, post("/reset-latest", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, body) = call(&repo, get("/merged-graph?projectId=acme")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nodes"][0]["id"], "n1");
}

#[tokio::test]
async fn unknown_commit_is_a_version_control_failure() {
    let repo = TestWorkspace::acme();
    let (status, _, body) = call(&repo, post("/rollback", &json!({"commitId": "feedface"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["errorDetails"]["errorCode"], "ERR_VERSION_CONTROL");
    assert_eq!(body["errorDetails"]["retryable"], false);
}
