//! Integration tests for the GitHub client with a mocked API.

use conductor::error::GitHubError;
use conductor::github::{CheckConclusion, CheckStatus, GitHubPlatform, HostingPlatform, RepoSlug};
use octocrab::Octocrab;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a client for `LemonAppDev/konsist` pointing to a mock server.
async fn platform(server: &MockServer) -> GitHubPlatform {
    let client = Octocrab::builder()
        .base_uri(server.uri())
        .expect("Failed to set base URI")
        .build()
        .expect("Failed to build octocrab");
    GitHubPlatform::with_client(client, RepoSlug::new("LemonAppDev", "konsist"))
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "message": "Not Found",
        "documentation_url": "https://docs.github.com/rest"
    }))
}

async fn mount_open_pulls(server: &MockServer, branch: &str, pulls: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/pulls"))
        .and(query_param("state", "open"))
        .and(query_param("head", format!("LemonAppDev:{}", branch)))
        .respond_with(ResponseTemplate::new(200).set_body_json(pulls))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_create_pull_request_reuses_open_one() {
    let server = MockServer::start().await;
    mount_open_pulls(&server, "release/v1.5.0", json!([{ "number": 7 }])).await;
    Mock::given(method("POST"))
        .and(path("/repos/LemonAppDev/konsist/pulls"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "number": 99 })))
        .expect(0)
        .mount(&server)
        .await;

    let number = platform(&server)
        .await
        .create_pull_request("Release/v1.5.0", "release/v1.5.0", "main")
        .await
        .unwrap();

    assert_eq!(number, 7);
}

#[tokio::test]
async fn test_create_pull_request_opens_new_one() {
    let server = MockServer::start().await;
    mount_open_pulls(&server, "release/v1.5.0", json!([])).await;
    Mock::given(method("POST"))
        .and(path("/repos/LemonAppDev/konsist/pulls"))
        .and(body_json(json!({
            "title": "Release/v1.5.0",
            "head": "release/v1.5.0",
            "base": "main",
            "body": ""
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "number": 8 })))
        .expect(1)
        .mount(&server)
        .await;

    let number = platform(&server)
        .await
        .create_pull_request("Release/v1.5.0", "release/v1.5.0", "main")
        .await
        .unwrap();

    assert_eq!(number, 8);
}

#[tokio::test]
async fn test_merge_uses_merge_commit() {
    let server = MockServer::start().await;
    mount_open_pulls(&server, "release/v1.5.0", json!([{ "number": 7 }])).await;
    Mock::given(method("PUT"))
        .and(path("/repos/LemonAppDev/konsist/pulls/7/merge"))
        .and(body_json(json!({ "merge_method": "merge" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "merged": true })))
        .expect(1)
        .mount(&server)
        .await;

    // Branch deletion is not mocked; its failure must not fail the merge
    platform(&server)
        .await
        .merge_pull_request("release/v1.5.0")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_merge_without_open_pull_request_fails() {
    let server = MockServer::start().await;
    mount_open_pulls(&server, "release/v1.5.0", json!([])).await;

    let err = platform(&server)
        .await
        .merge_pull_request("release/v1.5.0")
        .await
        .unwrap_err();

    assert!(matches!(err, GitHubError::PullRequestNotFound(b) if b == "release/v1.5.0"));
}

#[tokio::test]
async fn test_latest_commit_sha() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/commits/release/v1.5.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sha": "abc123" })))
        .mount(&server)
        .await;

    let sha = platform(&server)
        .await
        .latest_commit_sha("release/v1.5.0")
        .await
        .unwrap();

    assert_eq!(sha.as_deref(), Some("abc123"));
}

#[tokio::test]
async fn test_check_runs_are_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/commits/abc123/check-runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 2,
            "check_runs": [
                { "id": 1, "name": "build", "status": "completed", "conclusion": "success" },
                { "id": 2, "name": "lint", "status": "in_progress", "conclusion": null }
            ]
        })))
        .mount(&server)
        .await;

    let runs = platform(&server).await.check_runs("abc123").await.unwrap();

    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].name, "build");
    assert_eq!(runs[0].conclusion, CheckConclusion::Success);
    assert_eq!(runs[1].status, CheckStatus::InProgress);
    assert_eq!(runs[1].conclusion, CheckConclusion::Unknown);
}

#[tokio::test]
async fn test_check_runs_follow_pages() {
    let server = MockServer::start().await;
    let first_page: Vec<_> = (0..100)
        .map(|i| json!({ "id": i, "name": format!("test-{}", i), "status": "completed", "conclusion": "success" }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/commits/abc123/check-runs"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 101,
            "check_runs": first_page
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/commits/abc123/check-runs"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_count": 101,
            "check_runs": [
                { "id": 100, "name": "build", "status": "completed", "conclusion": "failure" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let runs = platform(&server).await.check_runs("abc123").await.unwrap();

    assert_eq!(runs.len(), 101);
    assert_eq!(runs[100].name, "build");
    assert_eq!(
        conductor::github::aggregate(&runs),
        conductor::github::AggregateCheckState::Failed
    );
}

#[tokio::test]
async fn test_pull_request_labels_follow_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/issues/101/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 1, "name": "bug-fix" },
            { "id": 2, "name": "kotlin" }
        ])))
        .mount(&server)
        .await;

    let labels = platform(&server)
        .await
        .pull_request_labels("https://github.com/LemonAppDev/konsist/pull/101")
        .await
        .unwrap();

    assert_eq!(labels, vec!["bug-fix", "kotlin"]);
}

#[tokio::test]
async fn test_create_release_reuses_existing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/releases/tags/v1.5.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 5, "body": "notes" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/LemonAppDev/konsist/releases"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 6 })))
        .expect(0)
        .mount(&server)
        .await;

    platform(&server)
        .await
        .create_release("v1.5.0", "v1.5.0")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_release_generates_notes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/releases/tags/v1.5.0"))
        .respond_with(not_found())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/repos/LemonAppDev/konsist/releases"))
        .and(body_json(json!({
            "tag_name": "v1.5.0",
            "name": "v1.5.0",
            "generate_release_notes": true
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 6 })))
        .expect(1)
        .mount(&server)
        .await;

    platform(&server)
        .await
        .create_release("v1.5.0", "v1.5.0")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_release_notes_missing_release() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/releases/tags/v9.9.9"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let err = platform(&server).await.release_notes("v9.9.9").await.unwrap_err();

    assert!(matches!(err, GitHubError::ReleaseNotFound(tag) if tag == "v9.9.9"));
}

#[tokio::test]
async fn test_update_release_notes_patches_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/releases/tags/v1.5.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 5, "body": "old" })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/LemonAppDev/konsist/releases/5"))
        .and(body_json(json!({ "body": "new body" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 5 })))
        .expect(1)
        .mount(&server)
        .await;

    platform(&server)
        .await
        .update_release_notes("v1.5.0", "new body")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_rate_limit_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repos/LemonAppDev/konsist/pulls"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "message": "API rate limit exceeded for 127.0.0.1.",
            "documentation_url": "https://docs.github.com/rest/overview/resources-in-the-rest-api#rate-limiting"
        })))
        .mount(&server)
        .await;

    let err = platform(&server)
        .await
        .create_pull_request("Release/v1.5.0", "release/v1.5.0", "main")
        .await
        .unwrap_err();

    assert!(matches!(err, GitHubError::RateLimited { .. }));
}
