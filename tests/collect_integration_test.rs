mod common;

use common::{client_for, next_link, read_jsonl};
use httpmock::prelude::*;
use repo_miner::core::collect::ObjectCollector;
use repo_miner::{BatchRunner, LocalStorage, RepoRef, TokenPool};
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn test_collector_appends_every_page() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    let second_page = server.url("/repositories/7/pulls");

    let first = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/octo/hello/pulls")
            .query_param("per_page", "2")
            .query_param("state", "all");
        then.status(200)
            .header("Link", next_link(&second_page))
            .json_body(json!([{"number": 1}, {"number": 2}]));
    });
    let second = server.mock(|when, then| {
        when.method(GET).path("/repositories/7/pulls");
        then.status(200).json_body(json!([{"number": 3}]));
    });

    let dir = TempDir::new()?;
    let collector = ObjectCollector::new(
        client_for(&server, 1),
        LocalStorage::new(dir.path()),
        "pulls",
        2,
    );
    let tokens = TokenPool::new(vec!["t0".to_string()])?;
    let summary = BatchRunner::new(4)
        .run(&collector, &[RepoRef::new("octo", "hello")], &tokens)
        .await;

    first.assert();
    second.assert();
    assert!(summary.is_success());
    assert_eq!(summary.processed, 1);

    let stored = read_jsonl(&dir.path().join("octo__hello.jsonl"));
    let numbers: Vec<i64> = stored.iter().map(|p| p["number"].as_i64().unwrap()).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test]
async fn test_failed_repository_does_not_stop_the_batch() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/gone/issues/comments");
        then.status(404).json_body(json!({"message": "Not Found"}));
    });
    let found = server.mock(|when, then| {
        when.method(GET)
            .path("/repos/octo/hello/issues/comments")
            .header("Authorization", "token second");
        then.status(200).json_body(json!([{"id": 10, "body": "see #1"}]));
    });

    let dir = TempDir::new()?;
    let collector = ObjectCollector::new(
        client_for(&server, 3),
        LocalStorage::new(dir.path()),
        "/issues/comments/",
        100,
    );
    let tokens = TokenPool::new(vec!["first".to_string(), "second".to_string()])?;
    let repos = vec![RepoRef::new("octo", "gone"), RepoRef::new("octo", "hello")];
    let summary = BatchRunner::new(2).run(&collector, &repos, &tokens).await;

    found.assert();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, RepoRef::new("octo", "gone"));
    assert!(summary.failed[0].1.contains("Not Found"));

    assert!(!dir.path().join("octo__gone.jsonl").exists());
    assert_eq!(read_jsonl(&dir.path().join("octo__hello.jsonl")).len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_listing_writes_no_file() -> anyhow::Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/repos/octo/quiet/issues");
        then.status(200).json_body(json!([]));
    });

    let dir = TempDir::new()?;
    let collector = ObjectCollector::new(
        client_for(&server, 1),
        LocalStorage::new(dir.path()),
        "issues",
        100,
    );
    let tokens = TokenPool::new(vec!["t".to_string()])?;
    let summary = BatchRunner::new(1)
        .run(&collector, &[RepoRef::new("octo", "quiet")], &tokens)
        .await;

    assert!(summary.is_success());
    assert!(!dir.path().join("octo__quiet.jsonl").exists());
    Ok(())
}
