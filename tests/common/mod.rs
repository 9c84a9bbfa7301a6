#![allow(dead_code)]

use httpmock::MockServer;
use repo_miner::{ClientSettings, GithubClient, RetryPolicy};
use std::path::Path;
use std::time::Duration;

/// Client pointed at the mock server with no waiting between attempts.
pub fn client_for(server: &MockServer, max_attempts: u32) -> GithubClient {
    GithubClient::new(ClientSettings {
        api_url: server.base_url(),
        user_agent: "repo-miner-tests".to_string(),
        timeout: Duration::from_secs(5),
        retry: RetryPolicy {
            max_attempts,
            retry_wait: Duration::ZERO,
            ban_wait: Duration::ZERO,
            time_divergence: Duration::ZERO,
        },
    })
    .unwrap()
}

pub fn next_link(url: &str) -> String {
    format!("<{}>; rel=\"next\", <{}>; rel=\"last\"", url, url)
}

pub fn read_jsonl(path: &Path) -> Vec<serde_json::Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}
