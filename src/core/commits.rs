use crate::core::jsonl;
use crate::domain::model::RepoRef;
use crate::domain::ports::{RepoDataTask, Storage};
use crate::github::client::{paged_url, GithubClient};
use crate::utils::error::{MinerError, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Stores every commit of every stored pull request together with its full
/// diff payload (`files`, `stats`, ...) under `diff`.
pub struct CommitDiffEnricher<S: Storage> {
    client: GithubClient,
    storage: S,
    page_size: usize,
}

impl<S: Storage> CommitDiffEnricher<S> {
    pub fn new(client: GithubClient, storage: S, page_size: usize) -> Self {
        Self {
            client,
            storage,
            page_size,
        }
    }

    async fn attach_diffs(&self, commits: &mut [Value], token: &str) -> Result<()> {
        for commit in commits.iter_mut() {
            if commit.get("sha").and_then(Value::as_str).is_none() {
                continue;
            }
            let Some(diff_url) = commit.get("url").and_then(Value::as_str).map(str::to_string)
            else {
                continue;
            };

            let diff = self.client.get(token, &diff_url).await?.data;
            if let Some(object) = commit.as_object_mut() {
                object.insert("diff".to_string(), diff);
            }
        }
        Ok(())
    }

    async fn process_pull(&self, repo: &RepoRef, pull: &Value, token: &str) -> Result<usize> {
        let commits_url = pull
            .get("commits_url")
            .and_then(Value::as_str)
            .ok_or_else(|| MinerError::invalid_input("pull request without 'commits_url'"))?;

        let mut pages = self.client.pages(token, paged_url(commits_url, self.page_size));
        let mut total = 0;

        while let Some(page) = pages.next_page().await {
            let mut commits = match page? {
                Value::Array(commits) => commits,
                other => vec![other],
            };
            self.attach_diffs(&mut commits, token).await?;
            total += commits.len();
            jsonl::dump_items(&self.storage, repo, &commits).await?;
        }

        Ok(total)
    }
}

#[async_trait]
impl<S: Storage> RepoDataTask for CommitDiffEnricher<S> {
    async fn process_items(
        &self,
        repo: &RepoRef,
        items: Vec<Value>,
        token: Option<&str>,
    ) -> Result<()> {
        let token = token.ok_or_else(|| MinerError::MissingConfigError {
            field: "tokens".to_string(),
        })?;

        let mut total = 0;
        for pull in &items {
            total += self.process_pull(repo, pull, token).await?;
        }

        tracing::info!("✅ {}: {} commits with diffs stored", repo, total);
        Ok(())
    }
}
