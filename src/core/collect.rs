use crate::core::jsonl;
use crate::domain::model::RepoRef;
use crate::domain::ports::{RepoTask, Storage};
use crate::github::client::{paged_url, GithubClient};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Downloads every page of one repository listing (`pulls`, `issues`,
/// `issues/comments`, ...) and appends it to the repository's data file.
pub struct ObjectCollector<S: Storage> {
    client: GithubClient,
    storage: S,
    object: String,
    page_size: usize,
}

impl<S: Storage> ObjectCollector<S> {
    pub fn new(client: GithubClient, storage: S, object: impl Into<String>, page_size: usize) -> Self {
        Self {
            client,
            storage,
            object: object.into().trim_matches('/').to_string(),
            page_size,
        }
    }

    pub fn first_page_url(&self, repo: &RepoRef) -> String {
        paged_url(
            &self.client.repo_url(&repo.owner, &repo.name, &self.object),
            self.page_size,
        )
    }
}

#[async_trait]
impl<S: Storage> RepoTask for ObjectCollector<S> {
    async fn process_repo(&self, repo: &RepoRef, token: &str) -> Result<()> {
        let mut pages = self.client.pages(token, self.first_page_url(repo));
        let mut total = 0;

        while let Some(page) = pages.next_page().await {
            let items = match page? {
                Value::Array(items) => items,
                other => vec![other],
            };
            total += items.len();
            jsonl::dump_items(&self.storage, repo, &items).await?;
        }

        tracing::info!("✅ {}: {} {} collected", repo, total, self.object);
        Ok(())
    }
}
