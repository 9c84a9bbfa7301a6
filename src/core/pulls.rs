use crate::core::jsonl;
use crate::domain::model::RepoRef;
use crate::domain::ports::{RepoDataTask, Storage};
use crate::github::client::{paged_url, GithubClient};
use crate::utils::error::{MinerError, Result};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use std::time::Instant;

/// The sidebar form listing issues a pull request closes.
const LINKED_ISSUES_SELECTOR: &str = r#"form[aria-label="Link issues"] > span > a"#;

/// `href`s of the issues linked from a rendered pull request page.
pub fn linked_issues_from_html(html: &str) -> Result<Vec<String>> {
    let selector = Selector::parse(LINKED_ISSUES_SELECTOR)
        .map_err(|e| MinerError::invalid_input(format!("bad selector: {}", e)))?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect())
}

fn url_field<'a>(item: &'a Value, key: &str) -> Result<&'a str> {
    item.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| MinerError::invalid_input(format!("pull request without '{}'", key)))
}

/// Adds `commits` and `linked_issues` to stored pull requests.
pub struct PullsEnricher<S: Storage> {
    client: GithubClient,
    storage: S,
    page_size: usize,
}

impl<S: Storage> PullsEnricher<S> {
    pub fn new(client: GithubClient, storage: S, page_size: usize) -> Self {
        Self {
            client,
            storage,
            page_size,
        }
    }

    async fn linked_issues(&self, html_url: &str) -> Result<Vec<String>> {
        let started = Instant::now();
        let html = self.client.get_html(html_url).await?;
        tracing::debug!("Loaded {} in {:?}", html_url, started.elapsed());
        linked_issues_from_html(&html)
    }

    pub async fn enrich(&self, pull: &mut Value, token: &str) -> Result<()> {
        let commits_url = paged_url(url_field(pull, "commits_url")?, self.page_size);
        let commits = self.client.collect_pages(token, &commits_url).await?;

        let html_url = url_field(pull, "html_url")?.to_string();
        let linked = self.linked_issues(&html_url).await?;

        if let Some(object) = pull.as_object_mut() {
            object.insert("commits".to_string(), Value::Array(commits));
            object.insert(
                "linked_issues".to_string(),
                Value::Array(linked.into_iter().map(Value::String).collect()),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Storage> RepoDataTask for PullsEnricher<S> {
    async fn process_items(
        &self,
        repo: &RepoRef,
        mut items: Vec<Value>,
        token: Option<&str>,
    ) -> Result<()> {
        let token = token.ok_or_else(|| MinerError::MissingConfigError {
            field: "tokens".to_string(),
        })?;

        for pull in items.iter_mut() {
            self.enrich(pull, token).await?;
        }

        jsonl::dump_items(&self.storage, repo, &items).await?;
        tracing::info!("✅ {}: {} pull requests enriched", repo, items.len());
        Ok(())
    }
}
