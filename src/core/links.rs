use crate::core::jsonl;
use crate::domain::model::{IssueLinks, RepoRef};
use crate::domain::ports::{RepoDataTask, Storage};
use crate::utils::error::{MinerError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

// https://docs.github.com/en/get-started/writing-on-github/working-with-advanced-formatting/autolinked-references-and-urls
const ISSUE_REFERENCE_PATTERNS: [&str; 4] = [
    // https://github.com/jlord/sheetsee.js/issues/26
    r"https://github\.com/[^/\s]+/[^/\s]+/issues/(?P<issue>\d+)",
    // #26
    r"\s#(?P<issue>\d+)",
    // GH-26
    r"GH-(?P<issue>\d+)",
    // jlord/sheetsee.js#26
    r"[^/\s]+/[^/\s]+#(?P<issue>\d+)",
];

/// Turns stored comments into comment -> referenced issues records.
pub struct IssueLinkExtractor<S: Storage> {
    storage: S,
    api_url: String,
    patterns: Vec<Regex>,
}

impl<S: Storage> IssueLinkExtractor<S> {
    pub fn new(storage: S, api_url: &str) -> Result<Self> {
        let patterns = ISSUE_REFERENCE_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| MinerError::ConfigError {
                message: format!("issue reference pattern: {}", e),
            })?;

        Ok(Self {
            storage,
            api_url: api_url.trim_end_matches('/').to_string(),
            patterns,
        })
    }

    /// Issue numbers in pattern order; a number matched by two patterns appears twice.
    pub fn issue_numbers(&self, body: &str) -> Vec<String> {
        self.patterns
            .iter()
            .flat_map(|re| {
                re.captures_iter(body)
                    .filter_map(|caps| caps.name("issue"))
                    .map(|m| m.as_str().to_string())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn links_for(&self, repo: &RepoRef, comment: &Value) -> IssueLinks {
        let body = comment.get("body").and_then(Value::as_str).unwrap_or("");
        IssueLinks {
            comment_url: comment.get("url").cloned().unwrap_or(Value::Null),
            issue_url: comment.get("issue_url").cloned().unwrap_or(Value::Null),
            linked_issue_urls: self
                .issue_numbers(body)
                .into_iter()
                .map(|number| {
                    format!(
                        "{}/repos/{}/{}/issues/{}",
                        self.api_url, repo.owner, repo.name, number
                    )
                })
                .collect(),
        }
    }
}

#[async_trait]
impl<S: Storage> RepoDataTask for IssueLinkExtractor<S> {
    async fn process_items(
        &self,
        repo: &RepoRef,
        items: Vec<Value>,
        _token: Option<&str>,
    ) -> Result<()> {
        let links: Vec<IssueLinks> = items.iter().map(|c| self.links_for(repo, c)).collect();
        let referencing = links
            .iter()
            .filter(|l| !l.linked_issue_urls.is_empty())
            .count();

        jsonl::dump_items(&self.storage, repo, &links).await?;
        tracing::info!(
            "✅ {}: {} comments, {} with issue references",
            repo,
            links.len(),
            referencing
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LocalStorage;
    use serde_json::json;

    fn extractor() -> IssueLinkExtractor<LocalStorage> {
        IssueLinkExtractor::new(LocalStorage::new("unused"), "https://api.github.com/").unwrap()
    }

    #[test]
    fn test_issue_numbers_in_pattern_order() {
        let body = "Fixes GH-7 and see https://github.com/jlord/sheetsee.js/issues/26, also #3";
        assert_eq!(extractor().issue_numbers(body), vec!["26", "3", "7"]);
    }

    #[test]
    fn test_hash_reference_needs_leading_whitespace() {
        assert!(extractor().issue_numbers("#5 at the start").is_empty());
        assert_eq!(extractor().issue_numbers("closes #5"), vec!["5"]);
    }

    #[test]
    fn test_cross_repository_reference() {
        assert_eq!(
            extractor().issue_numbers("dup of jlord/sheetsee.js#26"),
            vec!["26"]
        );
    }

    #[test]
    fn test_links_for_comment() {
        let repo = RepoRef::new("octo", "hello");
        let comment = json!({
            "url": "https://api.github.com/repos/octo/hello/issues/comments/1",
            "issue_url": "https://api.github.com/repos/octo/hello/issues/2",
            "body": "related to #9"
        });
        let links = extractor().links_for(&repo, &comment);
        assert_eq!(
            links.linked_issue_urls,
            vec!["https://api.github.com/repos/octo/hello/issues/9".to_string()]
        );
        assert_eq!(links.issue_url, json!("https://api.github.com/repos/octo/hello/issues/2"));

        let empty = extractor().links_for(&repo, &json!({"url": "u", "body": null}));
        assert!(empty.linked_issue_urls.is_empty());
        assert_eq!(empty.issue_url, Value::Null);
    }
}
