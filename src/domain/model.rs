use crate::utils::error::{MinerError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DATA_FILE_EXTENSION: &str = "jsonl";

/// A GitHub repository addressed by owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parses one line of a repository list: `owner/name`.
    pub fn parse_list_line(line: &str) -> Result<Self> {
        let line = line.trim();
        match line.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(MinerError::invalid_input(format!(
                "expected 'owner/name', got '{}'",
                line
            ))),
        }
    }

    /// Parses a data file name: `owner__name.jsonl`.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(&format!(".{}", DATA_FILE_EXTENSION))?;
        let (owner, name) = stem.split_once("__")?;
        if owner.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(owner, name))
    }

    pub fn file_stem(&self) -> String {
        format!("{}__{}", self.owner, self.name)
    }

    pub fn data_file_name(&self) -> String {
        format!("{}.{}", self.file_stem(), DATA_FILE_EXTENSION)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Body of a successful API call plus the next page link, if any.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub data: serde_json::Value,
    pub next: Option<String>,
}

/// A repository at one branch, as found by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GithubRepository {
    pub repo_id: Option<u64>,
    pub name: String,
    pub owner: String,
    pub created_at: Option<DateTime<Utc>>,
    pub branch: Option<String>,
    pub commit_sha: Option<String>,
    pub collection_timestamp: DateTime<Utc>,
    pub meta: Option<serde_json::Value>,
    pub problems: Option<String>,
}

/// Repository search restricted to a creation date range.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub query: String,
    pub other_parameters: String,
}

#[derive(Debug, Clone)]
pub struct RepositoryPage {
    pub total_count: u64,
    pub incomplete_results: bool,
    pub repositories: Vec<GithubRepository>,
    pub next_page_url: Option<String>,
}

/// Issue references found in one comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueLinks {
    pub comment_url: serde_json::Value,
    pub issue_url: serde_json::Value,
    pub linked_issue_urls: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub processed: usize,
    pub failed: Vec<(RepoRef, String)>,
}

impl RunSummary {
    pub fn merge(&mut self, other: RunSummary) {
        self.processed += other.processed;
        self.failed.extend(other.failed);
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_line() {
        let repo = RepoRef::parse_list_line("  jlord/sheetsee.js \n").unwrap();
        assert_eq!(repo, RepoRef::new("jlord", "sheetsee.js"));
        assert_eq!(repo.to_string(), "jlord/sheetsee.js");

        assert!(RepoRef::parse_list_line("no-slash").is_err());
        assert!(RepoRef::parse_list_line("/name").is_err());
        assert!(RepoRef::parse_list_line("a/b/c").is_err());
    }

    #[test]
    fn test_file_name_round_trip() {
        let repo = RepoRef::new("mpusz", "mp-units");
        assert_eq!(repo.data_file_name(), "mpusz__mp-units.jsonl");
        assert_eq!(
            RepoRef::from_file_name("mpusz__mp-units.jsonl"),
            Some(repo)
        );
        assert_eq!(RepoRef::from_file_name("notes.txt"), None);
        assert_eq!(RepoRef::from_file_name("nounderscores.jsonl"), None);
    }

    #[test]
    fn test_run_summary_merge() {
        let mut total = RunSummary {
            processed: 2,
            failed: vec![],
        };
        total.merge(RunSummary {
            processed: 1,
            failed: vec![(RepoRef::new("a", "b"), "boom".to_string())],
        });
        assert_eq!(total.processed, 3);
        assert!(!total.is_success());
    }
}
