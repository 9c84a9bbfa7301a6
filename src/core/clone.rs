use crate::domain::model::RepoRef;
use crate::domain::ports::RepoTask;
use crate::utils::error::{MinerError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

pub const GITHUB_HOST: &str = "github.com";

/// Clones each repository into `<repos_dir>/owner__name` with the `git` binary.
pub struct RepoCloner {
    repos_dir: PathBuf,
    host: String,
    git: String,
}

impl RepoCloner {
    pub fn new(repos_dir: impl Into<PathBuf>) -> Self {
        Self {
            repos_dir: repos_dir.into(),
            host: GITHUB_HOST.to_string(),
            git: "git".to_string(),
        }
    }

    pub fn with_git(mut self, git: impl Into<String>) -> Self {
        self.git = git.into();
        self
    }

    pub fn target_dir(&self, repo: &RepoRef) -> PathBuf {
        self.repos_dir.join(repo.file_stem())
    }

    pub fn remote_url(&self, repo: &RepoRef, token: &str) -> String {
        format!("https://{}@{}/{}/{}.git", token, self.host, repo.owner, repo.name)
    }
}

fn redact(text: &str, token: &str) -> String {
    if token.is_empty() {
        text.to_string()
    } else {
        text.replace(token, "***")
    }
}

#[async_trait]
impl RepoTask for RepoCloner {
    async fn process_repo(&self, repo: &RepoRef, token: &str) -> Result<()> {
        let target = self.target_dir(repo);
        if tokio::fs::try_exists(&target).await.unwrap_or(false) {
            tracing::debug!("{} already cloned at {}", repo, target.display());
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.repos_dir).await?;

        tracing::info!("Cloning {} into {}", repo, target.display());
        let output = Command::new(&self.git)
            .arg("clone")
            .arg("--quiet")
            .arg(self.remote_url(repo, token))
            .arg(&target)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| MinerError::GitError {
                repo: repo.to_string(),
                message: format!("could not run {}: {}", self.git, e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MinerError::GitError {
                repo: repo.to_string(),
                message: format!("{} ({})", redact(stderr.trim(), token), output.status),
            });
        }

        Ok(())
    }
}
