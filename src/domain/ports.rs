use crate::domain::model::RepoRef;
use crate::utils::error::Result;
use async_trait::async_trait;

/// File access relative to a data directory.
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
    /// Plain file names directly under the base directory.
    fn list_files(&self) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

/// Work done once per repository, talking to GitHub directly.
#[async_trait]
pub trait RepoTask: Send + Sync {
    async fn process_repo(&self, repo: &RepoRef, token: &str) -> Result<()>;
}

/// Work done once per repository on items collected earlier.
#[async_trait]
pub trait RepoDataTask: Send + Sync {
    async fn process_items(
        &self,
        repo: &RepoRef,
        items: Vec<serde_json::Value>,
        token: Option<&str>,
    ) -> Result<()>;
}
