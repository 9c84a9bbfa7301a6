use crate::core::jsonl;
use crate::domain::model::{RepoRef, RunSummary};
use crate::domain::ports::{RepoDataTask, RepoTask, Storage};
use crate::utils::error::{MinerError, Result};
use futures_util::future::join_all;

/// GitHub tokens handed out round-robin.
#[derive(Debug, Clone)]
pub struct TokenPool {
    tokens: Vec<String>,
}

impl TokenPool {
    pub fn new(tokens: Vec<String>) -> Result<Self> {
        if tokens.is_empty() {
            return Err(MinerError::ConfigError {
                message: "at least one GitHub token is required".to_string(),
            });
        }
        Ok(Self { tokens })
    }

    pub fn token_for(&self, index: usize) -> &str {
        &self.tokens[index % self.tokens.len()]
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Drops the repositories listed before `from` (`owner__name`).
pub fn skip_until(repos: Vec<RepoRef>, from: Option<&str>) -> Vec<RepoRef> {
    let Some(from) = from else {
        return repos;
    };
    match repos.iter().position(|r| r.file_stem() == from) {
        Some(index) => repos.into_iter().skip(index).collect(),
        None => {
            tracing::warn!("Start repository {} not in the list, processing all", from);
            repos
        }
    }
}

/// Runs a task over repositories: batches one after another, repositories of a
/// batch concurrently. A failed repository is recorded and the run goes on.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    batch_size: usize,
}

impl BatchRunner {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub async fn run<T: RepoTask + ?Sized>(
        &self,
        task: &T,
        repos: &[RepoRef],
        tokens: &TokenPool,
    ) -> RunSummary {
        let mut summary = RunSummary::default();

        for (batch_index, batch) in repos.chunks(self.batch_size).enumerate() {
            let offset = batch_index * self.batch_size;
            tracing::info!(
                "Batch {} ({} repositories, starting at #{})",
                batch_index + 1,
                batch.len(),
                offset
            );

            let results = join_all(batch.iter().enumerate().map(|(i, repo)| {
                let token = tokens.token_for(offset + i);
                async move {
                    tracing::info!("Processing {}", repo);
                    (repo, task.process_repo(repo, token).await)
                }
            }))
            .await;

            summary.merge(Self::summarize(results));
        }

        summary
    }

    /// Feeds the stored items of every repository to `task`. With no explicit
    /// list, every data file in `storage` is processed.
    pub async fn run_on_data<T: RepoDataTask + ?Sized, S: Storage>(
        &self,
        task: &T,
        storage: &S,
        repos: Option<&[RepoRef]>,
        tokens: Option<&TokenPool>,
    ) -> Result<RunSummary> {
        let repos = match repos {
            Some(repos) => repos.to_vec(),
            None => jsonl::repos_in(storage).await?,
        };
        let mut summary = RunSummary::default();

        for (batch_index, batch) in repos.chunks(self.batch_size).enumerate() {
            let offset = batch_index * self.batch_size;

            let results = join_all(batch.iter().enumerate().map(|(i, repo)| {
                let token = tokens.map(|pool| pool.token_for(offset + i));
                async move {
                    let path = repo.data_file_name();
                    if !storage.exists(&path).await {
                        tracing::debug!("No stored data for {}, skipping", repo);
                        return (repo, None);
                    }
                    tracing::info!("Processing: {}", path);
                    let result = match jsonl::load_items(storage, repo).await {
                        Ok(items) => task.process_items(repo, items, token).await,
                        Err(e) => Err(e),
                    };
                    (repo, Some(result))
                }
            }))
            .await;

            let ran = results
                .into_iter()
                .filter_map(|(repo, result)| result.map(|r| (repo, r)))
                .collect();
            summary.merge(Self::summarize(ran));
        }

        Ok(summary)
    }

    fn summarize(results: Vec<(&RepoRef, Result<()>)>) -> RunSummary {
        let mut summary = RunSummary::default();
        for (repo, result) in results {
            match result {
                Ok(()) => summary.processed += 1,
                Err(e) => {
                    tracing::error!("❌ {} failed: {}", repo, e);
                    summary.failed.push((repo.clone(), e.to_string()));
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::LocalStorage;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct Recorder {
        seen: Mutex<Vec<(String, String)>>,
        fail_on: Option<String>,
    }

    impl Recorder {
        fn new(fail_on: Option<&str>) -> Self {
            Self {
                seen: Mutex::new(Vec::new()),
                fail_on: fail_on.map(str::to_string),
            }
        }
    }

    #[async_trait]
    impl RepoTask for Recorder {
        async fn process_repo(&self, repo: &RepoRef, token: &str) -> Result<()> {
            self.seen
                .lock()
                .unwrap()
                .push((repo.to_string(), token.to_string()));
            if self.fail_on.as_deref() == Some(repo.name.as_str()) {
                return Err(MinerError::api("http://test", "boom"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RepoDataTask for Recorder {
        async fn process_items(
            &self,
            repo: &RepoRef,
            items: Vec<serde_json::Value>,
            token: Option<&str>,
        ) -> Result<()> {
            self.seen.lock().unwrap().push((
                format!("{}:{}", repo, items.len()),
                token.unwrap_or("-").to_string(),
            ));
            Ok(())
        }
    }

    fn repos(names: &[&str]) -> Vec<RepoRef> {
        names.iter().map(|n| RepoRef::new("o", *n)).collect()
    }

    #[test]
    fn test_empty_token_pool_rejected() {
        assert!(TokenPool::new(vec![]).is_err());
        let pool = TokenPool::new(vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(pool.token_for(0), "a");
        assert_eq!(pool.token_for(3), "b");
    }

    #[test]
    fn test_skip_until() {
        let list = repos(&["a", "b", "c"]);
        assert_eq!(skip_until(list.clone(), Some("o__b")), repos(&["b", "c"]));
        assert_eq!(skip_until(list.clone(), Some("o__zzz")).len(), 3);
        assert_eq!(skip_until(list, None).len(), 3);
    }

    #[tokio::test]
    async fn test_run_assigns_tokens_round_robin_and_keeps_going() {
        let task = Recorder::new(Some("b"));
        let pool = TokenPool::new(vec!["t0".into(), "t1".into()]).unwrap();
        let runner = BatchRunner::new(2);

        let summary = runner.run(&task, &repos(&["a", "b", "c"]), &pool).await;

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, RepoRef::new("o", "b"));

        let mut seen = task.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("o/a".to_string(), "t0".to_string()),
                ("o/b".to_string(), "t1".to_string()),
                ("o/c".to_string(), "t0".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_on_data_skips_missing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("o__a.jsonl"), "{}\n{}\n").unwrap();
        let storage = LocalStorage::new(dir.path());
        let task = Recorder::new(None);

        let summary = BatchRunner::new(10)
            .run_on_data(&task, &storage, Some(&repos(&["a", "missing"])), None)
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        assert!(summary.is_success());
        let seen = task.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![("o/a:2".to_string(), "-".to_string())]);
    }

    #[tokio::test]
    async fn test_run_on_data_lists_directory_when_no_repos_given() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("o__a.jsonl"), "{}\n").unwrap();
        std::fs::write(dir.path().join("o__b.jsonl"), "not json\n").unwrap();
        let storage = LocalStorage::new(dir.path());
        let task = Recorder::new(None);

        let summary = BatchRunner::new(1)
            .run_on_data(&task, &storage, None, None)
            .await
            .unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, RepoRef::new("o", "b"));
    }
}
