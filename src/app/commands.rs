use crate::adapters::LocalStorage;
use crate::config::cli::{parse_date, CliConfig, Command, RepoListArgs, StoredDataArgs};
use crate::config::inputs::{read_repos, read_tokens};
use crate::config::MinerConfig;
use crate::core::clone::RepoCloner;
use crate::core::collect::ObjectCollector;
use crate::core::commits::CommitDiffEnricher;
use crate::core::jsonl;
use crate::core::links::IssueLinkExtractor;
use crate::core::pulls::PullsEnricher;
use crate::core::runner::{skip_until, BatchRunner, TokenPool};
use crate::core::search::{default_search_start, RepositorySearch};
use crate::core::stats;
use crate::domain::model::{RepoRef, RunSummary};
use crate::github::GithubClient;
use crate::utils::error::{MinerError, Result};
use crate::utils::validation::validate_object_path;

/// What a command did, for the final message and the exit code.
#[derive(Debug, Default)]
pub struct CommandReport {
    pub processed: usize,
    pub failures: Vec<String>,
    pub output: Option<String>,
}

impl CommandReport {
    fn from_summary(summary: RunSummary, output: &str) -> Self {
        Self {
            processed: summary.processed,
            failures: summary
                .failed
                .into_iter()
                .map(|(repo, error)| format!("{}: {}", repo, error))
                .collect(),
            output: Some(output.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

fn load_repos(args: &RepoListArgs) -> Result<Vec<RepoRef>> {
    let repos = read_repos(&args.repos_path)?;
    Ok(skip_until(repos, args.from_repo.as_deref()))
}

fn load_tokens(config: &MinerConfig) -> Result<TokenPool> {
    TokenPool::new(read_tokens(&config.github.tokens_path)?)
}

async fn output_storage(dir: &str) -> Result<LocalStorage> {
    let storage = LocalStorage::new(dir);
    storage.ensure_dir().await?;
    Ok(storage)
}

async fn run_enrichment<T: crate::core::RepoDataTask>(
    task: &T,
    data: &StoredDataArgs,
    runner: &BatchRunner,
    tokens: &TokenPool,
) -> Result<RunSummary> {
    let source = LocalStorage::new(&data.src_dir);
    let from = data.from_repo.as_deref();
    let repos = match (&data.repos_path, from) {
        (Some(path), _) => Some(skip_until(read_repos(path)?, from)),
        (None, Some(_)) => Some(skip_until(jsonl::repos_in(&source).await?, from)),
        (None, None) => None,
    };
    runner
        .run_on_data(task, &source, repos.as_deref(), Some(tokens))
        .await
}

pub async fn execute(cli: &CliConfig, config: &MinerConfig) -> Result<CommandReport> {
    let runner = BatchRunner::new(config.collection.batch_size);
    let page_size = config.collection.page_size;

    match &cli.command {
        Command::Collect {
            repos,
            object,
            save_dir,
        } => {
            validate_object_path("object", object)?;
            let repos = load_repos(repos)?;
            let tokens = load_tokens(config)?;
            let client = GithubClient::new(config.client_settings())?;
            let storage = output_storage(save_dir).await?;

            let collector = ObjectCollector::new(client, storage, object.as_str(), page_size);
            let summary = runner.run(&collector, &repos, &tokens).await;
            Ok(CommandReport::from_summary(summary, save_dir))
        }
        Command::EnrichPulls { data } => {
            let tokens = load_tokens(config)?;
            let client = GithubClient::new(config.client_settings())?;
            let enricher =
                PullsEnricher::new(client, output_storage(&data.dst_dir).await?, page_size);
            let summary = run_enrichment(&enricher, data, &runner, &tokens).await?;
            Ok(CommandReport::from_summary(summary, &data.dst_dir))
        }
        Command::EnrichCommits { data } => {
            let tokens = load_tokens(config)?;
            let client = GithubClient::new(config.client_settings())?;
            let enricher =
                CommitDiffEnricher::new(client, output_storage(&data.dst_dir).await?, page_size);
            let summary = run_enrichment(&enricher, data, &runner, &tokens).await?;
            Ok(CommandReport::from_summary(summary, &data.dst_dir))
        }
        Command::LinkIssues {
            data_path,
            save_dir,
        } => {
            let extractor =
                IssueLinkExtractor::new(output_storage(save_dir).await?, &config.github.api_url)?;
            let source = LocalStorage::new(data_path);
            let summary = runner.run_on_data(&extractor, &source, None, None).await?;
            Ok(CommandReport::from_summary(summary, save_dir))
        }
        Command::Clone { repos, save_dir } => {
            let repos = load_repos(repos)?;
            let tokens = load_tokens(config)?;
            let cloner = RepoCloner::new(save_dir);
            let summary = runner.run(&cloner, &repos, &tokens).await;
            Ok(CommandReport::from_summary(summary, save_dir))
        }
        Command::Search {
            query,
            parameters,
            from,
            to,
            window_days,
            all_branches,
            save_dir,
        } => {
            if *window_days < 1 {
                return Err(MinerError::InvalidConfigValueError {
                    field: "window_days".to_string(),
                    value: window_days.to_string(),
                    reason: "Value must be at least 1".to_string(),
                });
            }
            let from = match from {
                Some(value) => parse_date("from", value)?,
                None => default_search_start(),
            };
            let to = match to {
                Some(value) => parse_date("to", value)?,
                None => chrono::Utc::now(),
            };
            let tokens = load_tokens(config)?;
            let client = GithubClient::new(config.client_settings())?;

            let storage = output_storage(save_dir).await?;
            let search = RepositorySearch::new(client, storage, query.as_str(), page_size)
                .with_parameters(parameters.as_str())
                .with_all_branches(*all_branches);
            let summary = search.run(&tokens, from, to, *window_days).await?;

            tracing::info!(
                "Searched {} windows, {} skipped as too large",
                summary.windows,
                summary.skipped_windows
            );
            Ok(CommandReport {
                processed: summary.repositories,
                failures: summary
                    .failed_windows
                    .into_iter()
                    .map(|(window, error)| format!("{}: {}", window, error))
                    .collect(),
                output: Some(save_dir.clone()),
            })
        }
        Command::Stats { data_dir, output } => {
            let rows = stats::collect_stats(&LocalStorage::new(data_dir)).await?;
            match output {
                Some(path) => stats::write_csv(&rows, std::fs::File::create(path)?)?,
                None => stats::write_csv(&rows, std::io::stdout().lock())?,
            }
            Ok(CommandReport {
                processed: rows.len(),
                failures: Vec::new(),
                output: output.clone(),
            })
        }
    }
}
