use crate::config::toml_config::MinerConfig;
use crate::core::search::DEFAULT_WINDOW_DAYS;
use crate::utils::error::{MinerError, Result};
use crate::utils::validation::Validate;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "repo-miner")]
#[command(about = "Collects GitHub repository history for code model benchmarks")]
pub struct CliConfig {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// File with one GitHub token per line
    #[arg(short = 't', long, global = true)]
    pub tokens_path: Option<String>,

    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Repositories processed concurrently
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log as JSON lines")]
    pub json_logs: bool,

    #[arg(long, global = true, help = "Log memory and time of the run")]
    pub monitor: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RepoListArgs {
    /// Text file with one `owner/name` per line
    #[arg(short = 'r', long, default_value = "resources/repository_list.txt")]
    pub repos_path: String,

    /// Start from this repository (`owner__name`)
    #[arg(short = 'f', long)]
    pub from_repo: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct StoredDataArgs {
    /// Directory with `owner__name.jsonl` files to read
    #[arg(long)]
    pub src_dir: String,

    /// Directory to write results to
    #[arg(long)]
    pub dst_dir: String,

    /// Restrict to the repositories of this list; default is every file in `src_dir`
    #[arg(short = 'r', long)]
    pub repos_path: Option<String>,

    #[arg(short = 'f', long)]
    pub from_repo: Option<String>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Download a repository listing (pulls, issues, issues/comments, ...)
    Collect {
        #[command(flatten)]
        repos: RepoListArgs,

        #[arg(short = 'o', long, default_value = "pulls")]
        object: String,

        #[arg(short = 's', long, default_value = "repo_info")]
        save_dir: String,
    },
    /// Add commits and linked issues to stored pull requests
    EnrichPulls {
        #[command(flatten)]
        data: StoredDataArgs,
    },
    /// Store the commits of stored pull requests with their diffs
    EnrichCommits {
        #[command(flatten)]
        data: StoredDataArgs,
    },
    /// Extract issue references from stored comments
    LinkIssues {
        #[arg(short = 'd', long, default_value = "comments")]
        data_path: String,

        #[arg(short = 's', long, default_value = "pull_issues_links")]
        save_dir: String,
    },
    /// Clone repositories with git
    Clone {
        #[command(flatten)]
        repos: RepoListArgs,

        #[arg(short = 's', long, default_value = "repos")]
        save_dir: String,
    },
    /// Search repositories by creation date windows
    Search {
        #[arg(short = 'q', long, default_value = "stars:>0")]
        query: String,

        /// Extra search parameters, e.g. `sort=stars&order=desc`
        #[arg(long, default_value = "")]
        parameters: String,

        /// Creation date start (YYYY-MM-DD or RFC 3339), default 2008-01-01
        #[arg(long)]
        from: Option<String>,

        /// Creation date end, exclusive; default now
        #[arg(long)]
        to: Option<String>,

        #[arg(long, default_value_t = DEFAULT_WINDOW_DAYS)]
        window_days: i64,

        /// One record per branch instead of the default branch only
        #[arg(long)]
        all_branches: bool,

        #[arg(short = 's', long, default_value = "search")]
        save_dir: String,
    },
    /// Count stored records per repository as CSV
    Stats {
        #[arg(short = 'd', long)]
        data_dir: String,

        /// CSV file to write; stdout when absent
        #[arg(short = 'o', long)]
        output: Option<String>,
    },
}

impl CliConfig {
    /// Defaults, then the TOML file, then command line flags.
    pub fn resolve(&self) -> Result<MinerConfig> {
        let mut config = match &self.config {
            Some(path) => MinerConfig::from_file(path).map_err(|e| MinerError::ConfigError {
                message: format!("failed to load '{}': {}", path, e),
            })?,
            None => MinerConfig::default(),
        };

        if let Some(tokens_path) = &self.tokens_path {
            config.github.tokens_path = tokens_path.clone();
        }
        if let Some(api_url) = &self.api_url {
            config.github.api_url = api_url.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.collection.batch_size = batch_size;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
pub fn parse_date(field: &str, value: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| MinerError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected YYYY-MM-DD or an RFC 3339 timestamp".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_collect_command() {
        let cli = CliConfig::try_parse_from([
            "repo-miner",
            "collect",
            "-r",
            "repos.txt",
            "-o",
            "issues",
            "--batch-size",
            "3",
        ])
        .unwrap();

        match &cli.command {
            Command::Collect {
                repos,
                object,
                save_dir,
            } => {
                assert_eq!(repos.repos_path, "repos.txt");
                assert_eq!(object, "issues");
                assert_eq!(save_dir, "repo_info");
            }
            other => panic!("unexpected command {:?}", other),
        }

        let config = cli.resolve().unwrap();
        assert_eq!(config.collection.batch_size, 3);
    }

    #[test]
    fn test_flag_overrides_are_validated() {
        let cli = CliConfig::try_parse_from([
            "repo-miner",
            "--api-url",
            "not a url",
            "stats",
            "-d",
            "data",
        ])
        .unwrap();
        assert!(cli.resolve().is_err());
    }

    #[test]
    fn test_enrich_requires_directories() {
        assert!(CliConfig::try_parse_from(["repo-miner", "enrich-pulls"]).is_err());
        assert!(CliConfig::try_parse_from([
            "repo-miner",
            "enrich-pulls",
            "--src-dir",
            "pulls",
            "--dst-dir",
            "pulls_full"
        ])
        .is_ok());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("from", "2020-02-03").unwrap(),
            Utc.with_ymd_and_hms(2020, 2, 3, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date("from", "2020-02-03T10:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2020, 2, 3, 8, 0, 0).unwrap()
        );
        assert!(parse_date("from", "yesterday").is_err());
    }
}
