use crate::core::jsonl;
use crate::core::runner::TokenPool;
use crate::domain::model::SearchQuery;
use crate::domain::ports::Storage;
use crate::github::api::{self, MAX_RESULTS_PER_SEARCH};
use crate::github::client::GithubClient;
use crate::utils::error::{MinerError, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};

pub const REPOSITORIES_FILE: &str = "repositories.jsonl";
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// GitHub was launched in 2008; nothing is created earlier.
pub fn default_search_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2008, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Splits `[from, to)` into consecutive windows of at most `days` days. Each
/// window ends one second before the next begins since `created:A..B` is inclusive.
/// A step past chrono's range yields a single window up to `to`.
pub fn creation_windows(
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    days: i64,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let step = Duration::try_days(days.max(1));
    let mut windows = Vec::new();
    let mut start = from;
    while start < to {
        let next = step
            .and_then(|step| start.checked_add_signed(step))
            .map_or(to, |next| next.min(to));
        windows.push((start, next - Duration::seconds(1)));
        start = next;
    }
    windows
}

#[derive(Debug, Default)]
pub struct SearchSummary {
    pub windows: usize,
    pub repositories: usize,
    pub skipped_windows: usize,
    pub failed_windows: Vec<(String, String)>,
}

/// Searches repositories window by window and records them with branch and commit.
pub struct RepositorySearch<S: Storage> {
    client: GithubClient,
    storage: S,
    query: String,
    other_parameters: String,
    page_size: usize,
    all_branches: bool,
}

impl<S: Storage> RepositorySearch<S> {
    pub fn new(client: GithubClient, storage: S, query: impl Into<String>, page_size: usize) -> Self {
        Self {
            client,
            storage,
            query: query.into(),
            other_parameters: String::new(),
            page_size,
            all_branches: false,
        }
    }

    pub fn with_parameters(mut self, other_parameters: impl Into<String>) -> Self {
        self.other_parameters = other_parameters.into();
        self
    }

    pub fn with_all_branches(mut self, all_branches: bool) -> Self {
        self.all_branches = all_branches;
        self
    }

    /// Returns how many repository records were written for the window.
    pub async fn search_window(
        &self,
        token: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<usize>> {
        let query = SearchQuery {
            created_from: Some(from),
            created_to: Some(to),
            query: self.query.clone(),
            other_parameters: self.other_parameters.clone(),
        };
        let mut next = Some(api::search_url(self.client.api_url(), &query, self.page_size)?);
        let mut written = 0;

        while let Some(url) = next.take() {
            let page = api::list_repositories(&self.client, token, &url, self.all_branches).await?;
            if page.total_count > MAX_RESULTS_PER_SEARCH {
                return Ok(None);
            }
            if page.incomplete_results {
                tracing::warn!("Incomplete search results for {}", url);
            }
            if !page.repositories.is_empty() {
                let lines = jsonl::encode_lines(&page.repositories)?;
                self.storage.append_file(REPOSITORIES_FILE, &lines).await?;
                written += page.repositories.len();
            }
            next = page.next_page_url;
        }

        Ok(Some(written))
    }

    pub async fn run(
        &self,
        tokens: &TokenPool,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        window_days: i64,
    ) -> Result<SearchSummary> {
        if from >= to {
            return Err(MinerError::invalid_input(format!(
                "search range is empty: {} is not before {}",
                from, to
            )));
        }

        let mut summary = SearchSummary::default();
        for (index, (start, end)) in creation_windows(from, to, window_days).into_iter().enumerate() {
            summary.windows += 1;
            let label = format!("{}..{}", start.date_naive(), end.date_naive());
            match self.search_window(tokens.token_for(index), start, end).await {
                Ok(Some(count)) => {
                    tracing::info!("✅ {}: {} repositories", label, count);
                    summary.repositories += count;
                }
                Ok(None) => {
                    tracing::warn!("⚠️ {}: too many results, narrow the window", label);
                    summary.skipped_windows += 1;
                }
                Err(e) => {
                    tracing::error!("❌ {} failed: {}", label, e);
                    summary.failed_windows.push((label, e.to_string()));
                }
            }
        }

        Ok(summary)
    }
}
