use crate::domain::model::{GithubRepository, RepositoryPage, SearchQuery};
use crate::github::client::GithubClient;
use crate::utils::error::{MinerError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use url::Url;

/// GitHub search never returns more than 1000 results; above this a window is too wide.
pub const MAX_RESULTS_PER_SEARCH: u64 = 850;

fn field<'a>(data: &'a Value, key: &str, url: &str) -> Result<&'a Value> {
    data.get(key)
        .ok_or_else(|| MinerError::api(url, format!("missing '{}' in response", key)))
}

fn str_field(data: &Value, key: &str, url: &str) -> Result<String> {
    field(data, key, url)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| MinerError::api(url, format!("'{}' is not a string", key)))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Repository id, default branch and full metadata.
pub async fn repository_meta(
    client: &GithubClient,
    token: &str,
    owner: &str,
    name: &str,
) -> Result<GithubRepository> {
    let url = client.repo_url(owner, name, "");
    let data = client.get(token, &url).await?.data;

    Ok(GithubRepository {
        repo_id: field(&data, "id", &url)?.as_u64(),
        name: str_field(&data, "name", &url)?,
        owner: str_field(field(&data, "owner", &url)?, "login", &url)?,
        created_at: data
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        branch: Some(str_field(&data, "default_branch", &url)?),
        commit_sha: None,
        collection_timestamp: Utc::now(),
        meta: Some(data),
        problems: None,
    })
}

pub async fn last_commit_sha(
    client: &GithubClient,
    token: &str,
    owner: &str,
    name: &str,
    branch: &str,
) -> Result<String> {
    let url = client.repo_url(owner, name, &format!("commits/{}", branch));
    let data = client.get(token, &url).await?.data;
    str_field(&data, "sha", &url)
}

pub async fn branches(
    client: &GithubClient,
    token: &str,
    owner: &str,
    name: &str,
) -> Result<Vec<String>> {
    let url = client.repo_url(owner, name, "branches");
    let data = client.get(token, &url).await?.data;
    Ok(data
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|b| b.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

fn iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Search URL for repositories created inside the query's date range.
pub fn search_url(api_url: &str, query: &SearchQuery, page_size: usize) -> Result<String> {
    let created = match (&query.created_from, &query.created_to) {
        (Some(from), Some(to)) => format!("+created:{}..{}", iso(from), iso(to)),
        (Some(from), None) => format!("+created:>={}", iso(from)),
        (None, Some(to)) => format!("+created:<{}", iso(to)),
        (None, None) => {
            return Err(MinerError::invalid_input(
                "search query needs a creation start or end date",
            ))
        }
    };

    let encoded: String = url::form_urlencoded::byte_serialize(query.query.as_bytes()).collect();
    let mut url = format!(
        "{}/search/repositories?per_page={}&q={}{}",
        api_url.trim_end_matches('/'),
        page_size,
        encoded,
        created
    );
    if !query.other_parameters.is_empty() {
        url.push('&');
        url.push_str(&query.other_parameters);
    }
    Ok(url)
}

/// One page of search results with each repository resolved to branch and commit.
pub async fn list_repositories(
    client: &GithubClient,
    token: &str,
    url: &str,
    all_branches: bool,
) -> Result<RepositoryPage> {
    tracing::info!("Starting to process repositories found by this url: {}", url);
    let timestamp = Utc::now();
    let response = client.get(token, url).await?;
    let data = response.data;

    let total_count = field(&data, "total_count", url)?.as_u64().unwrap_or(0);
    let incomplete_results = data
        .get("incomplete_results")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let mut page = RepositoryPage {
        total_count,
        incomplete_results,
        repositories: Vec::new(),
        next_page_url: response.next,
    };

    if total_count > MAX_RESULTS_PER_SEARCH {
        tracing::warn!(
            "Total count of repositories {} exceeds the maximum amount per search {}; skipping fetching repository data",
            total_count,
            MAX_RESULTS_PER_SEARCH
        );
        return Ok(page);
    }

    let items = data
        .get("items")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    for item in items {
        let records = resolve_branches(client, token, item, timestamp, all_branches).await?;
        page.repositories.extend(records);
    }

    Ok(page)
}

async fn resolve_branches(
    client: &GithubClient,
    token: &str,
    item: Value,
    collected_at: DateTime<Utc>,
    all_branches: bool,
) -> Result<Vec<GithubRepository>> {
    let url = "search item";
    let name = str_field(&item, "name", url)?;
    let owner = str_field(field(&item, "owner", url)?, "login", url)?;
    let base = GithubRepository {
        repo_id: item.get("id").and_then(Value::as_u64),
        name: name.clone(),
        owner: owner.clone(),
        created_at: item
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp),
        branch: None,
        commit_sha: None,
        collection_timestamp: collected_at,
        meta: None,
        problems: None,
    };

    if all_branches {
        tracing::debug!("Processing all branches for {}/{}", owner, name);
        let branches_url = item
            .get("branches_url")
            .and_then(Value::as_str)
            .map(|u| u.split('{').next().unwrap_or(u).to_string())
            .unwrap_or_else(|| client.repo_url(&owner, &name, "branches"));

        let records = match client.get(token, &branches_url).await {
            Ok(response) => response
                .data
                .as_array()
                .map(|branches| {
                    branches
                        .iter()
                        .map(|branch| GithubRepository {
                            branch: branch
                                .get("name")
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            commit_sha: branch
                                .get("commit")
                                .and_then(|c| c.get("sha"))
                                .and_then(Value::as_str)
                                .map(str::to_string),
                            meta: Some(item.clone()),
                            ..base.clone()
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Err(e) => vec![GithubRepository {
                meta: Some(item.clone()),
                problems: Some(e.to_string()),
                ..base.clone()
            }],
        };
        Ok(records)
    } else {
        let branch = str_field(&item, "default_branch", url)?;
        tracing::debug!("Processing branch {} for {}/{}", branch, owner, name);
        let (commit_sha, problems) =
            match last_commit_sha(client, token, &owner, &name, &branch).await {
                Ok(sha) => (Some(sha), None),
                Err(e) => (None, Some(e.to_string())),
            };
        Ok(vec![GithubRepository {
            branch: Some(branch),
            commit_sha,
            problems,
            meta: Some(item),
            ..base
        }])
    }
}

/// `https://github.com/owner/name` -> `(owner, name)`
pub fn parse_github_url(url: &str) -> Result<(String, String)> {
    let parsed = Url::parse(url)
        .map_err(|e| MinerError::invalid_input(format!("invalid url '{}': {}", url, e)))?;
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    match segments.as_slice() {
        [owner, name] => Ok((owner.to_string(), name.trim_end_matches(".git").to_string())),
        _ => Err(MinerError::invalid_input(format!(
            "'{}' is not a repository url",
            url
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn query(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> SearchQuery {
        SearchQuery {
            created_from: from,
            created_to: to,
            query: "language:rust stars:>10".to_string(),
            other_parameters: "sort=stars&order=desc".to_string(),
        }
    }

    #[test]
    fn test_search_url_with_range() {
        let from = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2020, 1, 31, 0, 0, 0).unwrap();
        let url = search_url("https://api.github.com", &query(Some(from), Some(to)), 100).unwrap();
        assert_eq!(
            url,
            "https://api.github.com/search/repositories?per_page=100&q=language%3Arust+stars%3A%3E10+created:2020-01-01T00:00:00Z..2020-01-31T00:00:00Z&sort=stars&order=desc"
        );
    }

    #[test]
    fn test_search_url_open_ranges() {
        let ts = Utc.with_ymd_and_hms(2008, 1, 1, 0, 0, 0).unwrap();
        let start_only = search_url("http://x", &query(Some(ts), None), 10).unwrap();
        assert!(start_only.contains("+created:>=2008-01-01T00:00:00Z"));
        let end_only = search_url("http://x", &query(None, Some(ts)), 10).unwrap();
        assert!(end_only.contains("+created:<2008-01-01T00:00:00Z"));
        assert!(search_url("http://x", &query(None, None), 10).is_err());
    }

    #[test]
    fn test_parse_github_url() {
        assert_eq!(
            parse_github_url("https://github.com/DimaProskurin/News-Bot").unwrap(),
            ("DimaProskurin".to_string(), "News-Bot".to_string())
        );
        assert!(parse_github_url("https://github.com/only-owner").is_err());
        assert!(parse_github_url("not a url").is_err());
    }
}
