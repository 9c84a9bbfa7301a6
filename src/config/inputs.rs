use crate::domain::model::RepoRef;
use crate::github::api::parse_github_url;
use crate::utils::error::{MinerError, Result};
use std::path::Path;

fn read_lines(path: &Path, what: &str) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| MinerError::ConfigError {
        message: format!("cannot read {} '{}': {}", what, path.display(), e),
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn parse_repo_line(line: &str) -> Result<RepoRef> {
    if line.starts_with("http://") || line.starts_with("https://") {
        let (owner, name) = parse_github_url(line)?;
        return Ok(RepoRef::new(owner, name));
    }
    RepoRef::parse_list_line(line)
}

/// One `owner/name` or `https://github.com/owner/name` per line.
pub fn read_repos<P: AsRef<Path>>(path: P) -> Result<Vec<RepoRef>> {
    let path = path.as_ref();
    read_lines(path, "repository list")?
        .iter()
        .enumerate()
        .map(|(index, line)| {
            parse_repo_line(line).map_err(|e| {
                MinerError::invalid_input(format!("{}:{}: {}", path.display(), index + 1, e))
            })
        })
        .collect()
}

/// One GitHub token per line.
pub fn read_tokens<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let tokens = read_lines(path.as_ref(), "tokens file")?;
    if tokens.is_empty() {
        return Err(MinerError::ConfigError {
            message: format!("no tokens in '{}'", path.as_ref().display()),
        });
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_repos_skips_blank_lines() {
        let file = file_with("mpusz/mp-units\n\n  jlord/sheetsee.js  \n");
        let repos = read_repos(file.path()).unwrap();
        assert_eq!(
            repos,
            vec![
                RepoRef::new("mpusz", "mp-units"),
                RepoRef::new("jlord", "sheetsee.js")
            ]
        );
    }

    #[test]
    fn test_read_repos_accepts_github_urls() {
        let file = file_with("https://github.com/DimaProskurin/News-Bot\nhttps://github.com/o/n.git\n");
        let repos = read_repos(file.path()).unwrap();
        assert_eq!(
            repos,
            vec![
                RepoRef::new("DimaProskurin", "News-Bot"),
                RepoRef::new("o", "n")
            ]
        );
    }

    #[test]
    fn test_read_repos_reports_bad_line() {
        let file = file_with("ok/repo\nbroken\n");
        let err = read_repos(file.path()).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }

    #[test]
    fn test_read_tokens() {
        let file = file_with("ghp_one\n\nghp_two\n");
        assert_eq!(read_tokens(file.path()).unwrap(), vec!["ghp_one", "ghp_two"]);

        let empty = file_with("\n\n");
        assert!(read_tokens(empty.path()).is_err());
        assert!(read_tokens("/definitely/missing/tokens.txt").is_err());
    }
}
