use crate::utils::error::{MinerError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> MinerError {
    MinerError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Request paths are appended to the base, so it must be a bare http(s) URL.
pub fn validate_api_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.trim().is_empty() {
        return Err(invalid(field_name, url_str, "GitHub API base URL is required"));
    }

    let url = Url::parse(url_str)
        .map_err(|e| invalid(field_name, url_str, format!("not a GitHub API base URL: {}", e)))?;
    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(invalid(
                field_name,
                url_str,
                format!("GitHub API is served over http(s), not {}", scheme),
            ))
        }
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(
            field_name,
            url_str,
            "GitHub API base URL cannot carry a query or fragment",
        ));
    }
    Ok(())
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field_name, path, "a file or directory path is required"));
    }
    if path.contains('\0') {
        return Err(invalid(field_name, path, "path contains null bytes"));
    }
    Ok(())
}

pub fn validate_at_least(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

/// GitHub serves at most `max` items per page.
pub fn validate_page_size(field_name: &str, value: usize, max: usize) -> Result<()> {
    if value == 0 || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("GitHub pages hold between 1 and {} items", max),
        ));
    }
    Ok(())
}

pub fn validate_user_agent(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "GitHub rejects requests without a User-Agent",
        ));
    }
    Ok(())
}

/// Object below `/repos/{owner}/{name}/`, e.g. `issues` or `pulls/comments`.
pub fn validate_object_path(field_name: &str, object: &str) -> Result<()> {
    let trimmed = object.trim_matches('/');
    if trimmed.is_empty() {
        return Err(invalid(field_name, object, "a repository object such as issues is required"));
    }

    let bad_segment = trimmed.split('/').find(|segment| {
        segment.is_empty()
            || *segment == "."
            || *segment == ".."
            || !segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    });
    if let Some(segment) = bad_segment {
        return Err(invalid(
            field_name,
            object,
            format!("'{}' is not a repository object path segment", segment),
        ));
    }
    Ok(())
}
