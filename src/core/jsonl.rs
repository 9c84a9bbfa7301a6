use crate::domain::model::{RepoRef, DATA_FILE_EXTENSION};
use crate::domain::ports::Storage;
use crate::utils::error::{MinerError, Result};
use serde::Serialize;
use serde_json::Value;

pub fn encode_lines<T: Serialize>(items: &[T]) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    for item in items {
        serde_json::to_writer(&mut buffer, item)?;
        buffer.push(b'\n');
    }
    Ok(buffer)
}

/// Appends one JSON document per line to `owner__name.jsonl`.
pub async fn dump_items<S: Storage, T: Serialize>(
    storage: &S,
    repo: &RepoRef,
    items: &[T],
) -> Result<()> {
    if items.is_empty() {
        return Ok(());
    }
    storage
        .append_file(&repo.data_file_name(), &encode_lines(items)?)
        .await
}

pub async fn load_file<S: Storage>(storage: &S, path: &str) -> Result<Vec<Value>> {
    let data = storage.read_file(path).await?;
    let text = String::from_utf8(data)
        .map_err(|e| MinerError::invalid_input(format!("{} is not UTF-8: {}", path, e)))?;

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line).map_err(|e| {
                MinerError::invalid_input(format!("{} line {}: {}", path, index + 1, e))
            })
        })
        .collect()
}

pub async fn load_items<S: Storage>(storage: &S, repo: &RepoRef) -> Result<Vec<Value>> {
    load_file(storage, &repo.data_file_name()).await
}

/// Repositories that have a data file, sorted by file name.
pub async fn repos_in<S: Storage>(storage: &S) -> Result<Vec<RepoRef>> {
    let suffix = format!(".{}", DATA_FILE_EXTENSION);
    Ok(storage
        .list_files()
        .await?
        .iter()
        .filter(|name| name.ends_with(&suffix))
        .filter_map(|name| {
            let repo = RepoRef::from_file_name(name);
            if repo.is_none() {
                tracing::warn!("Skipping {}: not named owner__name.{}", name, DATA_FILE_EXTENSION);
            }
            repo
        })
        .collect())
}
