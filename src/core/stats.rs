use crate::core::jsonl;
use crate::domain::ports::Storage;
use crate::utils::error::Result;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepoStats {
    pub repo: String,
    pub records: usize,
}

/// Counts the stored records of every data file.
pub async fn collect_stats<S: Storage>(storage: &S) -> Result<Vec<RepoStats>> {
    let mut stats = Vec::new();
    for repo in jsonl::repos_in(storage).await? {
        let items = jsonl::load_items(storage, &repo).await?;
        stats.push(RepoStats {
            repo: repo.to_string(),
            records: items.len(),
        });
    }
    stats.sort_by(|a, b| a.repo.cmp(&b.repo));
    Ok(stats)
}

pub fn write_csv<W: std::io::Write>(stats: &[RepoStats], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in stats {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}
