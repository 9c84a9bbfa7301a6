pub mod clone;
pub mod collect;
pub mod commits;
pub mod jsonl;
pub mod links;
pub mod pulls;
pub mod runner;
pub mod search;
pub mod stats;

pub use crate::domain::model::{RepoRef, RunSummary};
pub use crate::domain::ports::{RepoDataTask, RepoTask, Storage};
pub use crate::utils::error::Result;
