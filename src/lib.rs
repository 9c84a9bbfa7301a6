pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod github;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::LocalStorage;
pub use config::MinerConfig;
pub use crate::core::runner::{BatchRunner, TokenPool};
pub use domain::model::{RepoRef, RunSummary};
pub use github::{ClientSettings, GithubClient, RetryPolicy};
pub use utils::error::{MinerError, Result};
