pub mod api;
pub mod client;

pub use client::{ClientSettings, GithubClient, RetryPolicy, GITHUB_API_URL};
