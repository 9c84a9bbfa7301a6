use crate::github::client::{
    ClientSettings, RetryPolicy, DEFAULT_USER_AGENT, GITHUB_API_URL, MAX_PAGE_SIZE,
};
use crate::utils::error::{MinerError, Result};
use crate::utils::validation::{
    validate_api_url, validate_at_least, validate_page_size, validate_path, validate_user_agent,
    Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerConfig {
    pub github: GithubConfig,
    pub retry: RetryConfig,
    pub collection: CollectionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub api_url: String,
    pub tokens_path: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: GITHUB_API_URL.to_string(),
            tokens_path: "resources/tokens.txt".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub wait_seconds: u64,
    pub ban_wait_seconds: u64,
    pub time_divergence_seconds: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            wait_seconds: policy.retry_wait.as_secs(),
            ban_wait_seconds: policy.ban_wait.as_secs(),
            time_divergence_seconds: policy.time_divergence.as_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub batch_size: usize,
    pub page_size: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl MinerConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| MinerError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GITHUB_API_URL})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| MinerError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_api_url("github.api_url", &self.github.api_url)?;
        validate_path("github.tokens_path", &self.github.tokens_path)?;
        validate_user_agent("github.user_agent", &self.github.user_agent)?;
        validate_at_least(
            "github.timeout_seconds",
            self.github.timeout_seconds as usize,
            1,
        )?;
        validate_at_least("retry.max_attempts", self.retry.max_attempts as usize, 1)?;
        validate_at_least("collection.batch_size", self.collection.batch_size, 1)?;
        validate_page_size("collection.page_size", self.collection.page_size, MAX_PAGE_SIZE)?;
        Ok(())
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            api_url: self.github.api_url.clone(),
            user_agent: self.github.user_agent.clone(),
            timeout: Duration::from_secs(self.github.timeout_seconds),
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                retry_wait: Duration::from_secs(self.retry.wait_seconds),
                ban_wait: Duration::from_secs(self.retry.ban_wait_seconds),
                time_divergence: Duration::from_secs(self.retry.time_divergence_seconds),
            },
        }
    }
}

impl Validate for MinerConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
