use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("GitHub API error for {url}: {message}")]
    GithubApiError { url: String, message: String },

    #[error("GitHub API error (not retryable) for {url}: {message}")]
    NotRetryableError { url: String, message: String },

    #[error("Invalid input: {message}")]
    InvalidInputError { message: String },

    #[error("git failed for {repo}: {message}")]
    GitError { repo: String, message: String },
}

pub type Result<T> = std::result::Result<T, MinerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Configuration,
    Data,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl MinerError {
    pub fn api(url: impl Into<String>, message: impl Into<String>) -> Self {
        MinerError::GithubApiError {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        MinerError::InvalidInputError {
            message: message.into(),
        }
    }

    /// Whether the GitHub client should try the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MinerError::GithubApiError { .. } | MinerError::HttpError(_)
        )
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            MinerError::HttpError(_)
            | MinerError::GithubApiError { .. }
            | MinerError::NotRetryableError { .. } => ErrorCategory::Network,
            MinerError::ConfigError { .. }
            | MinerError::InvalidConfigValueError { .. }
            | MinerError::MissingConfigError { .. } => ErrorCategory::Configuration,
            MinerError::CsvError(_)
            | MinerError::SerializationError(_)
            | MinerError::InvalidInputError { .. } => ErrorCategory::Data,
            MinerError::IoError(_) | MinerError::GitError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            MinerError::GithubApiError { .. } | MinerError::HttpError(_) => ErrorSeverity::Medium,
            MinerError::NotRetryableError { .. } | MinerError::GitError { .. } => {
                ErrorSeverity::Medium
            }
            MinerError::ConfigError { .. }
            | MinerError::InvalidConfigValueError { .. }
            | MinerError::MissingConfigError { .. }
            | MinerError::InvalidInputError { .. }
            | MinerError::CsvError(_)
            | MinerError::SerializationError(_) => ErrorSeverity::High,
            MinerError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    /// 給使用者看的錯誤訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            MinerError::HttpError(_) | MinerError::GithubApiError { .. } => {
                format!("Could not reach the GitHub API: {}", self)
            }
            MinerError::NotRetryableError { message, .. } => {
                format!("GitHub rejected the request: {}", message)
            }
            MinerError::ConfigError { .. }
            | MinerError::InvalidConfigValueError { .. }
            | MinerError::MissingConfigError { .. } => format!("Configuration problem: {}", self),
            _ => self.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            MinerError::HttpError(_) | MinerError::GithubApiError { .. } => {
                "Check network connectivity and that the GitHub tokens are still valid"
            }
            MinerError::NotRetryableError { .. } => {
                "The repository may be private, renamed or removed; drop it from the list"
            }
            MinerError::ConfigError { .. }
            | MinerError::InvalidConfigValueError { .. }
            | MinerError::MissingConfigError { .. } => {
                "Fix the configuration file or command line flags and run again"
            }
            MinerError::InvalidInputError { .. }
            | MinerError::CsvError(_)
            | MinerError::SerializationError(_) => {
                "Check the repository list and the stored JSONL files for malformed lines"
            }
            MinerError::GitError { .. } => "Make sure git is installed and the token has read access",
            MinerError::IoError(_) => "Check that the output directories exist and are writable",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}
