//! Custom error types for chef operations

use thiserror::Error;

/// Chef-related errors
#[derive(Error, Debug)]
pub enum ChefError {
    /// API request failed
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Retry after {retry_after:?} seconds")]
    RateLimitError {
        retry_after: Option<u64>,
    },

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Credentials could not be located or parsed
    #[error("Credentials error: {message}")]
    CredentialsError {
        message: String,
    },

    /// `lang` option was not given
    #[error("`lang` is a required argument, choose from one of: {supported}")]
    MissingLanguage {
        supported: String,
    },

    /// `lang` option is not one of the supported languages
    #[error("`{lang}` is not a supported language, try one of: {supported}")]
    UnsupportedLanguage {
        lang: String,
        supported: String,
    },

    /// Positional option not in `key=value` form
    #[error("Invalid option `{option}`: expected key=value")]
    InvalidOption {
        option: String,
    },

    /// File operation error
    #[error("File error: {path} - {message}")]
    FileError {
        path: String,
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Expected markup was not found on a page
    #[error("Missing element `{selector}` on {url}")]
    MissingElement {
        selector: String,
        url: String,
    },

    /// Crawl output has an unexpected shape
    #[error("Invalid web resource tree: {message}")]
    InvalidTree {
        message: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// ZIP archive error
    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    /// JWT signing error
    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<anyhow::Error> for ChefError {
    fn from(err: anyhow::Error) -> Self {
        ChefError::InternalError(err.to_string())
    }
}

impl ChefError {
    /// Whether a failed request is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ChefError::NetworkError { .. } | ChefError::RateLimitError { .. } => true,
            ChefError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type for chef operations
pub type Result<T> = std::result::Result<T, ChefError>;
