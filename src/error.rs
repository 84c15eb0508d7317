// SPDX-License-Identifier: PMPL-1.0-or-later
//! Error types for auditbot

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for auditbot
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Every attempt in the fetch chain failed; each cause is kept in order.
    #[error("Failed to fetch {url} after {} attempt(s): {}", .causes.len(), .causes.join("; "))]
    Fetch { url: String, causes: Vec<String> },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{0} returned an empty body")]
    EmptyBody(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Analysis error in {analyzer}: {message}")]
    Analysis { analyzer: String, message: String },

    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Fix {0} not found")]
    FixNotFound(String),

    #[error("{0} is not supported for this platform")]
    Unsupported(String),

    #[error("No fix template matches WCAG criteria [{0}]")]
    NoMatchingTemplate(String),

    #[error("Completion API error: {0}")]
    Completion(String),
}

impl Error {
    /// Build an analysis error for the named analyzer
    pub fn analysis(analyzer: &str, message: impl Into<String>) -> Self {
        Error::Analysis {
            analyzer: analyzer.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::InvalidUrl(err.to_string())
    }
}
