//! Error types.
//!
//! Only `AggregateError` is fatal to a run. `StrategyError` is always
//! recovered by falling back to local rewriting and surfaces as a note.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("no conversion outcome for {file}")]
    MissingOutcome { file: String },
    #[error("no issue list for {file}")]
    MissingIssues { file: String },
}

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("credential not configured (set {env_var})")]
    MissingCredential { env_var: String },
    #[error("request timed out")]
    Timeout,
    #[error("endpoint returned status {code}")]
    Status { code: u16 },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {message}")]
    ConfigParse { path: String, message: String },
    #[error("invalid pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
    #[error("invalid rule table: {0}")]
    Rules(#[from] regex::Error),
}

impl MigrateError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrateError>;
