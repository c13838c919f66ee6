use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("block namespace {0:?} must match ^[a-z][a-z0-9-]*$")]
    InvalidNamespace(String),

    #[error("post {0} does not exist")]
    PostNotFound(i64),

    #[error("no revisions recorded for run {0}")]
    RunNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
