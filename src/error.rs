use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Cannot access {}: {}", .path.display(), .source)]
    Access {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl DashError {
    pub(crate) fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Access {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DashError>;
