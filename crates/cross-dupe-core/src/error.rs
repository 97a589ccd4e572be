use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Not a readable directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("At least two directories are required, got {0}")]
    TooFewRoots(usize),

    #[error("Directory label '{0}' is used more than once")]
    DuplicateLabel(String),

    #[error("Invalid verdict: {0}")]
    InvalidVerdict(String),

    #[error("{0}")]
    Other(String),
}
