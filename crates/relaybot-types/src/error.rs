use std::path::PathBuf;

use thiserror::Error;

/// Invalid static setup. Always fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("history bound must be at least 2 messages, got {0}")]
    HistoryBoundTooSmall(usize),

    #[error("'{0}' is not configured")]
    MissingField(&'static str),

    #[error("'{0}' must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("no configuration found (searched: {})", format_paths(.0))]
    NotFound(Vec<PathBuf>),

    #[error("failed to read {}: {}", .path.display(), .message)]
    Read { path: PathBuf, message: String },

    #[error("failed to parse {}: {}", .path.display(), .message)]
    Parse { path: PathBuf, message: String },
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
