use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildframeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("no buildframe.toml found searching upward from {}", .search_start.display())]
    ConfigNotFound { search_start: PathBuf },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("source root {} is not usable: {}", .root.display(), .message)]
    SourceRoot { root: PathBuf, message: String },

    #[error("invalid ignore pattern `{pattern}`: {message}")]
    IgnorePattern { pattern: String, message: String },
}

pub type Result<T> = std::result::Result<T, BuildframeError>;

impl BuildframeError {
    pub fn config(message: impl Into<String>) -> Self {
        BuildframeError::Config(message.into())
    }

    pub fn source_root(root: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        BuildframeError::SourceRoot {
            root: root.into(),
            message: message.into(),
        }
    }

    pub fn ignore_pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        BuildframeError::IgnorePattern {
            pattern: pattern.into(),
            message: message.into(),
        }
    }
}
