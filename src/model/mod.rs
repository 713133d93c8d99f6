use std::path::PathBuf;

use thiserror::Error;

pub mod dependency;
pub mod groups;
pub mod lock;
pub mod resolution;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading {path}: {source}")]
    IO {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed dependency coordinate `{0}`, expected `group:module:version`")]
    MalformedCoordinate(String),
    #[error("Existing lock file cannot be read ({reason}), recreate it using write-locks: {path}")]
    CorruptLockFile { path: String, reason: String },
}

impl ParseError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ParseError::IO {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::CorruptLockFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
