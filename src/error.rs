//! Error types shared by the playlist, relocation and session code

use std::path::PathBuf;
use thiserror::Error;

/// Result type used across the library
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Snapshot missing or structurally wrong
    #[error("Invalid playlist: {0}")]
    InvalidInput(String),

    /// Path does not resolve to an existing regular file
    #[error("Path \"{0}\" must point to a valid file")]
    Path(PathBuf),

    /// Relocation target exists and is not a directory
    #[error("'{0}' already exists and is not a directory")]
    DestinationConflict(PathBuf),

    #[error("No such command: {0}")]
    UnknownCommand(String),

    #[error("No such index in playlist: {0}")]
    NoSuchIndex(i64),

    /// The player could not be started at all (a non-zero exit is not an error)
    #[error("Player failed: {0}")]
    Player(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
