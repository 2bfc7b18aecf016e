use crate::model::{MAX_NAME_LEN, MAX_PATH_LEN};
use std::path::PathBuf;
use thiserror::Error;

/// Failure conditions surfaced by the library, playlist, and playback
/// layers. All of these are recoverable: the command layer turns them
/// into a status-line message and every store is left unmodified.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("a track named '{0}' already exists")]
    DuplicateName(String),

    #[error("'{}' is already in the library", .0.display())]
    DuplicatePath(PathBuf),

    #[error("playlist '{0}' already exists")]
    DuplicatePlaylist(String),

    #[error("invalid index. Must be 1-{count}")]
    InvalidIndex { count: usize },

    #[error("invalid track index {position} for playlist. (1-{count})")]
    InvalidPosition { position: usize, count: usize },

    #[error("cannot grow {0} storage")]
    Capacity(&'static str),

    #[error("name '{0}' is too long (max {MAX_NAME_LEN} chars)")]
    NameTooLong(String),

    #[error("path is too long (max {MAX_PATH_LEN} chars)")]
    PathTooLong,

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("audio backend error: {0}")]
    Backend(String),

    #[error("playlist '{0}' is empty")]
    EmptyPlaylist(String),

    #[error("invalid mode: {0}")]
    InvalidMode(String),
}
