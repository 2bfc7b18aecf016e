use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Longest accepted track or playlist name, in characters.
pub const MAX_NAME_LEN: usize = 49;
/// Longest accepted source path, in characters.
pub const MAX_PATH_LEN: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    NoRepeat,
    RepeatOne,
    RepeatAll,
    Shuffle,
}

impl PlaybackMode {
    /// Parses the user-facing mode names, case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        match raw.to_ascii_lowercase().as_str() {
            "no-repeat" => Ok(Self::NoRepeat),
            "repeat-one" => Ok(Self::RepeatOne),
            "repeat-all" => Ok(Self::RepeatAll),
            "shuffle" => Ok(Self::Shuffle),
            _ => Err(CoreError::InvalidMode(raw.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoRepeat => "no-repeat",
            Self::RepeatOne => "repeat-one",
            Self::RepeatAll => "repeat-all",
            Self::Shuffle => "shuffle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedTrack {
    pub name: String,
    pub path: PathBuf,
}

/// Playlists are persisted by track NAME, not library index, so that
/// reordering or adding tracks between sessions does not corrupt them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedPlaylist {
    pub name: String,
    pub tracks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersistedState {
    pub version: u32,
    pub volume: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_track_path: Option<PathBuf>,
    pub library: Vec<PersistedTrack>,
    pub playlists: Vec<PersistedPlaylist>,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            version: 1,
            volume: 100,
            last_track_path: None,
            library: Vec::new(),
            playlists: Vec::new(),
        }
    }
}
