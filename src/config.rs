use crate::model::{MAX_NAME_LEN, MAX_PATH_LEN, PersistedPlaylist, PersistedState, PersistedTrack};
use anyhow::{Context, Result};
use serde_json::Value;
use std::env;
use std::fs;
use std::path::PathBuf;

const APP_DIR: &str = "lmp";
const STATE_FILE: &str = "config.json";

/// A state file larger than this is treated as corrupt.
const MAX_STATE_FILE_BYTES: u64 = 1 << 20;

/// How many records a load will take before ignoring the rest.
const MAX_LOADED_TRACKS: usize = 100;
const MAX_LOADED_PLAYLISTS: usize = 20;
const MAX_LOADED_ENTRIES: usize = 100;

pub fn config_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("LMP_CONFIG_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn state_path() -> Result<PathBuf> {
    Ok(config_root()?.join(STATE_FILE))
}

pub fn ensure_config_dir() -> Result<PathBuf> {
    let root = config_root()?;
    fs::create_dir_all(&root).with_context(|| format!("failed to create {}", root.display()))?;
    Ok(root)
}

pub fn save_state(state: &PersistedState) -> Result<()> {
    ensure_config_dir()?;
    let path = state_path()?;
    let json = serde_json::to_string_pretty(state)?;
    fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Loads the persisted state, degrading to defaults instead of failing.
/// A missing, oversized, or unparseable file yields the default state;
/// malformed records inside a parseable file are skipped one by one.
pub fn load_state() -> Result<PersistedState> {
    let path = state_path()?;
    if !path.exists() {
        return Ok(PersistedState::default());
    }

    let size = fs::metadata(&path)
        .with_context(|| format!("failed to stat state file {}", path.display()))?
        .len();
    if size > MAX_STATE_FILE_BYTES {
        return Ok(PersistedState::default());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read state file {}", path.display()))?;
    let Ok(value) = serde_json::from_str::<Value>(&raw) else {
        return Ok(PersistedState::default());
    };

    Ok(state_from_value(&value))
}

fn state_from_value(value: &Value) -> PersistedState {
    let mut state = PersistedState::default();
    let Some(root) = value.as_object() else {
        return state;
    };

    if let Some(volume) = root.get("volume").and_then(Value::as_u64) {
        state.volume = volume.min(100) as u8;
    }
    if let Some(path) = root
        .get("last_track_path")
        .and_then(Value::as_str)
        .filter(|path| !path.is_empty() && path.len() <= MAX_PATH_LEN)
    {
        state.last_track_path = Some(PathBuf::from(path));
    }

    if let Some(library) = root.get("library").and_then(Value::as_array) {
        for record in library.iter().take(MAX_LOADED_TRACKS) {
            let Some(track) = track_from_value(record) else {
                continue;
            };
            state.library.push(track);
        }
    }

    if let Some(playlists) = root.get("playlists").and_then(Value::as_array) {
        for record in playlists.iter().take(MAX_LOADED_PLAYLISTS) {
            let Some(playlist) = playlist_from_value(record) else {
                continue;
            };
            state.playlists.push(playlist);
        }
    }

    state
}

fn track_from_value(value: &Value) -> Option<PersistedTrack> {
    let record = value.as_object()?;
    let name = record.get("name").and_then(Value::as_str)?;
    let path = record.get("path").and_then(Value::as_str)?;
    if name.is_empty() || path.is_empty() || path.len() > MAX_PATH_LEN {
        return None;
    }
    Some(PersistedTrack {
        name: name.chars().take(MAX_NAME_LEN).collect(),
        path: PathBuf::from(path),
    })
}

fn playlist_from_value(value: &Value) -> Option<PersistedPlaylist> {
    let record = value.as_object()?;
    let name = record.get("name").and_then(Value::as_str)?;
    if name.is_empty() {
        return None;
    }

    let mut tracks = Vec::new();
    if let Some(entries) = record.get("tracks").and_then(Value::as_array) {
        for entry in entries.iter().take(MAX_LOADED_ENTRIES) {
            if let Some(track_name) = entry.as_str().filter(|track_name| !track_name.is_empty()) {
                tracks.push(track_name.chars().take(MAX_NAME_LEN).collect());
            }
        }
    }

    Some(PersistedPlaylist {
        name: name.chars().take(MAX_NAME_LEN).collect(),
        tracks,
    })
}
