use crate::audio::AudioEngine;
use crate::config;
use crate::error::CoreError;
use crate::library::{self, Library};
use crate::model::{PersistedPlaylist, PersistedState, PersistedTrack, PlaybackMode};
use crate::player::{Playback, TickOutcome};
use crate::playlist::PlaylistCollection;
use std::path::{Path, PathBuf};

/// Owns the three stores and turns command-level operations into status
/// messages. Every mutation leaves the stores consistent; persistence is
/// the caller's job via `save`.
#[derive(Debug)]
pub struct LmpCore {
    pub library: Library,
    pub playlists: PlaylistCollection,
    pub playback: Playback,
    pub volume: u8,
    pub status: String,
    pub dirty: bool,
    last_track_path: Option<PathBuf>,
}

impl LmpCore {
    pub fn from_persisted(state: PersistedState) -> Self {
        let mut library = Library::new();
        for track in &state.library {
            // Records the store rejects (duplicates, overlong fields) are
            // dropped the same way malformed ones were at parse time.
            let _ = library.add(&track.name, &track.path);
        }

        let mut playlists = PlaylistCollection::new();
        for persisted in &state.playlists {
            let Ok(index) = playlists.create(&persisted.name) else {
                continue;
            };
            for track_name in &persisted.tracks {
                let Some(library_index) = library.find_by_name(track_name) else {
                    continue;
                };
                let _ = playlists.add_entry(index, library_index, library.len());
            }
        }

        Self {
            library,
            playlists,
            playback: Playback::new(),
            volume: state.volume.min(100),
            status: String::from("Ready"),
            dirty: true,
            last_track_path: state.last_track_path,
        }
    }

    pub fn persisted_state(&self) -> PersistedState {
        let library = self
            .library
            .tracks()
            .iter()
            .map(|track| PersistedTrack {
                name: track.name.clone(),
                path: track.path.clone(),
            })
            .collect();
        let playlists = self
            .playlists
            .iter()
            .map(|playlist| PersistedPlaylist {
                name: playlist.name().to_string(),
                tracks: playlist
                    .entries()
                    .iter()
                    .filter_map(|&index| self.library.get(index))
                    .map(|track| track.name.clone())
                    .collect(),
            })
            .collect();

        PersistedState {
            version: 1,
            volume: self.volume,
            last_track_path: self.last_track_path.clone(),
            library,
            playlists,
        }
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        if let Some(path) = self.playback.current_path() {
            self.last_track_path = Some(path.to_path_buf());
        }
        config::save_state(&self.persisted_state())
    }

    pub fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.dirty = true;
    }

    fn set_error(&mut self, err: &CoreError) {
        self.set_status(&format!("Error: {err}"));
    }

    pub fn add_track(&mut self, name: &str, path: &Path) {
        match self.library.add(name, path) {
            Ok(_) => self.set_status(&format!("Added '{name}' to library.")),
            Err(err) => self.set_error(&err),
        }
    }

    pub fn add_folder(&mut self, dir: &Path) {
        match library::import_folder(&mut self.library, dir) {
            Ok(scan) => {
                let skipped = scan.skipped_exists + scan.skipped_capacity + scan.skipped_invalid;
                self.set_status(&format!(
                    "Added {} tracks from folder ({skipped} skipped).",
                    scan.added
                ));
            }
            Err(err) => self.set_error(&err),
        }
    }

    pub fn rename_track(&mut self, current_name: &str, new_name: &str) {
        let Some(index) = self.library.find_by_name(current_name) else {
            self.set_status(&format!("Error: Track '{current_name}' not found."));
            return;
        };
        match self.library.rename(index, new_name) {
            Ok(()) => self.set_status(&format!("Renamed '{current_name}' to '{new_name}'.")),
            Err(err) => self.set_error(&err),
        }
    }

    /// Removes a library track and repairs everything that referenced it:
    /// playlist entries drop or shift, a session playing the track stops,
    /// and a bound position that fell off the end is clamped.
    pub fn remove_track(&mut self, audio: &mut dyn AudioEngine, name: &str) {
        let Some(index) = self.library.find_by_name(name) else {
            self.set_status(&format!("Error: Track '{name}' not found."));
            return;
        };

        self.playlists.on_library_removed(index);
        let removed = match self.library.remove(index) {
            Ok(track) => track,
            Err(err) => {
                self.set_error(&err);
                return;
            }
        };
        self.playback.on_track_removed(audio, &removed.path);
        self.playback.clamp_position(audio, &self.playlists);
        self.set_status(&format!("Removed '{name}' from library."));
    }

    pub fn create_playlist(&mut self, name: &str) {
        match self.playlists.create(name) {
            Ok(_) => self.set_status(&format!("Created playlist '{name}'.")),
            Err(err) => self.set_error(&err),
        }
    }

    pub fn delete_playlist(&mut self, audio: &mut dyn AudioEngine, name: &str) {
        let Some(index) = self.playlists.find_by_name(name) else {
            self.set_status(&format!("Error: Playlist '{name}' not found."));
            return;
        };
        match self.playlists.delete(index) {
            Ok(_) => {
                self.playback.on_playlist_deleted(audio, index);
                self.set_status(&format!("Deleted playlist '{name}'."));
            }
            Err(err) => self.set_error(&err),
        }
    }

    pub fn playlist_add(&mut self, playlist_name: &str, track_name: &str) {
        let Some(playlist_index) = self.playlists.find_by_name(playlist_name) else {
            self.set_status(&format!("Error: Playlist '{playlist_name}' not found."));
            return;
        };
        let Some(library_index) = self.library.find_by_name(track_name) else {
            self.set_status(&format!("Error: Track '{track_name}' not found."));
            return;
        };
        match self
            .playlists
            .add_entry(playlist_index, library_index, self.library.len())
        {
            Ok(()) => self.set_status(&format!(
                "Added '{track_name}' to playlist '{playlist_name}'."
            )),
            Err(err) => self.set_error(&err),
        }
    }

    /// Appends several tracks by 1-based library id, silently skipping
    /// ids that are out of range. A capacity failure stops the batch.
    pub fn playlist_add_multi(&mut self, playlist_name: &str, ids: &[usize]) {
        let Some(playlist_index) = self.playlists.find_by_name(playlist_name) else {
            self.set_status(&format!("Error: Playlist '{playlist_name}' not found."));
            return;
        };

        let mut added = 0_usize;
        for &id in ids {
            if id == 0 || id > self.library.len() {
                continue;
            }
            match self
                .playlists
                .add_entry(playlist_index, id - 1, self.library.len())
            {
                Ok(()) => added += 1,
                Err(err @ CoreError::Capacity(_)) => {
                    self.set_status(&format!("Error: {err} (added {added} tracks first)."));
                    return;
                }
                Err(_) => {}
            }
        }
        self.set_status(&format!("Added {added} tracks to '{playlist_name}'."));
    }

    pub fn playlist_remove_entry(
        &mut self,
        audio: &mut dyn AudioEngine,
        playlist_name: &str,
        position: usize,
    ) {
        let Some(playlist_index) = self.playlists.find_by_name(playlist_name) else {
            self.set_status(&format!("Error: Playlist '{playlist_name}' not found."));
            return;
        };
        match self.playlists.remove_entry(playlist_index, position) {
            Ok(_) => {
                self.playback.clamp_position(audio, &self.playlists);
                self.set_status(&format!(
                    "Removed track {position} from '{playlist_name}'."
                ));
            }
            Err(err) => self.set_error(&err),
        }
    }

    pub fn play(&mut self, audio: &mut dyn AudioEngine, name: &str) {
        let Some(index) = self.library.find_by_name(name) else {
            self.set_status(&format!("Error: Track '{name}' not found."));
            return;
        };
        match self.playback.play_track(audio, &self.library, index) {
            Ok(()) => self.set_status(&format!("Started playing: {name}")),
            Err(err) => self.set_error(&err),
        }
    }

    pub fn play_playlist(&mut self, audio: &mut dyn AudioEngine, name: &str) {
        let Some(index) = self.playlists.find_by_name(name) else {
            self.set_status(&format!("Error: Playlist '{name}' not found."));
            return;
        };
        match self
            .playback
            .play_playlist(audio, &self.library, &self.playlists, index)
        {
            Ok(()) => self.set_status(&format!("Playing playlist '{name}'.")),
            Err(err) => self.set_error(&err),
        }
    }

    pub fn stop(&mut self, audio: &mut dyn AudioEngine) {
        self.playback.stop(audio);
        self.set_status("Playback stopped.");
    }

    pub fn pause_toggle(&mut self, audio: &mut dyn AudioEngine) {
        if !audio.is_active() {
            self.set_status("Nothing is playing.");
            return;
        }
        audio.pause_toggle();
        if audio.is_paused() {
            self.set_status("Playback paused.");
        } else {
            self.set_status("Playback resumed.");
        }
    }

    pub fn set_volume(&mut self, audio: &mut dyn AudioEngine, volume: usize) {
        if volume > 100 {
            self.set_status("Error: Volume must be between 0 and 100.");
            return;
        }
        self.volume = volume as u8;
        audio.set_volume(self.volume);
        self.set_status(&format!("Volume set to {volume}%."));
    }

    pub fn set_mode(&mut self, raw: &str) {
        match PlaybackMode::parse(raw) {
            Ok(mode) => {
                self.playback.set_mode(mode);
                self.set_status(&format!("Playback mode set to {}.", mode.as_str()));
            }
            Err(err) => self.set_error(&err),
        }
    }

    pub fn skip(&mut self, audio: &mut dyn AudioEngine) {
        match self.playback.skip(audio, &self.library, &self.playlists) {
            Ok(TickOutcome::Noop) => self.set_status("Nothing is playing."),
            Ok(outcome) => self.apply_outcome(outcome),
            Err(err) => self.set_error(&err),
        }
    }

    /// Finish check for the run loop: advances playback when the audio
    /// backend reports the loaded track ran out.
    pub fn tick(&mut self, audio: &mut dyn AudioEngine) {
        let finished = audio.is_finished();
        match self
            .playback
            .on_tick(audio, &self.library, &self.playlists, finished)
        {
            Ok(TickOutcome::Noop) => {}
            Ok(outcome) => self.apply_outcome(outcome),
            Err(err) => self.set_error(&err),
        }
    }

    fn apply_outcome(&mut self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::Noop => {}
            TickOutcome::Replayed => self.set_status("Repeating track."),
            TickOutcome::Shuffled => self.set_status("Shuffling to next track."),
            TickOutcome::Advanced(name) => {
                self.set_status(&format!("Now playing next track in '{name}'"));
            }
            TickOutcome::PlaylistFinished(name) => {
                self.set_status(&format!("Playlist '{name}' finished."));
            }
            TickOutcome::PlaylistFinishedInvalidIndex(name) => {
                self.set_status(&format!("Playlist '{name}' finished (invalid index)."));
            }
            TickOutcome::PlaybackFinished => self.set_status("Playback Finished."),
        }
    }

    /// Case-insensitive substring search over track names. Returns the
    /// matching library indices in order.
    pub fn search(&mut self, term: &str) -> Vec<usize> {
        let needle = term.to_lowercase();
        let matches: Vec<usize> = self
            .library
            .tracks()
            .iter()
            .enumerate()
            .filter(|(_, track)| track.name.to_lowercase().contains(&needle))
            .map(|(index, _)| index)
            .collect();

        if matches.is_empty() {
            self.set_status(&format!("No tracks found matching '{term}'."));
        } else {
            let preview = matches
                .iter()
                .take(5)
                .filter_map(|&index| self.library.get(index))
                .map(|track| track.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            self.set_status(&format!(
                "Found {} track(s) matching '{term}': {preview}",
                matches.len()
            ));
        }
        matches
    }

    pub fn current_track_name(&self) -> Option<&str> {
        let path = self.playback.current_path()?;
        let index = self.library.find_by_path(path)?;
        self.library.get(index).map(|track| track.name.as_str())
    }
}

impl Default for LmpCore {
    fn default() -> Self {
        Self::from_persisted(PersistedState::default())
    }
}
