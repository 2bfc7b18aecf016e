use crate::audio::AudioEngine;
use crate::error::CoreError;
use crate::library::Library;
use crate::model::PlaybackMode;
use crate::playlist::PlaylistCollection;
use rand::RngExt;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::path::{Path, PathBuf};

/// What a finish-check tick (or an explicit skip) did, for the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Noop,
    /// The finished track was restarted (repeat-one).
    Replayed,
    /// A uniformly random library track was started (shuffle).
    Shuffled,
    /// The active playlist advanced to its next track.
    Advanced(String),
    /// The active playlist ran out of entries and the session was cleared.
    PlaylistFinished(String),
    /// The next playlist entry no longer resolved to a library track.
    PlaylistFinishedInvalidIndex(String),
    /// A single track finished with nothing to advance to.
    PlaybackFinished,
}

/// The playback state machine. Idle when `current_path` is `None`,
/// playing a single track when it is set without an active playlist, and
/// playlist-bound when `active_playlist` is set too.
#[derive(Debug)]
pub struct Playback {
    current_path: Option<PathBuf>,
    duration_seconds: Option<f64>,
    mode: PlaybackMode,
    active_playlist: Option<usize>,
    active_position: usize,
    rng: SmallRng,
}

impl Default for Playback {
    fn default() -> Self {
        Self::new()
    }
}

impl Playback {
    pub fn new() -> Self {
        Self {
            current_path: None,
            duration_seconds: None,
            mode: PlaybackMode::NoRepeat,
            active_playlist: None,
            active_position: 0,
            rng: SmallRng::from_rng(&mut rand::rng()),
        }
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.current_path.as_deref()
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration_seconds
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PlaybackMode) {
        self.mode = mode;
    }

    pub fn active_playlist(&self) -> Option<usize> {
        self.active_playlist
    }

    pub fn active_position(&self) -> usize {
        self.active_position
    }

    pub fn is_idle(&self) -> bool {
        self.current_path.is_none()
    }

    fn clear_session(&mut self) {
        self.current_path = None;
        self.duration_seconds = None;
        self.active_playlist = None;
        self.active_position = 0;
    }

    fn start(&mut self, audio: &mut dyn AudioEngine, path: &Path) -> Result<(), CoreError> {
        audio.play(path).map_err(|err| {
            if path.exists() {
                CoreError::Backend(format!("{err:#}"))
            } else {
                CoreError::FileNotFound(path.to_path_buf())
            }
        })?;
        self.current_path = Some(path.to_path_buf());
        self.duration_seconds = audio.probe_duration(path);
        Ok(())
    }

    /// Starts a single library track, replacing any active session. A
    /// failed start leaves the previous session untouched.
    pub fn play_track(
        &mut self,
        audio: &mut dyn AudioEngine,
        library: &Library,
        index: usize,
    ) -> Result<(), CoreError> {
        let track = library.get(index).ok_or(CoreError::InvalidIndex {
            count: library.len(),
        })?;
        let path = track.path.clone();
        self.start(audio, &path)?;
        self.active_playlist = None;
        self.active_position = 0;
        Ok(())
    }

    /// Starts a playlist from its first entry and binds the session to it.
    pub fn play_playlist(
        &mut self,
        audio: &mut dyn AudioEngine,
        library: &Library,
        playlists: &PlaylistCollection,
        playlist_index: usize,
    ) -> Result<(), CoreError> {
        let playlist = playlists
            .get(playlist_index)
            .ok_or(CoreError::InvalidIndex {
                count: playlists.len(),
            })?;
        let first = playlist
            .entry(0)
            .ok_or_else(|| CoreError::EmptyPlaylist(playlist.name().to_string()))?;
        let track = library.get(first).ok_or(CoreError::InvalidIndex {
            count: library.len(),
        })?;
        let path = track.path.clone();

        self.start(audio, &path)?;
        self.active_playlist = Some(playlist_index);
        self.active_position = 0;
        Ok(())
    }

    pub fn stop(&mut self, audio: &mut dyn AudioEngine) {
        audio.stop();
        self.clear_session();
    }

    /// Finish check: advances only when the loaded track actually ended.
    pub fn on_tick(
        &mut self,
        audio: &mut dyn AudioEngine,
        library: &Library,
        playlists: &PlaylistCollection,
        track_finished: bool,
    ) -> Result<TickOutcome, CoreError> {
        if self.current_path.is_none() || !track_finished {
            return Ok(TickOutcome::Noop);
        }
        self.advance(audio, library, playlists)
    }

    /// Forces the advancement step without waiting for the finish signal.
    pub fn skip(
        &mut self,
        audio: &mut dyn AudioEngine,
        library: &Library,
        playlists: &PlaylistCollection,
    ) -> Result<TickOutcome, CoreError> {
        if self.current_path.is_none() {
            return Ok(TickOutcome::Noop);
        }
        self.advance(audio, library, playlists)
    }

    // Mode checks run in a fixed order: repeat-one wins even inside a
    // playlist, shuffle ignores the playlist entirely, and only then does
    // the playlist-bound branch advance or finish.
    fn advance(
        &mut self,
        audio: &mut dyn AudioEngine,
        library: &Library,
        playlists: &PlaylistCollection,
    ) -> Result<TickOutcome, CoreError> {
        if self.mode == PlaybackMode::RepeatOne {
            let path = match &self.current_path {
                Some(path) => path.clone(),
                None => return Ok(TickOutcome::Noop),
            };
            if let Err(err) = self.start(audio, &path) {
                self.clear_session();
                return Err(err);
            }
            return Ok(TickOutcome::Replayed);
        }

        if self.mode == PlaybackMode::Shuffle {
            if library.is_empty() {
                self.clear_session();
                return Ok(TickOutcome::Noop);
            }
            let index = self.rng.random_range(0..library.len());
            let path = library.get(index).map(|track| track.path.clone());
            let Some(path) = path else {
                self.clear_session();
                return Ok(TickOutcome::Noop);
            };
            if let Err(err) = self.start(audio, &path) {
                self.clear_session();
                return Err(err);
            }
            return Ok(TickOutcome::Shuffled);
        }

        if let Some(playlist_index) = self.active_playlist {
            let Some(playlist) = playlists.get(playlist_index) else {
                audio.stop();
                self.clear_session();
                return Ok(TickOutcome::PlaybackFinished);
            };
            let name = playlist.name().to_string();

            if self.mode == PlaybackMode::RepeatAll
                && self.active_position + 1 >= playlist.len()
            {
                self.active_position = 0;
            } else {
                self.active_position += 1;
            }

            if self.active_position < playlist.len() {
                let resolved = playlist
                    .entry(self.active_position)
                    .and_then(|library_index| library.get(library_index));
                let Some(track) = resolved else {
                    audio.stop();
                    self.clear_session();
                    return Ok(TickOutcome::PlaylistFinishedInvalidIndex(name));
                };
                let path = track.path.clone();
                if let Err(err) = self.start(audio, &path) {
                    self.clear_session();
                    return Err(err);
                }
                return Ok(TickOutcome::Advanced(name));
            }

            audio.stop();
            self.clear_session();
            return Ok(TickOutcome::PlaylistFinished(name));
        }

        audio.stop();
        self.clear_session();
        Ok(TickOutcome::PlaybackFinished)
    }

    /// Repairs the session after a playlist was deleted: the active
    /// session stops with it, later bindings shift down one index.
    pub fn on_playlist_deleted(&mut self, audio: &mut dyn AudioEngine, deleted: usize) {
        match self.active_playlist {
            Some(active) if active == deleted => self.stop(audio),
            Some(active) if active > deleted => self.active_playlist = Some(active - 1),
            _ => {}
        }
    }

    /// Repairs the session after the library dropped the track at `path`.
    pub fn on_track_removed(&mut self, audio: &mut dyn AudioEngine, path: &Path) {
        if self.current_path.as_deref() == Some(path) {
            self.stop(audio);
        }
    }

    /// Clamps the bound position after the active playlist shrank, and
    /// stops if nothing is left to point at.
    pub fn clamp_position(&mut self, audio: &mut dyn AudioEngine, playlists: &PlaylistCollection) {
        let Some(active) = self.active_playlist else {
            return;
        };
        let len = playlists.get(active).map_or(0, |pl| pl.len());
        if len == 0 {
            self.stop(audio);
        } else if self.active_position >= len {
            self.active_position = len - 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records calls instead of producing sound.
    #[derive(Default)]
    struct TestAudioEngine {
        played: Vec<PathBuf>,
        stops: usize,
        fail_next: bool,
    }

    impl AudioEngine for TestAudioEngine {
        fn play(&mut self, path: &Path) -> anyhow::Result<()> {
            if self.fail_next {
                self.fail_next = false;
                anyhow::bail!("decode failed");
            }
            self.played.push(path.to_path_buf());
            Ok(())
        }

        fn pause_toggle(&mut self) {}

        fn stop(&mut self) {
            self.stops += 1;
        }

        fn is_active(&self) -> bool {
            false
        }

        fn is_paused(&self) -> bool {
            false
        }

        fn is_finished(&self) -> bool {
            false
        }

        fn set_volume(&mut self, _volume: u8) {}

        fn position_seconds(&self) -> Option<f64> {
            None
        }

        fn probe_duration(&self, _path: &Path) -> Option<f64> {
            Some(180.0)
        }
    }

    fn library(names: &[&str]) -> Library {
        let mut library = Library::new();
        for name in names {
            library
                .add(name, Path::new(&format!("/music/{name}.mp3")))
                .expect("add");
        }
        library
    }

    fn one_playlist(library_len: usize, entries: &[usize]) -> PlaylistCollection {
        let mut playlists = PlaylistCollection::new();
        playlists.create("Mix").expect("create");
        for entry in entries {
            playlists.add_entry(0, *entry, library_len).expect("add");
        }
        playlists
    }

    #[test]
    fn play_track_sets_single_session() {
        let library = library(&["A"]);
        let playlists = PlaylistCollection::new();
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback.play_track(&mut audio, &library, 0).expect("play");
        assert_eq!(playback.current_path(), Some(Path::new("/music/A.mp3")));
        assert_eq!(playback.duration_seconds(), Some(180.0));
        assert_eq!(playback.active_playlist(), None);

        let outcome = playback
            .on_tick(&mut audio, &library, &playlists, true)
            .expect("tick");
        assert_eq!(outcome, TickOutcome::PlaybackFinished);
        assert!(playback.is_idle());
    }

    #[test]
    fn tick_without_finish_is_noop() {
        let library = library(&["A"]);
        let playlists = PlaylistCollection::new();
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback.play_track(&mut audio, &library, 0).expect("play");
        let outcome = playback
            .on_tick(&mut audio, &library, &playlists, false)
            .expect("tick");
        assert_eq!(outcome, TickOutcome::Noop);
        assert!(!playback.is_idle());
    }

    #[test]
    fn repeat_one_restarts_even_in_a_playlist() {
        let library = library(&["A", "B"]);
        let playlists = one_playlist(2, &[0, 1]);
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback
            .play_playlist(&mut audio, &library, &playlists, 0)
            .expect("play");
        playback.set_mode(PlaybackMode::RepeatOne);

        let outcome = playback
            .on_tick(&mut audio, &library, &playlists, true)
            .expect("tick");
        assert_eq!(outcome, TickOutcome::Replayed);
        assert_eq!(playback.active_position(), 0);
        assert_eq!(audio.played.last(), Some(&PathBuf::from("/music/A.mp3")));
    }

    #[test]
    fn playlist_advances_then_finishes() {
        let library = library(&["A", "B"]);
        let playlists = one_playlist(2, &[0, 1]);
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback
            .play_playlist(&mut audio, &library, &playlists, 0)
            .expect("play");

        let outcome = playback
            .on_tick(&mut audio, &library, &playlists, true)
            .expect("tick");
        assert_eq!(outcome, TickOutcome::Advanced(String::from("Mix")));
        assert_eq!(playback.active_position(), 1);
        assert_eq!(audio.played.last(), Some(&PathBuf::from("/music/B.mp3")));

        let outcome = playback
            .on_tick(&mut audio, &library, &playlists, true)
            .expect("tick");
        assert_eq!(outcome, TickOutcome::PlaylistFinished(String::from("Mix")));
        assert!(playback.is_idle());
    }

    #[test]
    fn repeat_all_wraps_to_the_first_entry() {
        let library = library(&["A", "B"]);
        let playlists = one_playlist(2, &[0, 1]);
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback
            .play_playlist(&mut audio, &library, &playlists, 0)
            .expect("play");
        playback.set_mode(PlaybackMode::RepeatAll);

        playback
            .on_tick(&mut audio, &library, &playlists, true)
            .expect("tick");
        assert_eq!(playback.active_position(), 1);

        let outcome = playback
            .on_tick(&mut audio, &library, &playlists, true)
            .expect("tick");
        assert_eq!(outcome, TickOutcome::Advanced(String::from("Mix")));
        assert_eq!(playback.active_position(), 0);
    }

    #[test]
    fn shuffle_ignores_the_playlist_and_stays_in_bounds() {
        let library = library(&["A", "B", "C"]);
        let playlists = one_playlist(3, &[2]);
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback
            .play_playlist(&mut audio, &library, &playlists, 0)
            .expect("play");
        playback.set_mode(PlaybackMode::Shuffle);

        for _ in 0..20 {
            let outcome = playback
                .on_tick(&mut audio, &library, &playlists, true)
                .expect("tick");
            assert_eq!(outcome, TickOutcome::Shuffled);
        }
        for played in &audio.played {
            assert!(library.find_by_path(played).is_some());
        }
    }

    #[test]
    fn shuffle_on_empty_library_goes_idle() {
        let library = library(&["A"]);
        let playlists = PlaylistCollection::new();
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback.play_track(&mut audio, &library, 0).expect("play");
        playback.set_mode(PlaybackMode::Shuffle);

        let empty = Library::new();
        let outcome = playback
            .on_tick(&mut audio, &empty, &playlists, true)
            .expect("tick");
        assert_eq!(outcome, TickOutcome::Noop);
        assert!(playback.is_idle());
    }

    #[test]
    fn skip_advances_without_a_finish_signal() {
        let library = library(&["A", "B"]);
        let playlists = one_playlist(2, &[0, 1]);
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback
            .play_playlist(&mut audio, &library, &playlists, 0)
            .expect("play");
        let outcome = playback
            .skip(&mut audio, &library, &playlists)
            .expect("skip");
        assert_eq!(outcome, TickOutcome::Advanced(String::from("Mix")));

        playback.stop(&mut audio);
        let outcome = playback
            .skip(&mut audio, &library, &playlists)
            .expect("skip");
        assert_eq!(outcome, TickOutcome::Noop);
    }

    #[test]
    fn empty_playlist_is_rejected() {
        let library = library(&["A"]);
        let playlists = one_playlist(1, &[]);
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        let err = playback
            .play_playlist(&mut audio, &library, &playlists, 0)
            .expect_err("empty");
        assert_eq!(err, CoreError::EmptyPlaylist(String::from("Mix")));
        assert!(playback.is_idle());
    }

    #[test]
    fn failed_play_keeps_the_previous_session() {
        let library = library(&["A", "B"]);
        let playlists = PlaylistCollection::new();
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback.play_track(&mut audio, &library, 0).expect("play");

        audio.fail_next = true;
        playback
            .play_track(&mut audio, &library, 1)
            .expect_err("fail");
        assert_eq!(playback.current_path(), Some(Path::new("/music/A.mp3")));
        assert_eq!(playback.duration_seconds(), Some(180.0));

        // The same holds when a playlist start fails mid-session.
        let playlists_with_one = {
            let mut playlists = PlaylistCollection::new();
            playlists.create("Mix").expect("create");
            playlists.add_entry(0, 1, 2).expect("add");
            playlists
        };
        audio.fail_next = true;
        playback
            .play_playlist(&mut audio, &library, &playlists_with_one, 0)
            .expect_err("fail");
        assert_eq!(playback.current_path(), Some(Path::new("/music/A.mp3")));
        assert_eq!(playback.active_playlist(), None);

        let outcome = playback
            .on_tick(&mut audio, &library, &playlists, true)
            .expect("tick");
        assert_eq!(outcome, TickOutcome::PlaybackFinished);
    }

    #[test]
    fn backend_failure_leaves_the_session_idle() {
        let library = library(&["A"]);
        let playlists = PlaylistCollection::new();
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        audio.fail_next = true;
        let err = playback
            .play_track(&mut audio, &library, 0)
            .expect_err("fail");
        assert_eq!(
            err,
            CoreError::FileNotFound(PathBuf::from("/music/A.mp3"))
        );
        assert!(playback.is_idle());
    }

    #[test]
    fn deleting_the_active_playlist_stops_playback() {
        let library = library(&["A"]);
        let playlists = one_playlist(1, &[0]);
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback
            .play_playlist(&mut audio, &library, &playlists, 0)
            .expect("play");
        playback.on_playlist_deleted(&mut audio, 0);
        assert!(playback.is_idle());
        assert_eq!(audio.stops, 1);
    }

    #[test]
    fn deleting_an_earlier_playlist_shifts_the_binding() {
        let library = library(&["A"]);
        let mut playlists = PlaylistCollection::new();
        playlists.create("First").expect("create");
        playlists.create("Second").expect("create");
        playlists.add_entry(1, 0, 1).expect("add");

        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();
        playback
            .play_playlist(&mut audio, &library, &playlists, 1)
            .expect("play");

        playback.on_playlist_deleted(&mut audio, 0);
        assert_eq!(playback.active_playlist(), Some(0));
        assert!(!playback.is_idle());
    }

    #[test]
    fn clamp_position_stops_on_empty_and_clamps_past_end() {
        let library = library(&["A", "B"]);
        let mut playlists = one_playlist(2, &[0, 1]);
        let mut audio = TestAudioEngine::default();
        let mut playback = Playback::new();

        playback
            .play_playlist(&mut audio, &library, &playlists, 0)
            .expect("play");
        playback
            .on_tick(&mut audio, &library, &playlists, true)
            .expect("tick");
        assert_eq!(playback.active_position(), 1);

        playlists.remove_entry(0, 2).expect("remove");
        playback.clamp_position(&mut audio, &playlists);
        assert_eq!(playback.active_position(), 0);

        playlists.remove_entry(0, 1).expect("remove");
        playback.clamp_position(&mut audio, &playlists);
        assert!(playback.is_idle());
    }
}
