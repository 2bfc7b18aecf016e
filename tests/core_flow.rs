use lmp::audio::AudioEngine;
use lmp::core::LmpCore;
use lmp::model::PersistedState;
use std::path::{Path, PathBuf};

#[derive(Default)]
struct TestAudioEngine {
    playing: Option<PathBuf>,
    paused: bool,
    finished: bool,
}

impl AudioEngine for TestAudioEngine {
    fn play(&mut self, path: &Path) -> anyhow::Result<()> {
        self.playing = Some(path.to_path_buf());
        self.paused = false;
        self.finished = false;
        Ok(())
    }

    fn pause_toggle(&mut self) {
        self.paused = !self.paused;
    }

    fn stop(&mut self) {
        self.playing = None;
        self.paused = false;
        self.finished = false;
    }

    fn is_active(&self) -> bool {
        self.playing.is_some()
    }

    fn is_paused(&self) -> bool {
        self.playing.is_some() && self.paused
    }

    fn is_finished(&self) -> bool {
        self.playing.is_some() && self.finished
    }

    fn set_volume(&mut self, _volume: u8) {}

    fn position_seconds(&self) -> Option<f64> {
        None
    }

    fn probe_duration(&self, _path: &Path) -> Option<f64> {
        None
    }
}

fn core_with_playlist() -> LmpCore {
    let mut core = LmpCore::default();
    core.add_track("A", Path::new("/a.mp3"));
    core.add_track("B", Path::new("/b.mp3"));
    core.add_track("C", Path::new("/c.mp3"));
    core.create_playlist("P");
    core.playlist_add("P", "A");
    core.playlist_add("P", "B");
    core.playlist_add("P", "C");
    core
}

fn finish_tick(core: &mut LmpCore, audio: &mut TestAudioEngine) {
    audio.finished = audio.playing.is_some();
    core.tick(audio);
}

#[test]
fn removing_a_track_repairs_playlist_entries() {
    let mut core = core_with_playlist();
    let mut audio = TestAudioEngine::default();

    core.remove_track(&mut audio, "B");

    assert_eq!(core.library.len(), 2);
    assert_eq!(core.library.find_by_name("A"), Some(0));
    assert_eq!(core.library.find_by_name("C"), Some(1));

    let playlist = core.playlists.get(0).expect("playlist");
    assert_eq!(playlist.entries(), &[0, 1]);
}

#[test]
fn repeat_all_wraps_from_the_last_entry() {
    let mut core = LmpCore::default();
    let mut audio = TestAudioEngine::default();
    core.add_track("A", Path::new("/a.mp3"));
    core.add_track("B", Path::new("/b.mp3"));
    core.create_playlist("P");
    core.playlist_add("P", "A");
    core.playlist_add("P", "B");

    core.play_playlist(&mut audio, "P");
    core.set_mode("repeat-all");
    finish_tick(&mut core, &mut audio);
    assert_eq!(core.playback.active_position(), 1);

    finish_tick(&mut core, &mut audio);
    assert_eq!(core.playback.active_position(), 0);
    assert_eq!(audio.playing, Some(PathBuf::from("/a.mp3")));
}

#[test]
fn no_repeat_finishes_after_the_last_entry() {
    let mut core = LmpCore::default();
    let mut audio = TestAudioEngine::default();
    core.add_track("A", Path::new("/a.mp3"));
    core.add_track("B", Path::new("/b.mp3"));
    core.create_playlist("P");
    core.playlist_add("P", "A");
    core.playlist_add("P", "B");

    core.play_playlist(&mut audio, "P");
    finish_tick(&mut core, &mut audio);
    assert_eq!(core.playback.active_position(), 1);

    finish_tick(&mut core, &mut audio);
    assert!(core.playback.is_idle());
    assert_eq!(core.playback.active_playlist(), None);
    assert_eq!(core.status, "Playlist 'P' finished.");
}

#[test]
fn deleting_the_active_playlist_goes_idle_before_the_next_tick() {
    let mut core = core_with_playlist();
    let mut audio = TestAudioEngine::default();

    core.play_playlist(&mut audio, "P");
    assert!(!core.playback.is_idle());

    core.delete_playlist(&mut audio, "P");
    assert!(core.playback.is_idle());
    assert_eq!(core.playback.current_path(), None);
    assert!(!audio.is_active());

    // The following tick sees a clean session and does nothing.
    core.set_status("quiet");
    core.tick(&mut audio);
    assert_eq!(core.status, "quiet");
}

#[test]
fn duplicate_playlist_names_are_rejected() {
    let mut core = LmpCore::default();
    core.create_playlist("X");
    core.create_playlist("X");
    assert_eq!(core.playlists.len(), 1);
    assert_eq!(core.status, "Error: playlist 'X' already exists");
}

#[test]
fn save_and_load_round_trip_preserves_name_sequences() {
    let mut core = core_with_playlist();
    core.create_playlist("Q");
    core.playlist_add("Q", "C");
    core.playlist_add("Q", "A");
    core.playlist_add("Q", "C");

    let restored = LmpCore::from_persisted(core.persisted_state());

    let names: Vec<&str> = restored
        .library
        .tracks()
        .iter()
        .map(|track| track.name.as_str())
        .collect();
    assert_eq!(names, vec!["A", "B", "C"]);

    let roundtrip = |core: &LmpCore, playlist: usize| -> Vec<String> {
        core.playlists
            .get(playlist)
            .expect("playlist")
            .entries()
            .iter()
            .map(|&entry| core.library.get(entry).expect("track").name.clone())
            .collect()
    };
    assert_eq!(roundtrip(&restored, 0), vec!["A", "B", "C"]);
    assert_eq!(roundtrip(&restored, 1), vec!["C", "A", "C"]);
}

#[test]
fn round_trip_survives_index_reshuffling_removals() {
    let mut core = core_with_playlist();
    let mut audio = TestAudioEngine::default();

    // Shift indices so playlist entries no longer match insertion order.
    core.remove_track(&mut audio, "A");
    core.add_track("D", Path::new("/d.mp3"));
    core.playlist_add("P", "D");

    let before: Vec<String> = core
        .playlists
        .get(0)
        .expect("playlist")
        .entries()
        .iter()
        .map(|&entry| core.library.get(entry).expect("track").name.clone())
        .collect();

    let restored = LmpCore::from_persisted(core.persisted_state());
    let after: Vec<String> = restored
        .playlists
        .get(0)
        .expect("playlist")
        .entries()
        .iter()
        .map(|&entry| restored.library.get(entry).expect("track").name.clone())
        .collect();

    assert_eq!(before, after);
    assert_eq!(after, vec!["B", "C", "D"]);
}

#[test]
fn repeat_one_keeps_replaying_the_same_track() {
    let mut core = LmpCore::default();
    let mut audio = TestAudioEngine::default();
    core.add_track("A", Path::new("/a.mp3"));
    core.play(&mut audio, "A");
    core.set_mode("repeat-one");

    for _ in 0..3 {
        finish_tick(&mut core, &mut audio);
        assert_eq!(core.status, "Repeating track.");
        assert_eq!(audio.playing, Some(PathBuf::from("/a.mp3")));
    }
}

#[test]
fn single_track_finish_reports_and_clears() {
    let mut core = LmpCore::default();
    let mut audio = TestAudioEngine::default();
    core.add_track("A", Path::new("/a.mp3"));
    core.play(&mut audio, "A");

    finish_tick(&mut core, &mut audio);
    assert_eq!(core.status, "Playback Finished.");
    assert!(core.playback.is_idle());
    assert!(!audio.is_active());
}

#[test]
fn persisted_volume_survives_a_restart() {
    let mut core = LmpCore::default();
    let mut audio = TestAudioEngine::default();
    core.set_volume(&mut audio, 25);

    let restored = LmpCore::from_persisted(core.persisted_state());
    assert_eq!(restored.volume, 25);
}

#[test]
fn defaults_start_empty_and_ready() {
    let core = LmpCore::from_persisted(PersistedState::default());
    assert!(core.library.is_empty());
    assert!(core.playlists.is_empty());
    assert_eq!(core.volume, 100);
    assert_eq!(core.status, "Ready");
}
