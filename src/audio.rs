use anyhow::{Context, Result};
use rodio::Source;
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// The playback-side seam. One track at a time; `play` replaces whatever
/// was loaded. Volume is a percentage, 0 to 100.
pub trait AudioEngine {
    fn play(&mut self, path: &Path) -> Result<()>;
    fn pause_toggle(&mut self);
    fn stop(&mut self);
    /// A track is loaded, playing or paused.
    fn is_active(&self) -> bool;
    fn is_paused(&self) -> bool;
    /// The loaded track ran out on its own. Cleared by `play` or `stop`.
    fn is_finished(&self) -> bool;
    fn set_volume(&mut self, volume: u8);
    fn position_seconds(&self) -> Option<f64>;
    fn probe_duration(&self, path: &Path) -> Option<f64>;
}

pub struct RodioAudioEngine {
    stream: OutputStream,
    sink: Sink,
    active: bool,
    volume: u8,
}

impl RodioAudioEngine {
    pub fn new() -> Result<Self> {
        let mut stream = OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")?
            .with_error_callback(|_| {})
            .open_stream_or_fallback()
            .context("failed to start default output stream")?;
        stream.log_on_drop(false);
        let sink = Sink::connect_new(stream.mixer());

        Ok(Self {
            stream,
            sink,
            active: false,
            volume: 100,
        })
    }

    fn gain(&self) -> f32 {
        f32::from(self.volume) / 100.0
    }
}

impl AudioEngine for RodioAudioEngine {
    fn play(&mut self, path: &Path) -> Result<()> {
        self.sink.stop();
        self.sink = Sink::connect_new(self.stream.mixer());

        let file =
            File::open(path).with_context(|| format!("failed to open track {}", path.display()))?;
        let source = Decoder::try_from(file)
            .with_context(|| format!("failed to decode {}", path.display()))?;
        self.sink.append(source);
        self.sink.set_volume(self.gain());
        self.active = true;
        Ok(())
    }

    fn pause_toggle(&mut self) {
        if self.sink.is_paused() {
            self.sink.play();
        } else {
            self.sink.pause();
        }
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.active = false;
    }

    fn is_active(&self) -> bool {
        self.active && (!self.sink.empty() || self.sink.is_paused())
    }

    fn is_paused(&self) -> bool {
        self.active && self.sink.is_paused()
    }

    fn is_finished(&self) -> bool {
        self.active && !self.sink.is_paused() && self.sink.empty()
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.sink.set_volume(self.gain());
    }

    fn position_seconds(&self) -> Option<f64> {
        if !self.active {
            return None;
        }
        Some(self.sink.get_pos().as_secs_f64())
    }

    fn probe_duration(&self, path: &Path) -> Option<f64> {
        let file = File::open(path).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
            .map(|duration| duration.as_secs_f64())
    }
}

/// Silent fallback for machines without a usable output device. Keeps a
/// wall-clock position so finish detection and the progress bar still work.
pub struct NullAudioEngine {
    current: Option<PathBuf>,
    paused: bool,
    started_at: Option<Instant>,
    position_offset: Duration,
    track_duration: Option<Duration>,
    volume: u8,
}

impl NullAudioEngine {
    pub fn new() -> Self {
        Self {
            current: None,
            paused: false,
            started_at: None,
            position_offset: Duration::ZERO,
            track_duration: None,
            volume: 100,
        }
    }

    fn estimate_duration(path: &Path) -> Option<Duration> {
        let file = File::open(path).ok()?;
        let source = Decoder::try_from(file).ok()?;
        source
            .total_duration()
            .filter(|duration| !duration.is_zero())
    }

    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && self.current.is_some()
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed());
        }
        if let Some(duration) = self.track_duration {
            return position.min(duration);
        }
        position
    }
}

impl Default for NullAudioEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioEngine for NullAudioEngine {
    fn play(&mut self, path: &Path) -> Result<()> {
        self.current = Some(path.to_path_buf());
        self.paused = false;
        self.started_at = Some(Instant::now());
        self.position_offset = Duration::ZERO;
        self.track_duration = Self::estimate_duration(path);
        Ok(())
    }

    fn pause_toggle(&mut self) {
        if self.current.is_none() {
            return;
        }
        if self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        } else {
            self.position_offset = self.current_position();
            self.started_at = None;
            self.paused = true;
        }
    }

    fn stop(&mut self) {
        self.current = None;
        self.paused = false;
        self.started_at = None;
        self.position_offset = Duration::ZERO;
        self.track_duration = None;
    }

    fn is_active(&self) -> bool {
        self.current.is_some()
    }

    fn is_paused(&self) -> bool {
        self.current.is_some() && self.paused
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.track_duration else {
            return false;
        };
        self.current.is_some() && !self.paused && self.current_position() >= duration
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    fn position_seconds(&self) -> Option<f64> {
        self.current.as_ref()?;
        Some(self.current_position().as_secs_f64())
    }

    fn probe_duration(&self, path: &Path) -> Option<f64> {
        Self::estimate_duration(path).map(|duration| duration.as_secs_f64())
    }
}
