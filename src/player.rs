//! Audio engine boundary.
//!
//! The runtime drives playback through [`Player`] so the engine stays
//! swappable; [`RodioPlayer`] is the real one. rodio cannot report a
//! position for every format it decodes, which is why positions come
//! from [`crate::clock::PlaybackClock`] and seeking rebuilds the sink
//! with a skipped prefix instead of scrubbing in place.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::error::{Error, Result};

pub trait Player {
    /// Select `path` for playback, dropping whatever played before.
    fn load(&mut self, path: &Path) -> Result<()>;

    /// Start the loaded file at `offset` seconds.
    fn play(&mut self, offset: f64) -> Result<()>;

    fn pause(&mut self);

    fn resume(&mut self);

    /// Jump to `offset` seconds, keeping the paused state.
    fn set_position(&mut self, offset: f64) -> Result<()>;

    /// Whether the engine ran out of queued audio.
    fn finished(&self) -> bool;

    fn stop(&mut self);

    fn set_volume(&mut self, volume: f32);
}

pub struct RodioPlayer {
    stream: OutputStream,
    sink: Option<Sink>,
    current: Option<PathBuf>,
    volume: f32,
}

impl RodioPlayer {
    pub fn new() -> Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| Error::Player(e.to_string()))?;
        stream.log_on_drop(false);
        Ok(Self {
            stream,
            sink: None,
            current: None,
            volume: 1.0,
        })
    }

    /// A fresh paused sink decoding `path` from `start` onwards.
    fn build_sink(&self, path: &Path, start: Duration) -> Result<Sink> {
        let file = File::open(path)?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| Error::Player(e.to_string()))?;
        let sink = Sink::connect_new(self.stream.mixer());
        sink.set_volume(self.volume);
        sink.pause();
        sink.append(decoder.skip_duration(start));
        Ok(sink)
    }

    /// Swap in a new sink. The old one must be stopped explicitly, a
    /// dropped rodio sink detaches and keeps playing.
    fn replace_sink(&mut self, sink: Sink) {
        if let Some(old) = self.sink.replace(sink) {
            old.stop();
        }
    }
}

impl Player for RodioPlayer {
    fn load(&mut self, path: &Path) -> Result<()> {
        File::open(path)?;
        if let Some(old) = self.sink.take() {
            old.stop();
        }
        self.current = Some(path.to_path_buf());
        Ok(())
    }

    fn play(&mut self, offset: f64) -> Result<()> {
        let Some(path) = self.current.clone() else {
            return Err(Error::Player("nothing loaded".into()));
        };
        let sink = self.build_sink(&path, Duration::from_secs_f64(offset.max(0.0)))?;
        sink.play();
        self.replace_sink(sink);
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn set_position(&mut self, offset: f64) -> Result<()> {
        let Some(path) = self.current.clone() else {
            return Ok(());
        };
        let was_paused = self.sink.as_ref().map(|s| s.is_paused()).unwrap_or(true);
        let sink = self.build_sink(&path, Duration::from_secs_f64(offset.max(0.0)))?;
        if !was_paused {
            sink.play();
        }
        self.replace_sink(sink);
        Ok(())
    }

    fn finished(&self) -> bool {
        self.sink.as_ref().map(|s| s.empty()).unwrap_or(false)
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.current = None;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        if let Some(sink) = &self.sink {
            sink.set_volume(volume);
        }
    }
}
