//! Playback position reconciliation.
//!
//! The audio engine cannot continuously report a position for every
//! format, so the current position is derived from a recorded start tick
//! and the wall clock instead, and corrected by explicit `seek` calls
//! when the user scrubs or a track restarts. The clock never drives
//! playback itself: when `position()` passes the track duration it is
//! the caller's job to advance.

use std::time::Instant;

/// Wall-clock derived playback position.
///
/// Invariant: `position() == base_offset` while paused, and
/// `base_offset + (now - engine_start)` while playing. Pausing folds the
/// position reached so far into `base_offset`, so resuming only has to
/// re-base the start tick and the paused interval is never counted.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    engine_start: Instant,
    base_offset: f64,
    paused: bool,
}

impl PlaybackClock {
    /// A stopped clock at position zero.
    pub fn new() -> Self {
        Self {
            engine_start: Instant::now(),
            base_offset: 0.0,
            paused: true,
        }
    }

    /// Start playing from `offset` seconds.
    pub fn start(&mut self, offset: f64) {
        self.start_at(offset, Instant::now());
    }

    /// Freeze the position. Idempotent.
    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    /// Continue from the position reached at pause time. Idempotent.
    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    /// Re-base to `offset` seconds without touching the paused flag.
    pub fn seek(&mut self, offset: f64) {
        self.seek_at(offset, Instant::now());
    }

    /// Current position in seconds. Pure; safe to call every tick.
    pub fn position(&self) -> f64 {
        self.position_at(Instant::now())
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn start_at(&mut self, offset: f64, now: Instant) {
        self.base_offset = offset;
        self.engine_start = now;
        self.paused = false;
    }

    fn pause_at(&mut self, now: Instant) {
        if !self.paused {
            self.base_offset = self.position_at(now);
            self.engine_start = now;
            self.paused = true;
        }
    }

    fn resume_at(&mut self, now: Instant) {
        if self.paused {
            self.engine_start = now;
            self.paused = false;
        }
    }

    fn seek_at(&mut self, offset: f64, now: Instant) {
        self.base_offset = offset;
        self.engine_start = now;
    }

    fn position_at(&self, now: Instant) -> f64 {
        if self.paused {
            self.base_offset
        } else {
            self.base_offset + (now - self.engine_start).as_secs_f64()
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}
