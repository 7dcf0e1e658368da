//! The playable asset.
//!
//! A [`Track`] remembers two paths: the file the user imported
//! (`source`) and the file the audio engine actually plays (`playable`).
//! For native audio they are the same; for video the playable path
//! points at the converted rendition in the cache, which may still be
//! in flight. Background job results are folded in by [`Track::check`],
//! which the owner is expected to call once per tick.

use std::path::PathBuf;
use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::Error;
use crate::media::{self, VideoHandle};
use crate::pipeline::{ConvertJob, CoverJob, FailurePolicy};

/// Duration in seconds, probed lazily.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackDuration {
    /// Not probed yet.
    Uncached,
    /// Probed, but the file would not report a duration. Never probed
    /// again.
    Unknown,
    Seconds(f64),
}

impl TrackDuration {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            TrackDuration::Seconds(secs) => Some(*secs),
            _ => None,
        }
    }
}

/// Lifecycle of the playable rendition.
#[derive(Debug, Clone)]
pub enum TrackStatus {
    /// A conversion job for the playable file is still running.
    Pending,
    /// The playable path exists and can be handed to the engine.
    Ready,
    /// Conversion failed and no fallback applies. The owner evicts the
    /// track on the next sweep.
    Failed(Arc<Error>),
}

impl TrackStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, TrackStatus::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TrackStatus::Ready)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TrackStatus::Failed(_))
    }
}

#[derive(Debug)]
pub struct Track {
    /// The file the user imported. Identity for dedupe, grouping and
    /// history.
    pub source: PathBuf,
    /// The file handed to the audio engine. Equal to `source` unless a
    /// converted rendition is in use.
    pub playable: PathBuf,
    pub cover: Option<DynamicImage>,
    pub duration: TrackDuration,
    pub status: TrackStatus,
    /// Derived from the source extension once at creation.
    pub supports_seek: bool,
    /// Whether `playable` is a cache rendition rather than the source.
    pub converted: bool,
    pub(crate) cover_job: Option<CoverJob>,
    pub(crate) convert_job: Option<ConvertJob>,
    /// Probe result kept alive while jobs for this video are in flight.
    pub(crate) video: Option<Arc<VideoHandle>>,
}

impl Track {
    pub(crate) fn new(source: PathBuf, playable: PathBuf, converted: bool) -> Self {
        let supports_seek = media::supports_seek(&source);
        Self {
            source,
            playable,
            cover: None,
            duration: TrackDuration::Uncached,
            status: TrackStatus::Ready,
            supports_seek,
            converted,
            cover_job: None,
            convert_job: None,
            video: None,
        }
    }

    /// Display name: the source file stem.
    pub fn title(&self) -> &str {
        self.source
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("UNKNOWN")
    }

    /// Fold in any finished background work and report the resulting
    /// status. Cheap when nothing is outstanding; meant to run every
    /// tick.
    pub fn check(&mut self) -> TrackStatus {
        if let Some(job) = self.cover_job.take() {
            match job.try_take() {
                Some(Some(cover)) => self.cover = Some(cover),
                Some(None) => {
                    debug!("no cover for {}", self.source.display());
                }
                None => self.cover_job = Some(job),
            }
        }

        if let Some(job) = self.convert_job.take() {
            match job.try_take() {
                Some(Ok(())) => {}
                Some(Err(e)) => match job.policy() {
                    FailurePolicy::Fatal => self.status = TrackStatus::Failed(Arc::new(e)),
                    FailurePolicy::Degrade => {
                        warn!(
                            "conversion of {} failed ({e}), playing the source directly",
                            self.source.display()
                        );
                        self.playable = self.source.clone();
                        self.converted = false;
                    }
                },
                None => self.convert_job = Some(job),
            }
        }

        if self.cover_job.is_none() && self.convert_job.is_none() {
            self.video = None;
            if self.status.is_pending() {
                self.status = TrackStatus::Ready;
            }
        }
        self.status.clone()
    }

    /// Probe and remember the duration. Does nothing once a probe ran,
    /// and does not touch files that are still being converted.
    pub fn cache_duration(&mut self) {
        if !matches!(self.duration, TrackDuration::Uncached) {
            return;
        }
        if let Some(duration) = self.video.as_ref().and_then(|v| v.duration) {
            self.duration = TrackDuration::Seconds(duration);
            return;
        }
        if !self.status.is_ready() {
            return;
        }
        self.duration = match media::probe_duration(&self.playable) {
            Some(secs) => TrackDuration::Seconds(secs),
            None => TrackDuration::Unknown,
        };
    }
}
