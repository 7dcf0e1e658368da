//! Background conversion jobs.
//!
//! Every job is one detached worker thread plus a shared result cell.
//! The worker writes the cell exactly once and exits; the owning track
//! drains it exactly once from [`Track::check`]. Nothing ever joins a
//! worker: dropping a job only drops the cell handle, the thread keeps
//! running and its cache writes still land.
//!
//! [`Track::check`]: crate::track::Track::check

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use image::DynamicImage;
use tracing::debug;

use crate::error::Result;
use crate::media::{AudioHandle, FrameSampler, Transcoder, VideoHandle};

/// What a job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// A cover image for the track.
    Cover,
    /// The playable audio rendition of the track.
    Convert,
}

impl JobKind {
    /// How a failure of this kind of job affects the track. Cover art
    /// is optional, the playable file is not. Callers may override the
    /// table when a fallback rendition exists.
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            JobKind::Cover => FailurePolicy::Degrade,
            JobKind::Convert => FailurePolicy::Fatal,
        }
    }
}

/// Effect of a failed job on its track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Keep the track playable without the job's output.
    Degrade,
    /// Mark the track failed so the owner evicts it.
    Fatal,
}

/// Single-writer result slot shared between a worker and its track.
type Cell<T> = Arc<Mutex<Option<T>>>;

fn new_cell<T>() -> Cell<T> {
    Arc::new(Mutex::new(None))
}

/// Writes `value` into the cell. The worker is the only writer, so a
/// poisoned lock can only mean the draining side panicked; the result
/// is discarded then.
fn publish<T>(cell: &Cell<T>, value: T) {
    if let Ok(mut slot) = cell.lock() {
        *slot = Some(value);
    }
}

fn drain<T>(cell: &Cell<T>) -> Option<T> {
    match cell.lock() {
        Ok(mut slot) => slot.take(),
        Err(_) => None,
    }
}

/// Handle to an in-flight cover extraction. The payload is `None` when
/// the video yielded no usable frame.
#[derive(Debug)]
pub struct CoverJob {
    cell: Cell<Option<DynamicImage>>,
}

impl CoverJob {
    /// Take the result if the worker has finished.
    pub(crate) fn try_take(&self) -> Option<Option<DynamicImage>> {
        drain(&self.cell)
    }

    #[cfg(test)]
    pub(crate) fn completed(cover: Option<DynamicImage>) -> Self {
        let cell = new_cell();
        publish(&cell, cover);
        Self { cell }
    }

    #[cfg(test)]
    pub(crate) fn outstanding() -> Self {
        Self { cell: new_cell() }
    }
}

/// Handle to an in-flight audio conversion.
#[derive(Debug)]
pub struct ConvertJob {
    cell: Cell<Result<()>>,
    policy: FailurePolicy,
}

impl ConvertJob {
    pub(crate) fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Take the result if the worker has finished.
    pub(crate) fn try_take(&self) -> Option<Result<()>> {
        drain(&self.cell)
    }

    #[cfg(test)]
    pub(crate) fn completed(result: Result<()>, policy: FailurePolicy) -> Self {
        let cell = new_cell();
        publish(&cell, result);
        Self { cell, policy }
    }

    #[cfg(test)]
    pub(crate) fn outstanding(policy: FailurePolicy) -> Self {
        Self { cell: new_cell(), policy }
    }
}

/// Sample one frame out of `video` and cache it at `dest` as png.
///
/// The frame is taken from the middle of the video when the duration is
/// known, from the first frame otherwise. Sampling failures publish
/// `None`; a failed cache write still publishes the frame.
pub(crate) fn spawn_cover_job(
    sampler: Arc<dyn FrameSampler>,
    video: Arc<VideoHandle>,
    dest: PathBuf,
) -> CoverJob {
    let cell = new_cell();
    let slot = Arc::clone(&cell);
    thread::spawn(move || {
        let at = video.duration.map(|d| d / 2.0).unwrap_or(0.0);
        match sampler.sample_frame(&video, at) {
            Ok(frame) => {
                if let Err(e) = super::cache::write_cover(&frame, &dest) {
                    debug!("could not cache cover at {}: {e}", dest.display());
                }
                publish(&slot, Some(frame));
            }
            Err(e) => {
                debug!("no cover frame from {}: {e}", video.path.display());
                publish(&slot, None);
            }
        }
    });
    CoverJob { cell }
}

/// Transcode `audio` into `dest` and publish the outcome.
pub(crate) fn spawn_convert_job(
    transcoder: Arc<dyn Transcoder>,
    audio: AudioHandle,
    dest: PathBuf,
    policy: FailurePolicy,
) -> ConvertJob {
    let cell = new_cell();
    let slot = Arc::clone(&cell);
    thread::spawn(move || {
        publish(&slot, transcoder.write_audio_file(&audio, &dest));
    });
    ConvertJob { cell, policy }
}
