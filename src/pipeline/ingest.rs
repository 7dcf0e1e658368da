//! Turning files into tracks.
//!
//! [`Pipeline::ingest`] is the single entry point: it looks up cached
//! renditions by name, spawns whatever jobs are still missing, and
//! returns a [`Track`] immediately. A cold video import comes back
//! `Pending` with jobs attached; everything the cache already holds
//! comes back `Ready` with no thread spawned at all.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::media::{self, AudioHandle, FrameSampler, Transcoder};
use crate::pipeline::cache::{self, CachePaths};
use crate::pipeline::jobs::{self, FailurePolicy, JobKind};
use crate::track::{Track, TrackStatus};

pub struct Pipeline {
    cache: CachePaths,
    sampler: Arc<dyn FrameSampler>,
    transcoder: Arc<dyn Transcoder>,
}

impl Pipeline {
    pub fn new(
        cache_root: impl Into<PathBuf>,
        sampler: Arc<dyn FrameSampler>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Result<Self> {
        let cache = CachePaths::new(cache_root);
        cache.ensure_dirs()?;
        Ok(Self {
            cache,
            sampler,
            transcoder,
        })
    }

    pub fn cache(&self) -> &CachePaths {
        &self.cache
    }

    /// Build a track for `source` inside playlist `namespace`.
    ///
    /// `converted_hint` marks sources whose canonical rendition should
    /// be adopted when the cache still has it (set from the manifest).
    /// Fails synchronously when the source is missing or a video has no
    /// audio stream; conversion work itself is reported later through
    /// [`Track::check`].
    pub fn ingest(&self, namespace: &str, source: &Path, converted_hint: bool) -> Result<Track> {
        if !source.exists() {
            return Err(Error::MissingSource(source.to_path_buf()));
        }
        if media::needs_conversion(source) {
            self.ingest_video(namespace, source)
        } else {
            Ok(self.ingest_audio(namespace, source, converted_hint))
        }
    }

    fn ingest_video(&self, namespace: &str, source: &Path) -> Result<Track> {
        let stem = cache::stem_of(source);
        let target = self.cache.converted(namespace, &stem);
        let cover_path = self.cache.cover(namespace, &stem);
        let need_convert = !target.exists();
        let need_cover = !cover_path.exists();

        let mut track = Track::new(source.to_path_buf(), target.clone(), true);
        if !need_convert && !need_cover {
            track.cover = load_cover(&cover_path);
            return Ok(track);
        }

        let video = match self.sampler.open_video(source) {
            Ok(video) => Arc::new(video),
            Err(e) if need_convert => return Err(e),
            Err(e) => {
                // Playable rendition is cached; losing the cover is fine.
                warn!("could not reopen {} for its cover: {e}", source.display());
                return Ok(track);
            }
        };

        if need_convert {
            let audio = self.transcoder.open_audio_track(&video)?;
            track.convert_job = Some(jobs::spawn_convert_job(
                Arc::clone(&self.transcoder),
                audio,
                target,
                JobKind::Convert.failure_policy(),
            ));
        }
        if need_cover {
            track.cover_job = Some(jobs::spawn_cover_job(
                Arc::clone(&self.sampler),
                Arc::clone(&video),
                cover_path,
            ));
        } else {
            track.cover = load_cover(&cover_path);
        }
        // At least one job was spawned to get here; pending until every
        // one of them has drained through `check`.
        track.status = TrackStatus::Pending;
        track.video = Some(video);
        Ok(track)
    }

    fn ingest_audio(&self, namespace: &str, source: &Path, converted_hint: bool) -> Track {
        let stem = cache::stem_of(source);
        let mut track = if converted_hint {
            let target = self.cache.converted(namespace, &stem);
            if target.exists() {
                Track::new(source.to_path_buf(), target, true)
            } else {
                warn!(
                    "converted rendition of {} is gone, using the source",
                    source.display()
                );
                Track::new(source.to_path_buf(), source.to_path_buf(), false)
            }
        } else {
            Track::new(source.to_path_buf(), source.to_path_buf(), false)
        };

        let cover_path = self.cache.cover(namespace, &stem);
        track.cover = load_cover(&cover_path).or_else(|| {
            let cover = media::embedded_cover(source)?;
            if let Err(e) = cache::write_cover(&cover, &cover_path) {
                debug!("could not cache cover at {}: {e}", cover_path.display());
            }
            Some(cover)
        });
        track
    }

    /// Convert a natively-playable track into its canonical rendition.
    ///
    /// No-op for videos (already canonical) and while a job is in
    /// flight. The track switches to the cache path right away; if the
    /// conversion fails it silently falls back to the source on the
    /// next [`Track::check`].
    pub fn reconvert(&self, namespace: &str, track: &mut Track) {
        if track.convert_job.is_some() || media::is_video(&track.source) {
            return;
        }
        let stem = cache::stem_of(&track.source);
        let target = self.cache.converted(namespace, &stem);
        track.playable = target.clone();
        track.converted = true;
        if target.exists() {
            return;
        }
        track.status = TrackStatus::Pending;
        track.convert_job = Some(jobs::spawn_convert_job(
            Arc::clone(&self.transcoder),
            AudioHandle::new(&track.source),
            target,
            FailurePolicy::Degrade,
        ));
    }
}

fn load_cover(path: &Path) -> Option<DynamicImage> {
    if path.exists() {
        image::open(path).ok()
    } else {
        None
    }
}
