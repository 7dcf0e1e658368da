use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use image::DynamicImage;

use super::*;
use crate::error::{Error, Result};
use crate::media::{AudioHandle, FrameSampler, Transcoder, VideoHandle};
use crate::track::{Track, TrackStatus};

#[derive(Default)]
struct FakeSampler {
    opens: AtomicUsize,
    samples: AtomicUsize,
    fail_open: bool,
    fail_sample: bool,
    no_audio: bool,
}

impl FrameSampler for FakeSampler {
    fn open_video(&self, path: &Path) -> Result<VideoHandle> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail_open {
            return Err(Error::Probe {
                path: path.to_path_buf(),
                reason: "probe refused".into(),
            });
        }
        Ok(VideoHandle {
            path: path.to_path_buf(),
            duration: Some(10.0),
            has_audio: !self.no_audio,
        })
    }

    fn sample_frame(&self, video: &VideoHandle, _at: f64) -> Result<DynamicImage> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        if self.fail_sample {
            return Err(Error::CoverExtraction {
                path: video.path.clone(),
                reason: "no frame".into(),
            });
        }
        Ok(DynamicImage::new_rgb8(2, 2))
    }
}

#[derive(Default)]
struct FakeTranscoder {
    writes: AtomicUsize,
    fail_write: bool,
    delay: Option<Duration>,
}

impl Transcoder for FakeTranscoder {
    fn open_audio_track(&self, video: &VideoHandle) -> Result<AudioHandle> {
        if !video.has_audio {
            return Err(Error::NoAudioTrack(video.path.clone()));
        }
        Ok(AudioHandle::new(&video.path))
    }

    fn write_audio_file(&self, audio: &AudioHandle, dest: &Path) -> Result<()> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_write {
            return Err(Error::ConversionFailed {
                path: audio.path().to_path_buf(),
                reason: "encoder exploded".into(),
            });
        }
        fs::write(dest, b"converted audio")?;
        Ok(())
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    media: PathBuf,
    pipeline: Pipeline,
    sampler: Arc<FakeSampler>,
    transcoder: Arc<FakeTranscoder>,
}

fn fixture() -> Fixture {
    fixture_with(FakeSampler::default(), FakeTranscoder::default())
}

fn fixture_with(sampler: FakeSampler, transcoder: FakeTranscoder) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let media = dir.path().join("media");
    fs::create_dir_all(&media).unwrap();
    let sampler = Arc::new(sampler);
    let transcoder = Arc::new(transcoder);
    let pipeline = Pipeline::new(
        dir.path().join("cache"),
        Arc::clone(&sampler) as Arc<dyn FrameSampler>,
        Arc::clone(&transcoder) as Arc<dyn Transcoder>,
    )
    .unwrap();
    Fixture {
        _dir: dir,
        media,
        pipeline,
        sampler,
        transcoder,
    }
}

impl Fixture {
    fn media_file(&self, name: &str) -> PathBuf {
        let path = self.media.join(name);
        fs::write(&path, b"media bytes").unwrap();
        path
    }
}

/// Poll `check` until every job has drained.
fn settle(track: &mut Track) -> TrackStatus {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let status = track.check();
        if track.cover_job.is_none() && track.convert_job.is_none() {
            return status;
        }
        if Instant::now() > deadline {
            panic!("jobs did not settle in time");
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn wait_for_file(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !path.exists() {
        if Instant::now() > deadline {
            panic!("{} never appeared", path.display());
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn job_kind_failure_policies() {
    assert_eq!(JobKind::Cover.failure_policy(), FailurePolicy::Degrade);
    assert_eq!(JobKind::Convert.failure_policy(), FailurePolicy::Fatal);
}

#[test]
fn cache_layout_is_name_addressed() {
    let cache = CachePaths::new("/tmp/vivace");
    assert!(cache.converted("Mix", "clip").ends_with("converted/Mix_clip.mp3"));
    assert!(cache.cover("Mix", "clip").ends_with("covers/Mix_clip.png"));
    assert!(cache.playlist_cover("Mix").ends_with("covers/Mix.png"));
    assert!(cache.manifest_path().ends_with("playlists.json"));
    assert!(cache.history_path().ends_with("history.json"));
}

#[test]
fn stems_keep_spaces_and_drop_extensions() {
    assert_eq!(stem_of(Path::new("/m/Morning Mix.mp3")), "Morning Mix");
    assert_eq!(stem_of(Path::new("clip.MP4")), "clip");
    assert_eq!(stem_of(Path::new("/")), "UNKNOWN");
}

#[test]
fn native_audio_is_ready_with_no_jobs() {
    let fx = fixture();
    let source = fx.media_file("song.mp3");

    let track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    assert!(track.status.is_ready());
    assert_eq!(track.playable, source);
    assert!(!track.converted);
    assert!(track.supports_seek);
    assert!(track.cover_job.is_none() && track.convert_job.is_none());
    assert_eq!(fx.sampler.opens.load(Ordering::SeqCst), 0);
    assert_eq!(fx.transcoder.writes.load(Ordering::SeqCst), 0);
}

#[test]
fn wav_plays_natively_but_cannot_seek() {
    let fx = fixture();
    let source = fx.media_file("take.wav");

    let track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    assert!(track.status.is_ready());
    assert_eq!(track.playable, source);
    assert!(!track.supports_seek);
}

#[test]
fn cold_video_ingest_converts_and_samples_a_cover() {
    let fx = fixture();
    let source = fx.media_file("clip.mp4");
    let target = fx.pipeline.cache().converted("Mix", "clip");

    let mut track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    assert!(track.status.is_pending());
    assert!(track.converted);
    assert_eq!(track.playable, target);

    assert!(settle(&mut track).is_ready());
    assert!(track.cover.is_some());
    assert!(track.video.is_none(), "probe handle released");
    assert!(target.exists());
    assert!(fx.pipeline.cache().cover("Mix", "clip").exists());
    assert_eq!(fx.sampler.opens.load(Ordering::SeqCst), 1);
    assert_eq!(fx.sampler.samples.load(Ordering::SeqCst), 1);
    assert_eq!(fx.transcoder.writes.load(Ordering::SeqCst), 1);
}

#[test]
fn warm_cache_hit_spawns_nothing() {
    let fx = fixture();
    let source = fx.media_file("clip.mp4");

    let mut first = fx.pipeline.ingest("Mix", &source, false).unwrap();
    settle(&mut first);

    let track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    assert!(track.status.is_ready());
    assert!(track.cover.is_some(), "cover comes from the cache");
    assert!(track.cover_job.is_none() && track.convert_job.is_none());
    assert_eq!(fx.sampler.opens.load(Ordering::SeqCst), 1, "no second probe");
    assert_eq!(fx.transcoder.writes.load(Ordering::SeqCst), 1);
}

#[test]
fn partial_cache_hit_only_spawns_the_missing_job() {
    let fx = fixture();
    let source = fx.media_file("clip.mp4");
    fs::write(fx.pipeline.cache().converted("Mix", "clip"), b"already there").unwrap();

    let mut track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    assert!(track.status.is_pending(), "pending until the cover job drains");
    assert!(track.convert_job.is_none());
    assert!(track.cover_job.is_some());

    assert!(settle(&mut track).is_ready());
    assert!(track.cover.is_some());
    assert_eq!(fx.transcoder.writes.load(Ordering::SeqCst), 0);
    assert_eq!(fx.sampler.samples.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_source_is_rejected() {
    let fx = fixture();
    let err = fx
        .pipeline
        .ingest("Mix", Path::new("/nonexistent/clip.mp4"), false)
        .unwrap_err();
    assert!(matches!(err, Error::MissingSource(_)));
}

#[test]
fn video_without_audio_fails_synchronously() {
    let fx = fixture_with(
        FakeSampler {
            no_audio: true,
            ..FakeSampler::default()
        },
        FakeTranscoder::default(),
    );
    let source = fx.media_file("mute.mp4");

    let err = fx.pipeline.ingest("Mix", &source, false).unwrap_err();
    assert!(matches!(err, Error::NoAudioTrack(_)));
    assert_eq!(fx.transcoder.writes.load(Ordering::SeqCst), 0);
}

#[test]
fn probe_failure_on_a_cold_video_is_an_error() {
    let fx = fixture_with(
        FakeSampler {
            fail_open: true,
            ..FakeSampler::default()
        },
        FakeTranscoder::default(),
    );
    let source = fx.media_file("clip.mp4");

    let err = fx.pipeline.ingest("Mix", &source, false).unwrap_err();
    assert!(matches!(err, Error::Probe { .. }));
}

#[test]
fn probe_failure_with_a_cached_rendition_only_costs_the_cover() {
    let fx = fixture_with(
        FakeSampler {
            fail_open: true,
            ..FakeSampler::default()
        },
        FakeTranscoder::default(),
    );
    let source = fx.media_file("clip.mp4");
    fs::write(fx.pipeline.cache().converted("Mix", "clip"), b"cached").unwrap();

    let track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    assert!(track.status.is_ready());
    assert!(track.cover.is_none());
    assert!(track.cover_job.is_none() && track.convert_job.is_none());
}

#[test]
fn failed_conversion_marks_the_track_failed() {
    let fx = fixture_with(
        FakeSampler::default(),
        FakeTranscoder {
            fail_write: true,
            ..FakeTranscoder::default()
        },
    );
    let source = fx.media_file("clip.mp4");

    let mut track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    assert!(settle(&mut track).is_failed());
}

#[test]
fn failed_cover_sampling_degrades_to_no_art() {
    let fx = fixture_with(
        FakeSampler {
            fail_sample: true,
            ..FakeSampler::default()
        },
        FakeTranscoder::default(),
    );
    let source = fx.media_file("clip.mp4");

    let mut track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    assert!(settle(&mut track).is_ready());
    assert!(track.cover.is_none());
    assert!(track.playable.exists());
}

#[test]
fn reconvert_switches_to_the_canonical_rendition() {
    let fx = fixture();
    let source = fx.media_file("song.mp3");
    let target = fx.pipeline.cache().converted("Mix", "song");

    let mut track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    fx.pipeline.reconvert("Mix", &mut track);
    assert!(track.status.is_pending());
    assert!(track.converted);
    assert_eq!(track.playable, target);

    assert!(settle(&mut track).is_ready());
    assert!(track.converted);
    assert!(target.exists());
}

#[test]
fn failed_reconvert_falls_back_to_the_source() {
    let fx = fixture_with(
        FakeSampler::default(),
        FakeTranscoder {
            fail_write: true,
            ..FakeTranscoder::default()
        },
    );
    let source = fx.media_file("song.mp3");

    let mut track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    fx.pipeline.reconvert("Mix", &mut track);

    assert!(settle(&mut track).is_ready(), "fallback keeps the track usable");
    assert_eq!(track.playable, source);
    assert!(!track.converted);
}

#[test]
fn reconvert_is_a_no_op_for_videos_and_in_flight_jobs() {
    let fx = fixture();
    let source = fx.media_file("clip.mp4");

    let mut track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    settle(&mut track);
    fx.pipeline.reconvert("Mix", &mut track);
    assert!(track.convert_job.is_none());
    assert_eq!(fx.transcoder.writes.load(Ordering::SeqCst), 1);
}

#[test]
fn reconvert_adopts_an_existing_rendition_without_working() {
    let fx = fixture();
    let source = fx.media_file("song.mp3");
    let target = fx.pipeline.cache().converted("Mix", "song");
    fs::write(&target, b"already converted").unwrap();

    let mut track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    fx.pipeline.reconvert("Mix", &mut track);
    assert!(track.status.is_ready());
    assert_eq!(track.playable, target);
    assert!(track.converted);
    assert!(track.convert_job.is_none());
}

#[test]
fn converted_hint_adopts_the_cached_rendition() {
    let fx = fixture();
    let source = fx.media_file("song.mp3");
    let target = fx.pipeline.cache().converted("Mix", "song");
    fs::write(&target, b"cached rendition").unwrap();

    let track = fx.pipeline.ingest("Mix", &source, true).unwrap();
    assert_eq!(track.playable, target);
    assert!(track.converted);
}

#[test]
fn converted_hint_without_a_rendition_falls_back_to_the_source() {
    let fx = fixture();
    let source = fx.media_file("song.mp3");

    let track = fx.pipeline.ingest("Mix", &source, true).unwrap();
    assert_eq!(track.playable, source);
    assert!(!track.converted);
}

#[test]
fn cached_cover_is_loaded_for_native_audio() {
    let fx = fixture();
    let source = fx.media_file("song.mp3");
    DynamicImage::new_rgb8(2, 2)
        .save_with_format(fx.pipeline.cache().cover("Mix", "song"), image::ImageFormat::Png)
        .unwrap();

    let track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    assert!(track.cover.is_some());
}

#[test]
fn dropping_a_track_does_not_cancel_its_conversion() {
    let fx = fixture_with(
        FakeSampler::default(),
        FakeTranscoder {
            delay: Some(Duration::from_millis(50)),
            ..FakeTranscoder::default()
        },
    );
    let source = fx.media_file("clip.mp4");
    let target = fx.pipeline.cache().converted("Mix", "clip");

    let track = fx.pipeline.ingest("Mix", &source, false).unwrap();
    drop(track);

    wait_for_file(&target);
    assert_eq!(fx.transcoder.writes.load(Ordering::SeqCst), 1);
}

#[test]
fn renaming_a_namespace_moves_cached_files() {
    let fx = fixture();
    let cache = fx.pipeline.cache();
    fs::write(cache.converted("Old", "a"), b"a").unwrap();
    fs::write(cache.cover("Old", "a"), b"art").unwrap();
    fs::write(cache.playlist_cover("Old"), b"playlist art").unwrap();
    fs::write(cache.converted("Other", "b"), b"b").unwrap();

    cache.migrate_namespace("Old", "New");

    assert!(cache.converted("New", "a").exists());
    assert!(cache.cover("New", "a").exists());
    assert!(cache.playlist_cover("New").exists());
    assert!(!cache.converted("Old", "a").exists());
    assert!(cache.converted("Other", "b").exists(), "other namespaces untouched");
}

#[test]
fn namespace_migration_never_overwrites() {
    let fx = fixture();
    let cache = fx.pipeline.cache();
    fs::write(cache.converted("Old", "a"), b"from old").unwrap();
    fs::write(cache.converted("New", "a"), b"already new").unwrap();

    cache.migrate_namespace("Old", "New");

    assert_eq!(fs::read(cache.converted("New", "a")).unwrap(), b"already new");
    assert!(cache.converted("Old", "a").exists(), "loser stays put");
}

#[test]
fn single_track_migrations_move_both_renditions() {
    let fx = fixture();
    let cache = fx.pipeline.cache();
    fs::write(cache.converted("A", "song"), b"audio").unwrap();
    fs::write(cache.cover("A", "song"), b"art").unwrap();

    cache.migrate_track("A", "B", "song");
    assert!(cache.converted("B", "song").exists());
    assert!(cache.cover("B", "song").exists());
    assert!(!cache.converted("A", "song").exists());

    cache.migrate_stem("B", "song", "anthem");
    assert!(cache.converted("B", "anthem").exists());
    assert!(cache.cover("B", "anthem").exists());
}
