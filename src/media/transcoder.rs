//! Audio extraction from video containers.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::media::sampler::VideoHandle;

/// An audio stream selected for transcoding. Opening one is cheap and
/// synchronous; the actual decode happens in [`Transcoder::write_audio_file`].
#[derive(Debug, Clone)]
pub struct AudioHandle {
    path: PathBuf,
}

impl AudioHandle {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Extracts the audio track of a video into a canonical audio file.
pub trait Transcoder: Send + Sync {
    /// Select the audio stream of `video`. Fails synchronously when the
    /// container has none, before any job is spawned.
    fn open_audio_track(&self, video: &VideoHandle) -> Result<AudioHandle>;

    /// Decode and re-encode the stream into `dest`. `dest` must not be
    /// left half-written on failure.
    fn write_audio_file(&self, audio: &AudioHandle, dest: &Path) -> Result<()>;
}

/// Transcoder backed by the `ffmpeg` binary.
pub struct FfmpegTranscoder;

impl Transcoder for FfmpegTranscoder {
    fn open_audio_track(&self, video: &VideoHandle) -> Result<AudioHandle> {
        if !video.has_audio {
            return Err(Error::NoAudioTrack(video.path.clone()));
        }
        Ok(AudioHandle::new(&video.path))
    }

    fn write_audio_file(&self, audio: &AudioHandle, dest: &Path) -> Result<()> {
        // Write to a scratch name first so a crash mid-encode never
        // leaves a half-written file where the cache index would find it.
        let tmp = dest.with_extension("tmp");
        let status = Command::new("ffmpeg")
            .args(["-y", "-v", "quiet"])
            .arg("-i")
            .arg(audio.path())
            .args(["-vn", "-codec:a", "libmp3lame", "-q:a", "2", "-f", "mp3"])
            .arg(&tmp)
            .status()
            .map_err(|e| Error::ConversionFailed {
                path: audio.path().to_path_buf(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            let _ = fs::remove_file(&tmp);
            return Err(Error::ConversionFailed {
                path: audio.path().to_path_buf(),
                reason: format!("ffmpeg exited with {status}"),
            });
        }

        fs::rename(&tmp, dest).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            Error::ConversionFailed {
                path: audio.path().to_path_buf(),
                reason: e.to_string(),
            }
        })
    }
}
