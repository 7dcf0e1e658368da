//! Video probing and frame extraction.
//!
//! [`FrameSampler`] is the seam between the pipeline and ffmpeg: cover
//! jobs only ever talk to the trait, so tests can substitute a fake and
//! the real implementation can shell out. [`FfmpegSampler`] runs the
//! `ffprobe` and `ffmpeg` binaries from `PATH` as short-lived
//! subprocesses, the same way the conversion side does.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::{env, fs};

use image::DynamicImage;

use crate::error::{Error, Result};

/// Probed facts about a video file, gathered once per ingest and shared
/// with every job spawned for it.
#[derive(Debug, Clone)]
pub struct VideoHandle {
    pub path: PathBuf,
    /// Container duration in seconds, when the probe reported one.
    pub duration: Option<f64>,
    /// Whether any stream in the container is an audio stream.
    pub has_audio: bool,
}

/// Probes video containers and decodes single frames out of them.
pub trait FrameSampler: Send + Sync {
    /// Inspect `path` and report duration and audio presence.
    fn open_video(&self, path: &Path) -> Result<VideoHandle>;

    /// Decode one frame at `at` seconds into the video.
    fn sample_frame(&self, video: &VideoHandle, at: f64) -> Result<DynamicImage>;
}

/// Sampler backed by the `ffprobe` and `ffmpeg` binaries.
pub struct FfmpegSampler;

impl FrameSampler for FfmpegSampler {
    fn open_video(&self, path: &Path) -> Result<VideoHandle> {
        let output = Command::new("ffprobe")
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output()
            .map_err(|e| Error::Probe {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if !output.status.success() {
            return Err(Error::Probe {
                path: path.to_path_buf(),
                reason: format!("ffprobe exited with {}", output.status),
            });
        }

        let probed: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| Error::Probe {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let duration = probed["format"]["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| *d > 0.0);
        let has_audio = probed["streams"]
            .as_array()
            .map(|streams| {
                streams
                    .iter()
                    .any(|s| s["codec_type"].as_str() == Some("audio"))
            })
            .unwrap_or(false);

        Ok(VideoHandle {
            path: path.to_path_buf(),
            duration,
            has_audio,
        })
    }

    fn sample_frame(&self, video: &VideoHandle, at: f64) -> Result<DynamicImage> {
        let tmp = scratch_frame_path();
        let status = Command::new("ffmpeg")
            .args(["-y", "-v", "quiet"])
            .args(["-ss", &format!("{at:.3}")])
            .arg("-i")
            .arg(&video.path)
            .args(["-frames:v", "1"])
            .arg(&tmp)
            .status()
            .map_err(|e| Error::CoverExtraction {
                path: video.path.clone(),
                reason: e.to_string(),
            })?;
        if !status.success() {
            let _ = fs::remove_file(&tmp);
            return Err(Error::CoverExtraction {
                path: video.path.clone(),
                reason: format!("ffmpeg exited with {status}"),
            });
        }

        let frame = image::open(&tmp).map_err(|e| Error::CoverExtraction {
            path: video.path.clone(),
            reason: e.to_string(),
        });
        let _ = fs::remove_file(&tmp);
        frame
    }
}

/// A per-call scratch file under the system temp dir. ffmpeg picks the
/// encoder from the extension, so it has to end in `.png`.
fn scratch_frame_path() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    env::temp_dir().join(format!("vivace-frame-{}-{nanos}.png", std::process::id()))
}
