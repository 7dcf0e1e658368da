//! Media inspection and conversion backends.
//!
//! [`formats`] decides what a file is from its extension; [`probe`]
//! reads tags out of native audio files; [`sampler`] and [`transcoder`]
//! wrap the ffmpeg tools behind traits so the pipeline never depends on
//! the binaries directly.

mod formats;
mod probe;
mod sampler;
mod transcoder;

pub use formats::{
    CANONICAL_AUDIO_EXT, COVER_EXT, IMPORT_EXTENSIONS, SEEKABLE_EXTENSIONS, VIDEO_EXTENSIONS,
    extension_of, is_importable, is_video, needs_conversion, supports_seek,
};
pub use probe::{embedded_cover, probe_duration};
pub use sampler::{FfmpegSampler, FrameSampler, VideoHandle};
pub use transcoder::{AudioHandle, FfmpegTranscoder, Transcoder};
