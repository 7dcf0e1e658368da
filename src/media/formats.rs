//! Format capability tables.
//!
//! Everything downstream keys off the lowercased file extension: whether
//! a file is picked up by library scans, whether it needs a conversion
//! pass before the audio engine can play it, and whether the engine can
//! seek inside it.

use std::path::Path;

/// Extensions accepted by library scans and explicit imports.
pub const IMPORT_EXTENSIONS: [&str; 9] = [
    "mp4", "wav", "mp3", "ogg", "flac", "opus", "wv", "mod", "aiff",
];

/// Importable extensions that carry a video stream and have to be
/// transcoded before playback.
pub const VIDEO_EXTENSIONS: [&str; 1] = ["mp4"];

/// Extensions the audio engine can seek inside. Source extension, not
/// the playable one: a converted mp4 keeps reporting mp4 capabilities.
pub const SEEKABLE_EXTENSIONS: [&str; 5] = ["mp4", "mp3", "ogg", "flac", "mod"];

/// Target extension of the conversion pass.
pub const CANONICAL_AUDIO_EXT: &str = "mp3";

/// Extension of cached cover images.
pub const COVER_EXT: &str = "png";

/// Lowercased extension of `path`, or an empty string when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

pub fn is_importable(path: &Path) -> bool {
    IMPORT_EXTENSIONS.contains(&extension_of(path).as_str())
}

pub fn is_video(path: &Path) -> bool {
    VIDEO_EXTENSIONS.contains(&extension_of(path).as_str())
}

pub fn supports_seek(path: &Path) -> bool {
    SEEKABLE_EXTENSIONS.contains(&extension_of(path).as_str())
}

/// Whether playback requires the converted rendition instead of the
/// source file itself.
pub fn needs_conversion(path: &Path) -> bool {
    is_video(path)
}
