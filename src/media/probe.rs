//! Tag and property probing for native audio files.
//!
//! Both helpers are best-effort: a file with no tags, a broken header or
//! an unsupported codec yields `None` rather than an error, because a
//! track without a duration or a cover is still playable.

use std::path::Path;

use image::DynamicImage;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;

/// Duration in seconds as reported by the container headers, when the
/// file parses and reports a positive duration.
pub fn probe_duration(path: &Path) -> Option<f64> {
    let tagged = Probe::open(path).ok()?.read().ok()?;
    let secs = tagged.properties().duration().as_secs_f64();
    if secs > 0.0 { Some(secs) } else { None }
}

/// First embedded picture decoded to pixels, if the file carries one.
pub fn embedded_cover(path: &Path) -> Option<DynamicImage> {
    let tagged = Probe::open(path).ok()?.read().ok()?;
    let tag = tagged.primary_tag().or_else(|| tagged.first_tag())?;
    let picture = tag.pictures().first()?;
    image::load_from_memory(picture.data()).ok()
}
