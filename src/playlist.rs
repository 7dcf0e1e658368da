//! Playlists: ordered tracks, play groups and the JSON manifest.

mod manifest;
mod model;

pub use manifest::{ManifestEntry, ManifestGroup, PlaylistManifest, load_manifest, save_manifest};
pub use model::{Group, OrderSlot, Playlist};
