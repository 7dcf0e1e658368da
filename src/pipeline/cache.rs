//! Cache directory layout.
//!
//! Cached files are addressed purely by name: `<namespace>_<stem>` under
//! `converted/` for audio renditions and `covers/` for artwork, where
//! the namespace is the owning playlist. Existence of the file IS the
//! cache index, so renames of playlists and tracks migrate files
//! instead of rebuilding them.

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use tracing::warn;

use crate::error::{Error, Result};
use crate::media::{CANONICAL_AUDIO_EXT, COVER_EXT};

#[derive(Debug, Clone)]
pub struct CachePaths {
    root: PathBuf,
}

impl CachePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn converted_dir(&self) -> PathBuf {
        self.root.join("converted")
    }

    pub fn covers_dir(&self) -> PathBuf {
        self.root.join("covers")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        fs::create_dir_all(self.converted_dir())?;
        fs::create_dir_all(self.covers_dir())
    }

    /// Playable rendition of `stem` owned by playlist `namespace`.
    pub fn converted(&self, namespace: &str, stem: &str) -> PathBuf {
        self.converted_dir()
            .join(format!("{namespace}_{stem}.{CANONICAL_AUDIO_EXT}"))
    }

    /// Cover image of `stem` owned by playlist `namespace`.
    pub fn cover(&self, namespace: &str, stem: &str) -> PathBuf {
        self.covers_dir()
            .join(format!("{namespace}_{stem}.{COVER_EXT}"))
    }

    /// Cover image of the playlist itself.
    pub fn playlist_cover(&self, namespace: &str) -> PathBuf {
        self.covers_dir().join(format!("{namespace}.{COVER_EXT}"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("playlists.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.root.join("history.json")
    }

    /// Move every cached file of `old` under the `new` namespace,
    /// including the playlist cover. Files whose target already exists
    /// are left behind rather than overwritten.
    pub fn migrate_namespace(&self, old: &str, new: &str) {
        let prefix = format!("{old}_");
        for dir in [self.converted_dir(), self.covers_dir()] {
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!("could not scan cache dir {}: {e}", dir.display());
                    continue;
                }
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let Some(name) = name.to_str() else { continue };
                let Some(rest) = name.strip_prefix(&prefix) else {
                    continue;
                };
                rename_if_absent(entry.path(), dir.join(format!("{new}_{rest}")));
            }
        }
        rename_if_absent(self.playlist_cover(old), self.playlist_cover(new));
    }

    /// Move the cached files of one track between namespaces.
    pub fn migrate_track(&self, old_ns: &str, new_ns: &str, stem: &str) {
        rename_if_absent(self.converted(old_ns, stem), self.converted(new_ns, stem));
        rename_if_absent(self.cover(old_ns, stem), self.cover(new_ns, stem));
    }

    /// Move the cached files of a renamed track within its namespace.
    pub fn migrate_stem(&self, namespace: &str, old_stem: &str, new_stem: &str) {
        rename_if_absent(
            self.converted(namespace, old_stem),
            self.converted(namespace, new_stem),
        );
        rename_if_absent(
            self.cover(namespace, old_stem),
            self.cover(namespace, new_stem),
        );
    }
}

/// Write `frame` to `dest` as png via a scratch name, so a reader never
/// sees a partial image as a cache hit.
pub(crate) fn write_cover(frame: &DynamicImage, dest: &Path) -> Result<()> {
    let tmp = dest.with_extension("tmp");
    frame
        .save_with_format(&tmp, ImageFormat::Png)
        .map_err(|e| Error::CoverExtraction {
            path: dest.to_path_buf(),
            reason: e.to_string(),
        })?;
    fs::rename(&tmp, dest)?;
    Ok(())
}

fn rename_if_absent(from: PathBuf, to: PathBuf) {
    if !from.exists() || to.exists() {
        return;
    }
    if let Err(e) = fs::rename(&from, &to) {
        warn!(
            "could not move cache file {} to {}: {e}",
            from.display(),
            to.display()
        );
    }
}

/// File stem used for cache addressing.
pub fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "UNKNOWN".into())
}
