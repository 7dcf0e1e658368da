//! Playlist persistence.
//!
//! The manifest stores source paths, not cache paths: a plain string
//! entry is played from the source, a `[path, "converted"]` pair asks
//! the next session to adopt the converted rendition again. Group
//! membership is stored as indices into `paths`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::playlist::model::Playlist;

/// One track entry, either a bare source path or a path tagged with how
/// it was being played.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    Path(PathBuf),
    Tagged(PathBuf, String),
}

impl ManifestEntry {
    pub fn source(&self) -> &Path {
        match self {
            ManifestEntry::Path(path) => path,
            ManifestEntry::Tagged(path, _) => path,
        }
    }

    pub fn converted(&self) -> bool {
        matches!(self, ManifestEntry::Tagged(_, tag) if tag == "converted")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestGroup {
    pub name: String,
    #[serde(rename = "memberIndices")]
    pub member_indices: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistManifest {
    pub name: String,
    pub paths: Vec<ManifestEntry>,
    #[serde(default)]
    pub groups: Vec<ManifestGroup>,
}

/// Read all playlist manifests. A missing file is an empty library, a
/// malformed one is an error the caller decides about.
pub fn load_manifest(path: &Path) -> Result<Vec<PlaylistManifest>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

pub fn save_manifest(path: &Path, manifests: &[PlaylistManifest]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, serde_json::to_string_pretty(manifests)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl Playlist {
    pub fn to_manifest(&self) -> PlaylistManifest {
        let paths = self
            .tracks()
            .iter()
            .map(|track| {
                if track.converted {
                    ManifestEntry::Tagged(track.source.clone(), "converted".into())
                } else {
                    ManifestEntry::Path(track.source.clone())
                }
            })
            .collect();
        let groups = self
            .groups()
            .iter()
            .map(|group| ManifestGroup {
                name: group.name.clone(),
                member_indices: group
                    .members()
                    .iter()
                    .filter_map(|member| self.position_of(member))
                    .collect(),
            })
            .collect();
        PlaylistManifest {
            name: self.name.clone(),
            paths,
            groups,
        }
    }

    /// Re-ingest every entry of `manifest`. Entries that fail (vanished
    /// sources, mute videos) are skipped with a warning and must not
    /// shift the group membership of the survivors.
    pub fn restore(manifest: &PlaylistManifest, pipeline: &Pipeline) -> Playlist {
        let mut playlist = Playlist::new(manifest.name.clone());

        // Resolve membership indices against the manifest before any
        // entry can fail out of the restored list.
        let memberships: Vec<(String, Vec<PathBuf>)> = manifest
            .groups
            .iter()
            .map(|group| {
                let members = group
                    .member_indices
                    .iter()
                    .filter_map(|&i| manifest.paths.get(i))
                    .map(|entry| entry.source().to_path_buf())
                    .collect();
                (group.name.clone(), members)
            })
            .collect();

        for entry in &manifest.paths {
            match pipeline.ingest(&manifest.name, entry.source(), entry.converted()) {
                Ok(track) => {
                    playlist.add(track);
                }
                Err(e) => warn!("skipping {}: {e}", entry.source().display()),
            }
        }
        for (name, members) in memberships {
            for member in members {
                playlist.assign_group(&member, Some(&name));
            }
        }
        playlist.load_cover(pipeline.cache());
        playlist
    }
}
