use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Settings;
use crate::media;
use crate::pipeline::Pipeline;
use crate::playlist::{self, Playlist};

/// Restore playlists from the manifest, or scan the library when there
/// is nothing usable to restore.
pub fn load_playlists(pipeline: &Pipeline, settings: &Settings) -> Vec<Playlist> {
    let manifest_path = pipeline.cache().manifest_path();
    match playlist::load_manifest(&manifest_path) {
        Ok(manifests) if !manifests.is_empty() => {
            info!("restoring {} playlist(s)", manifests.len());
            manifests
                .iter()
                .map(|manifest| Playlist::restore(manifest, pipeline))
                .collect()
        }
        Ok(_) => vec![scan_library(pipeline, settings)],
        Err(e) => {
            warn!("unreadable manifest at {}: {e}", manifest_path.display());
            vec![scan_library(pipeline, settings)]
        }
    }
}

/// Build one playlist by walking the library directory. Scan order is
/// sorted so repeated scans produce the same playlist.
pub fn scan_library(pipeline: &Pipeline, settings: &Settings) -> Playlist {
    let dir = settings.library_path();
    let name = settings.library.playlist_name.clone().unwrap_or_else(|| {
        dir.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Library".into())
    });

    let mut sources: Vec<_> = WalkDir::new(&dir)
        .follow_links(settings.library.follow_links)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| media::is_importable(path))
        .collect();
    sources.sort();

    let mut playlist = Playlist::new(name);
    for source in sources {
        match pipeline.ingest(&playlist.name, &source, false) {
            Ok(track) => {
                playlist.add(track);
            }
            Err(e) => warn!("skipping {}: {e}", source.display()),
        }
    }
    playlist.load_cover(pipeline.cache());
    info!("scanned {} track(s) from {}", playlist.len(), dir.display());
    playlist
}
