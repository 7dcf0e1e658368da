//! Playlists, groups and play order.
//!
//! A playlist owns its tracks and doubles as the cache namespace for
//! their converted renditions, so renaming one migrates cache files.
//! Groups are named subsets of a playlist that play as a block: the
//! shuffled order keeps group members adjacent, anchored wherever the
//! first member lands. A track belongs to at most one group, and group
//! membership follows the track around (removal, renames) or dies with
//! it.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::DynamicImage;
use tracing::warn;

use crate::error::{Error, Result};
use crate::pipeline::{CachePaths, stem_of};
use crate::track::{Track, TrackStatus};

/// A named block of tracks inside one playlist.
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    members: Vec<PathBuf>,
}

impl Group {
    /// Member source paths, in assignment order.
    pub fn members(&self) -> &[PathBuf] {
        &self.members
    }
}

/// One step of a play order: either a lone track or a whole group
/// spliced in at the position of its first member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderSlot {
    Track(usize),
    Group { group: usize, members: Vec<usize> },
}

pub struct Playlist {
    pub name: String,
    tracks: Vec<Track>,
    groups: Vec<Group>,
    pub cover: Option<DynamicImage>,
}

impl Playlist {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
            groups: Vec::new(),
            cover: None,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut Track> {
        self.tracks.get_mut(index)
    }

    pub fn position_of(&self, source: &Path) -> Option<usize> {
        self.tracks.iter().position(|t| t.source.as_path() == source)
    }

    /// Whether `path` already identifies a track here, by source or
    /// playable path. Falls back to canonicalized comparison so the
    /// same file reached through a different prefix still matches.
    pub fn contains(&self, path: &Path) -> bool {
        if self
            .tracks
            .iter()
            .any(|t| t.source.as_path() == path || t.playable.as_path() == path)
        {
            return true;
        }
        let Ok(canonical) = path.canonicalize() else {
            return false;
        };
        self.tracks.iter().any(|t| {
            t.source.canonicalize().is_ok_and(|c| c == canonical)
                || t.playable.canonicalize().is_ok_and(|c| c == canonical)
        })
    }

    /// Append a track unless its source is already present.
    pub fn add(&mut self, track: Track) -> bool {
        if self.contains(&track.source) {
            return false;
        }
        self.tracks.push(track);
        true
    }

    /// Remove a track and its group membership. Groups left empty are
    /// dropped with it.
    pub fn remove(&mut self, source: &Path) -> Option<Track> {
        let index = self.position_of(source)?;
        let track = self.tracks.remove(index);
        for group in &mut self.groups {
            group.members.retain(|m| m != &track.source);
        }
        self.groups.retain(|g| !g.members.is_empty());
        Some(track)
    }

    /// Move the track at `from` so it ends up at `to`.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        if from >= self.tracks.len() || to >= self.tracks.len() {
            return false;
        }
        let track = self.tracks.remove(from);
        self.tracks.insert(to, track);
        true
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group_of(&self, source: &Path) -> Option<&str> {
        self.group_index_of(source)
            .map(|i| self.groups[i].name.as_str())
    }

    fn group_index_of(&self, source: &Path) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.members.iter().any(|m| m.as_path() == source))
    }

    /// Put the track into the named group, or into none. Membership is
    /// exclusive, so any previous assignment is dropped first. Returns
    /// false when the track is not in this playlist.
    pub fn assign_group(&mut self, source: &Path, group: Option<&str>) -> bool {
        if self.position_of(source).is_none() {
            return false;
        }
        for g in &mut self.groups {
            g.members.retain(|m| m.as_path() != source);
        }
        if let Some(name) = group {
            match self.groups.iter_mut().find(|g| g.name == name) {
                Some(g) => g.members.push(source.to_path_buf()),
                None => self.groups.push(Group {
                    name: name.to_string(),
                    members: vec![source.to_path_buf()],
                }),
            }
        }
        self.groups.retain(|g| !g.members.is_empty());
        true
    }

    /// Track indices in playlist order with groups collapsed into
    /// blocks: a group occupies the slot of its first member and lists
    /// all members in playlist order.
    pub fn grouped_order(&self) -> Vec<OrderSlot> {
        let mut emitted = vec![false; self.tracks.len()];
        let mut slots = Vec::new();
        for (i, track) in self.tracks.iter().enumerate() {
            if emitted[i] {
                continue;
            }
            match self.group_index_of(&track.source) {
                Some(group) => {
                    let members: Vec<usize> = self
                        .tracks
                        .iter()
                        .enumerate()
                        .filter(|(_, t)| {
                            self.groups[group]
                                .members
                                .iter()
                                .any(|m| m == &t.source)
                        })
                        .map(|(j, _)| j)
                        .collect();
                    for &member in &members {
                        emitted[member] = true;
                    }
                    slots.push(OrderSlot::Group { group, members });
                }
                None => {
                    emitted[i] = true;
                    slots.push(OrderSlot::Track(i));
                }
            }
        }
        slots
    }

    /// Playable sequence: the grouped order with group blocks flattened.
    pub fn flat_order(&self) -> Vec<usize> {
        self.grouped_order()
            .into_iter()
            .flat_map(|slot| match slot {
                OrderSlot::Track(i) => vec![i],
                OrderSlot::Group { members, .. } => members,
            })
            .collect()
    }

    /// Drive every track's background work forward and evict the ones
    /// whose conversion failed. Each eviction is reported exactly once,
    /// as the failure that caused it.
    pub fn check_all(&mut self) -> Vec<(PathBuf, Arc<Error>)> {
        let mut failures = Vec::new();
        for track in &mut self.tracks {
            if let TrackStatus::Failed(e) = track.check() {
                failures.push((track.source.clone(), e));
            }
        }
        for (source, _) in &failures {
            self.remove(source);
        }
        failures
    }

    /// Rename the playlist and migrate its cache namespace. Tracks whose
    /// rendition could not move (target collision) fall back to their
    /// source file.
    pub fn rename(&mut self, new_name: &str, cache: &CachePaths) -> Result<()> {
        validate_name(new_name)?;
        if new_name == self.name {
            return Ok(());
        }
        cache.migrate_namespace(&self.name, new_name);
        for track in &mut self.tracks {
            if !track.converted {
                continue;
            }
            let target = cache.converted(new_name, &stem_of(&track.source));
            if target.exists() {
                track.playable = target;
            } else {
                warn!(
                    "rendition of {} did not survive the rename, using the source",
                    track.source.display()
                );
                track.playable = track.source.clone();
                track.converted = false;
            }
        }
        self.name = new_name.to_string();
        Ok(())
    }

    /// Move a track into `dest`, migrating its cached files to the new
    /// namespace. Refused (returns false) when `dest` already has the
    /// track, when it is not here, or while its conversion is in
    /// flight.
    pub fn move_track_to(&mut self, source: &Path, dest: &mut Playlist, cache: &CachePaths) -> bool {
        if dest.contains(source) {
            return false;
        }
        let Some(index) = self.position_of(source) else {
            return false;
        };
        if self.tracks[index].convert_job.is_some() {
            return false;
        }
        let Some(mut track) = self.remove(source) else {
            return false;
        };
        let stem = stem_of(&track.source);
        cache.migrate_track(&self.name, &dest.name, &stem);
        if track.converted {
            let target = cache.converted(&dest.name, &stem);
            if target.exists() {
                track.playable = target;
            } else {
                track.playable = track.source.clone();
                track.converted = false;
            }
        }
        dest.add(track)
    }

    /// Rename the source file on disk and follow with the cache files,
    /// group membership and playable path. The track keeps its position.
    pub fn rename_track(
        &mut self,
        source: &Path,
        new_stem: &str,
        cache: &CachePaths,
    ) -> Result<PathBuf> {
        validate_name(new_stem)?;
        let index = self
            .position_of(source)
            .ok_or_else(|| Error::MissingSource(source.to_path_buf()))?;
        if self.tracks[index].convert_job.is_some() {
            return Err(Error::Busy(source.to_path_buf()));
        }

        let old_stem = stem_of(source);
        if old_stem == new_stem {
            return Ok(source.to_path_buf());
        }
        let new_source = match source.extension() {
            Some(ext) => source.with_file_name(format!("{new_stem}.{}", ext.to_string_lossy())),
            None => source.with_file_name(new_stem),
        };
        if new_source.exists() {
            return Err(Error::InvalidName(format!(
                "{} already exists",
                new_source.display()
            )));
        }
        fs::rename(source, &new_source)?;
        cache.migrate_stem(&self.name, &old_stem, new_stem);

        for group in &mut self.groups {
            for member in &mut group.members {
                if member.as_path() == source {
                    *member = new_source.clone();
                }
            }
        }
        let name = self.name.clone();
        let track = &mut self.tracks[index];
        track.source = new_source.clone();
        if track.converted {
            let target = cache.converted(&name, new_stem);
            if target.exists() {
                track.playable = target;
            } else {
                track.playable = new_source.clone();
                track.converted = false;
            }
        } else {
            track.playable = new_source.clone();
        }
        Ok(new_source)
    }

    /// Pick up the playlist's own cover from the cache, if present.
    pub fn load_cover(&mut self, cache: &CachePaths) {
        let path = cache.playlist_cover(&self.name);
        self.cover = if path.exists() {
            image::open(&path).ok()
        } else {
            None
        };
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.ends_with('.') || name.contains(['/', '\\']) {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}
