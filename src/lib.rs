//! Ingestion and playback core for a desktop music player.
//!
//! The crate turns arbitrary media files into playable, cached assets
//! ([`track::Track`]) via background conversion jobs ([`pipeline`]),
//! keeps playlists of them ([`playlist`]), and reconciles the current
//! playback position against the audio engine ([`clock`]).

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod media;
pub mod pipeline;
pub mod player;
pub mod playlist;
pub mod runtime;
pub mod track;
