//! Crate-wide error taxonomy.
//!
//! Synchronous failures (`MissingSource`, `NoAudioTrack`, `Probe`,
//! `InvalidName`) are returned directly at the call site. Asynchronous
//! failures (`ConversionFailed`, `CoverExtraction`) are produced inside
//! worker threads, parked in a job's result cell and observed by the
//! owning thread's `Track::check`.

use std::path::PathBuf;

use thiserror::Error;

/// Common result type for vivace operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// The source file vanished before ingestion; the asset is skipped.
    #[error("source file not found: {0}")]
    MissingSource(PathBuf),

    /// A video container carries no audio stream; the asset is skipped.
    #[error("no audio track in {0}")]
    NoAudioTrack(PathBuf),

    /// Reading container metadata failed before any job was spawned.
    #[error("failed to probe {path}: {reason}")]
    Probe { path: PathBuf, reason: String },

    /// A background transcode failed. Terminal for the track unless the
    /// job carried the degrade policy (re-conversion of a playable file).
    #[error("conversion of {path} failed: {reason}")]
    ConversionFailed { path: PathBuf, reason: String },

    /// A background cover extraction failed. Never terminal; the track
    /// proceeds without a cover.
    #[error("cover extraction from {path} failed: {reason}")]
    CoverExtraction { path: PathBuf, reason: String },

    /// A rename/move was given an unusable name.
    #[error("invalid name: {0}")]
    InvalidName(String),

    /// The operation needs the track idle, but a conversion is in flight.
    #[error("{0} has a conversion in progress")]
    Busy(PathBuf),

    /// I/O error (wraps `std::io::Error`).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Manifest or history (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Audio engine error crossing the `Player` trait boundary.
    #[error("player error: {0}")]
    Player(String),
}
