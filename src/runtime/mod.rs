//! Headless playback runtime.
//!
//! One tick loop owns everything: it drains job results, evicts failed
//! tracks, feeds the next ready track to the audio engine and keeps the
//! wall clock in step. State worth keeping (manifest, history) is
//! written back when the queue runs out.

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use crate::clock::PlaybackClock;
use crate::config::LoopModeSetting;
use crate::history::History;
use crate::media::{FfmpegSampler, FfmpegTranscoder};
use crate::pipeline::Pipeline;
use crate::player::{Player, RodioPlayer};
use crate::playlist::save_manifest;

mod order;
mod settings;
mod startup;

pub use order::{LoopMode, PlayOrder};

pub fn run() -> anyhow::Result<()> {
    let settings = settings::load_settings();

    let pipeline = Pipeline::new(
        settings.cache_root(),
        Arc::new(FfmpegSampler),
        Arc::new(FfmpegTranscoder),
    )
    .context("could not prepare the cache")?;

    let mut playlists = startup::load_playlists(&pipeline, &settings);
    if playlists.iter().all(|p| p.is_empty()) {
        info!("nothing to play");
        return Ok(());
    }

    let history_path = pipeline.cache().history_path();
    let mut history = History::load(&history_path, settings.history.limit);

    let mut player: Box<dyn Player> =
        Box::new(RodioPlayer::new().context("could not open an audio output")?);
    player.set_volume(settings.playback.volume);
    let mut clock = PlaybackClock::new();

    let loop_mode = match settings.playback.loop_mode {
        LoopModeSetting::NoLoop => LoopMode::NoLoop,
        LoopModeSetting::LoopAll => LoopMode::LoopAll,
        LoopModeSetting::LoopOne => LoopMode::LoopOne,
    };
    let tick = Duration::from_millis(settings.playback.tick_ms);

    let active = playlists.iter().position(|p| !p.is_empty()).unwrap_or(0);
    let playlist = &mut playlists[active];
    info!("playing '{}' ({} tracks)", playlist.name, playlist.len());

    let mut order = PlayOrder::new(playlist.flat_order(), settings.playback.shuffle, loop_mode);
    let mut current: Option<PathBuf> = None;

    loop {
        let evicted = playlist.check_all();
        if !evicted.is_empty() {
            for (source, error) in &evicted {
                warn!("dropped {}: {error}", source.display());
            }
            if current
                .as_ref()
                .is_some_and(|c| evicted.iter().any(|(s, _)| s == c))
            {
                player.stop();
                current = None;
            }
            let keep = current.as_deref().and_then(|c| playlist.position_of(c));
            order.rebuild(playlist.flat_order(), keep);
        }

        match current.clone() {
            // Between tracks: start the next one once it is ready.
            // Pending conversions hold their turn until a later tick.
            None => {
                let Some(next) = order.peek_next() else {
                    break;
                };
                if playlist.track(next).is_some_and(|t| t.status.is_ready()) {
                    order.advance();
                    if let Some(track) = playlist.track_mut(next) {
                        track.cache_duration();
                        match player.load(&track.playable).and_then(|()| player.play(0.0)) {
                            Ok(()) => {
                                clock.start(0.0);
                                info!("playing {}", track.title());
                                current = Some(track.source.clone());
                            }
                            Err(e) => {
                                warn!("cannot play {}: {e}", track.source.display());
                            }
                        }
                    }
                }
            }
            // Something is playing: watch for the end of the track. The
            // clock backs up the engine for formats where the sink
            // drains early or not at all.
            Some(source) => {
                let duration = playlist
                    .position_of(&source)
                    .and_then(|i| playlist.track(i))
                    .and_then(|t| t.duration.seconds());
                let past_the_end = duration
                    .is_some_and(|d| d > 0.0 && clock.position() > d * 1.01);
                if player.finished() || past_the_end {
                    let position = match duration {
                        Some(d) => clock.position().min(d),
                        None => clock.position(),
                    };
                    history.record(&source, position, duration);
                    current = None;
                    if order.peek_next().is_none() {
                        break;
                    }
                }
            }
        }

        thread::sleep(tick);
    }

    player.stop();
    let manifests: Vec<_> = playlists.iter().map(|p| p.to_manifest()).collect();
    if let Err(e) = save_manifest(&pipeline.cache().manifest_path(), &manifests) {
        warn!("could not save playlists: {e}");
    }
    if let Err(e) = history.save(&history_path) {
        warn!("could not save history: {e}");
    }
    info!("queue finished");
    Ok(())
}
