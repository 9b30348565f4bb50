//! Run orchestration: wiring harvest, resolution, reconciliation and the
//! persistent stores into the three operation modes.
//!
//! `run` builds the live transports; `run_with` does the actual work and
//! is generic over the catalog and page-fetcher seams.

use anyhow::Result;
use log::info;
use std::time::Instant;

use crate::config::Config;
use crate::harvest::{harvest_all, harvest_latest};
use crate::models::{ChartEntry, RunStats};
use crate::progress::{create_progress_bar, create_spinner, format_duration};
use crate::reconcile::{append_if_new, rebuild_ordered, PlaylistOps, RunState};
use crate::resolve::{Resolver, TrackSearch};
use crate::spotify::SpotifyClient;
use crate::store::Stores;
use crate::wiki::{HttpFetcher, PageFetcher};

/// Operation mode, selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Backfill on first run, append the latest number one afterwards;
    /// either way finish with a reconciliation/reorder pass.
    Auto,
    /// Rebuild the playlist wholesale in canonical chart order.
    Rebuild,
    /// Empty the playlist and reset local state; no harvesting.
    Clear,
}

/// Entry point used by the binary: live Spotify client, live fetcher.
pub fn run(mode: Mode, config: &Config) -> Result<()> {
    let stores = Stores::new(&config.data_dir);
    let mut client = SpotifyClient::connect(config)?;
    let fetcher = HttpFetcher::new();
    run_with(mode, config, &mut client, &fetcher, &stores)?;
    Ok(())
}

pub fn run_with<C, F>(
    mode: Mode,
    config: &Config,
    catalog: &mut C,
    fetcher: &F,
    stores: &Stores,
) -> Result<RunStats>
where
    C: TrackSearch + PlaylistOps,
    F: PageFetcher,
{
    let started = Instant::now();
    let mut stats = RunStats::default();

    if mode == Mode::Clear {
        clear(catalog, stores, config)?;
        return Ok(stats);
    }

    let mut added = stores.load_added_tracks()?;
    let cache = stores.load_resolution_cache()?;
    let existing = catalog.playlist_track_ids()?;
    let mut state = RunState::new(cache, existing);
    let mut resolver = Resolver::new();

    let entries;
    if mode == Mode::Auto && added.is_empty() {
        entries = harvest_history(fetcher, config, &mut stats);
        info!("first run: backfilling {} chart entries", entries.len());
        let bar = create_progress_bar(entries.len() as u64, "backfilling");
        for entry in &entries {
            append_if_new(entry, catalog, &mut resolver, &mut state, config.dry_run, &mut stats);
            bar.inc(1);
        }
        bar.finish_and_clear();
    } else {
        if mode == Mode::Auto {
            match harvest_latest(fetcher, config.cutoff, &mut stats) {
                Some(latest) => {
                    info!(
                        "latest number one: {} - {}",
                        latest.cleaned_song_title, latest.cleaned_artist_credit
                    );
                    append_if_new(&latest, catalog, &mut resolver, &mut state, config.dry_run, &mut stats);
                }
                None => info!("no qualifying entry on the latest source page"),
            }
        }
        entries = harvest_history(fetcher, config, &mut stats);
    }

    // Reconciliation pass: enforce the canonical chart ordering.
    let order = rebuild_ordered(&entries, catalog, &mut resolver, &mut state, config.dry_run, &mut stats)?;
    added.extend(state.added_this_run.iter().cloned());
    if !order.is_empty() {
        added = order;
    }

    if config.dry_run {
        info!("dry-run: leaving the added-track store untouched");
    } else {
        stores.save_added_tracks(&added)?;
    }
    stores.save_resolution_cache(&state.cache)?;
    stores.save_not_found(&resolver.not_found)?;

    stats.elapsed_seconds = started.elapsed().as_secs_f64();
    stats.log_phase("run");
    info!("done in {}", format_duration(started.elapsed()));
    Ok(stats)
}

fn harvest_history<F: PageFetcher>(
    fetcher: &F,
    config: &Config,
    stats: &mut RunStats,
) -> Vec<ChartEntry> {
    let spinner = create_spinner("harvesting chart history");
    let entries = harvest_all(fetcher, config.cutoff, stats);
    spinner.finish_and_clear();
    entries
}

fn clear<C: PlaylistOps>(catalog: &mut C, stores: &Stores, config: &Config) -> Result<()> {
    if config.dry_run {
        info!("dry-run: would empty the playlist and reset local state");
        return Ok(());
    }
    catalog.replace_tracks(&[])?;
    stores.reset()?;
    info!("playlist emptied, local state reset");
    Ok(())
}
