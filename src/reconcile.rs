//! Playlist reconciliation: deciding what to add, what to skip, and how
//! the whole playlist should be ordered.
//!
//! Two entry points: `append_if_new` (backfill and incremental append)
//! and `rebuild_ordered` (full canonical reorder). Expected outcomes are
//! ordinary enum values; only transport problems surface as errors, and
//! even those never abort a run here.

use log::{info, warn};
use rustc_hash::FxHashSet;
use std::thread;
use std::time::Duration;

use crate::models::{CanonicalKey, ChartEntry, ResolutionCache, RunStats};
use crate::progress::create_progress_bar;
use crate::resolve::{Resolver, TrackSearch};

/// The external API accepts at most this many ids per append call.
pub const APPEND_BATCH: usize = 100;

const APPEND_ATTEMPTS: u32 = 3;

#[cfg(not(test))]
const APPEND_BACKOFF: Duration = Duration::from_secs(2);
#[cfg(test)]
const APPEND_BACKOFF: Duration = Duration::from_millis(1);

/// Playlist capability of the external catalog.
pub trait PlaylistOps {
    fn playlist_track_ids(&mut self) -> anyhow::Result<Vec<String>>;
    fn append_tracks(&mut self, ids: &[String]) -> anyhow::Result<()>;
    fn replace_tracks(&mut self, ids: &[String]) -> anyhow::Result<()>;
}

/// Outcome of `append_if_new` for one chart entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppendAction {
    Added(String),
    SkipDuplicate,
    SkipAlreadyPresent(String),
    NotFound,
    /// Append kept failing after retries; the entry is dropped for this
    /// run, not re-queued.
    AppendFailed(String),
}

/// Mutable per-run reconciliation state.
pub struct RunState {
    pub cache: ResolutionCache,
    /// Membership view fetched once at run start, grown as we append.
    pub existing: FxHashSet<String>,
    /// Canonical keys appended this run.
    pub processed: FxHashSet<CanonicalKey>,
    pub added_this_run: Vec<String>,
}

impl RunState {
    pub fn new(cache: ResolutionCache, existing: Vec<String>) -> Self {
        Self {
            cache,
            existing: existing.into_iter().collect(),
            processed: FxHashSet::default(),
            added_this_run: Vec::new(),
        }
    }
}

fn append_with_retry<P: PlaylistOps>(playlist: &mut P, ids: &[String]) -> anyhow::Result<()> {
    let mut attempt = 1;
    loop {
        match playlist.append_tracks(ids) {
            Ok(()) => return Ok(()),
            Err(err) if attempt < APPEND_ATTEMPTS => {
                warn!("append attempt {attempt} failed, retrying: {err:#}");
                attempt += 1;
                thread::sleep(APPEND_BACKOFF);
            }
            Err(err) => return Err(err),
        }
    }
}

/// Resolve one entry and append it to the playlist unless it is already
/// covered, by canonical key or by resolved track id.
pub fn append_if_new<C: TrackSearch + PlaylistOps>(
    entry: &ChartEntry,
    catalog: &mut C,
    resolver: &mut Resolver,
    state: &mut RunState,
    dry_run: bool,
    stats: &mut RunStats,
) -> AppendAction {
    let key = entry.canonical_key();
    if state.processed.contains(&key) {
        stats.skipped_duplicate += 1;
        return AppendAction::SkipDuplicate;
    }

    let Some(track_id) = resolver.resolve(catalog, entry, &mut state.cache, stats) else {
        info!(
            "not found: {} - {}",
            entry.raw_song_title, entry.raw_artist_credit
        );
        return AppendAction::NotFound;
    };

    if state.existing.contains(&track_id) {
        stats.skipped_present += 1;
        return AppendAction::SkipAlreadyPresent(track_id);
    }

    if dry_run {
        info!(
            "dry-run: would append {track_id} ({} - {})",
            entry.cleaned_song_title, entry.cleaned_artist_credit
        );
    } else if let Err(err) = append_with_retry(catalog, std::slice::from_ref(&track_id)) {
        warn!(
            "giving up on {} - {}: {err:#}",
            entry.raw_song_title, entry.raw_artist_credit
        );
        stats.append_failures += 1;
        state.processed.insert(key);
        return AppendAction::AppendFailed(track_id);
    }

    info!(
        "added: {} - {}",
        entry.cleaned_song_title, entry.cleaned_artist_credit
    );
    stats.appended += 1;
    state.processed.insert(key);
    state.existing.insert(track_id.clone());
    state.added_this_run.push(track_id.clone());
    AppendAction::Added(track_id)
}

/// Compute the canonical playlist order for the full chart history and
/// write it to the live playlist.
///
/// Entries must arrive sorted ascending by chart date. Deduplication
/// happens twice: by canonical key (first, i.e. earliest, occurrence
/// wins) and again by resolved track id. An empty resolution result
/// refuses to touch the live playlist.
pub fn rebuild_ordered<C: TrackSearch + PlaylistOps>(
    entries: &[ChartEntry],
    catalog: &mut C,
    resolver: &mut Resolver,
    state: &mut RunState,
    dry_run: bool,
    stats: &mut RunStats,
) -> anyhow::Result<Vec<String>> {
    let mut seen_keys = FxHashSet::default();
    let survivors: Vec<&ChartEntry> = entries
        .iter()
        .filter(|e| seen_keys.insert(e.canonical_key()))
        .collect();

    let bar = create_progress_bar(survivors.len() as u64, "resolving");
    let mut seen_ids = FxHashSet::default();
    let mut ordered = Vec::new();
    for entry in survivors {
        if let Some(track_id) = resolver.resolve(catalog, entry, &mut state.cache, stats) {
            if seen_ids.insert(track_id.clone()) {
                ordered.push(track_id);
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();

    if ordered.is_empty() {
        warn!("rebuild resolved zero tracks; leaving the live playlist untouched");
        return Ok(ordered);
    }

    if dry_run {
        info!(
            "dry-run: would replace playlist with {} tracks in chart order",
            ordered.len()
        );
        return Ok(ordered);
    }

    catalog.replace_tracks(&[])?;
    for batch in ordered.chunks(APPEND_BATCH) {
        if let Err(err) = append_with_retry(catalog, batch) {
            warn!("dropping a batch of {}: {err:#}", batch.len());
            stats.append_failures += 1;
        }
    }
    info!("rebuilt playlist with {} tracks", ordered.len());
    Ok(ordered)
}
