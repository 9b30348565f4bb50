//! Core data models for chart harvesting and playlist reconciliation.
//!
//! This module contains the struct definitions, type aliases, and enums
//! shared across the pipeline.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::normalize::{base_artist_key, base_song_key};

// ============================================================================
// Type Aliases
// ============================================================================

/// Persistent mapping from a canonical key's cache form to a catalog track id.
/// Accumulated across runs, never pruned automatically.
pub type ResolutionCache = FxHashMap<String, String>;

// ============================================================================
// Chart Models
// ============================================================================

/// One historical record of a song holding the number-one position,
/// as scraped from a chart source table. Immutable once harvested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChartEntry {
    pub chart_date: NaiveDate,
    pub raw_song_title: String,
    pub raw_artist_credit: String,
    pub cleaned_song_title: String,
    pub cleaned_artist_credit: String,
}

impl ChartEntry {
    /// Derived (song key, artist key) pair - the unit of deduplication
    /// and cache lookup. Two entries with equal keys are the same
    /// musical work for playlist-membership purposes.
    pub fn canonical_key(&self) -> CanonicalKey {
        CanonicalKey {
            song: base_song_key(&self.raw_song_title),
            artist: base_artist_key(&self.raw_artist_credit),
        }
    }

    pub fn chart_year(&self) -> i32 {
        use chrono::Datelike;
        self.chart_date.year()
    }
}

/// Normalized (song, artist) pair used to treat cosmetic duplicates as
/// one musical work.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CanonicalKey {
    pub song: String,
    pub artist: String,
}

impl CanonicalKey {
    /// Stable string form used as the key of the persisted resolution cache.
    pub fn cache_key(&self) -> String {
        format!("{}|{}", self.song, self.artist)
    }
}

// ============================================================================
// Catalog Models
// ============================================================================

/// Candidate track returned by the streaming catalog's search.
#[derive(Clone, Debug)]
pub struct CatalogTrack {
    pub track_id: String,
    pub title: String,
    /// All credited artists in the catalog's credited order.
    pub artist_names: Vec<String>,
    /// Year of the release the track appears on, when the catalog knows it.
    pub release_year: Option<i32>,
    /// 0-100.
    pub popularity: i32,
}

// ============================================================================
// Failure Tracking
// ============================================================================

/// One resolution failure, recorded with the entry's raw (unnormalized)
/// strings so the log is greppable against the source tables.
/// The whole log is overwritten each run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundEntry {
    pub song: String,
    pub artist: String,
}

// ============================================================================
// Statistics (Instrumentation)
// ============================================================================

/// Per-run counters, logged as JSON to stderr at the end of a run.
#[derive(Default, Debug, Clone, Serialize)]
pub struct RunStats {
    pub pages_fetched: usize,
    pub pages_failed: usize,
    pub tables_skipped: usize,
    pub entries_harvested: usize,

    pub cache_hits: usize,
    pub searches_issued: usize,
    pub resolved: usize,
    pub not_found: usize,

    pub appended: usize,
    pub skipped_duplicate: usize,
    pub skipped_present: usize,
    pub append_failures: usize,

    pub elapsed_seconds: f64,
}

impl RunStats {
    /// Log stats to stderr in JSON format.
    pub fn log_phase(&self, phase: &str) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            eprintln!("[STATS:{}]\n{}", phase, json);
        }
    }
}

// ============================================================================
// Raw Table Grid
// ============================================================================

/// Rectangular grid of strings lifted out of one source-page table,
/// with the surrounding context used to infer a base year for rows
/// carrying day+month-only dates.
#[derive(Clone, Debug, Default)]
pub struct RawTable {
    pub caption: Option<String>,
    /// Nearest preceding section heading, when one exists.
    pub heading: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
