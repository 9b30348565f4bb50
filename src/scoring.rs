//! Candidate scoring for catalog resolution.
//!
//! One pure function mapping (chart entry, catalog candidate) to an
//! integer. The weights are deliberately heuristic; they live here, in
//! one place, with table-driven tests rather than scattered through the
//! query cascade.

use strsim::jaro_winkler;

use crate::models::{CatalogTrack, ChartEntry};
use crate::normalize::{artist_key_parts, base_song_key, fold_to_ascii};

/// Exact normalized-title-key equality.
pub const TITLE_WEIGHT: i32 = 5;

/// Combined cap on artist-overlap evidence.
pub const ARTIST_WEIGHT_CAP: i32 = 4;

/// Per-source cap: cleaned-credit match and raw-credit match each
/// contribute at most this much.
const ARTIST_SOURCE_CAP: i32 = 2;

/// Release year equals the chart year.
pub const YEAR_EXACT_WEIGHT: i32 = 3;

/// Release year off by one (reissues, late-December releases).
pub const YEAR_ADJACENT_WEIGHT: i32 = 1;

/// Popularity contributes at most this much, as a tiebreaker.
pub const POPULARITY_CAP: i32 = 3;

/// A candidate scoring at least this much ends the query cascade early.
pub const CONFIDENT_SCORE: i32 = 5;

/// Two folded artist names that agree this closely count as a match.
const ARTIST_SIMILARITY_FLOOR: f64 = 0.90;

fn names_match(a: &str, b: &str) -> bool {
    a == b || jaro_winkler(a, b) >= ARTIST_SIMILARITY_FLOOR
}

/// Overlap between the candidate's credited artists and the entry's
/// artist strings. A credited artist matches through the cleaned credit
/// parts or, for featured credits, through the raw credit text; each
/// match contributes a fixed amount and the total is capped.
fn artist_overlap_score(entry: &ChartEntry, candidate: &CatalogTrack) -> i32 {
    let cleaned_parts = artist_key_parts(&entry.raw_artist_credit);
    let raw_credit = fold_to_ascii(&entry.raw_artist_credit);

    let mut points = 0;
    for name in &candidate.artist_names {
        let folded = fold_to_ascii(name);
        if folded.is_empty() {
            continue;
        }
        if cleaned_parts.iter().any(|part| names_match(part, &folded))
            || raw_credit.contains(&folded)
        {
            points += ARTIST_SOURCE_CAP;
        }
    }
    points.min(ARTIST_WEIGHT_CAP)
}

/// Score one search candidate against a chart entry.
///
/// +5 exact title key, up to +4 artist overlap, +3/+1 release-year
/// agreement, and a popularity tiebreaker capped at +3.
pub fn score_candidate(entry: &ChartEntry, candidate: &CatalogTrack) -> i32 {
    let mut score = 0;

    if base_song_key(&candidate.title) == entry.canonical_key().song {
        score += TITLE_WEIGHT;
    }

    score += artist_overlap_score(entry, candidate);

    if let Some(year) = candidate.release_year {
        let diff = (year - entry.chart_year()).abs();
        if diff == 0 {
            score += YEAR_EXACT_WEIGHT;
        } else if diff == 1 {
            score += YEAR_ADJACENT_WEIGHT;
        }
    }

    score += (candidate.popularity / 33).min(POPULARITY_CAP);

    score
}
