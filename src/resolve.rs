//! Catalog resolution: mapping one chart entry to a track id.
//!
//! Cache-first, then a cascade of increasingly relaxed search queries.
//! A failed search call is a silent miss (the next cascade step is the
//! retry); only a confident score ends the cascade early. Entries that
//! survive the whole cascade unresolved land in the not-found log with
//! their raw strings.

use anyhow::Result;
use log::{debug, warn};

use crate::models::{CatalogTrack, ChartEntry, NotFoundEntry, ResolutionCache, RunStats};
use crate::scoring::{score_candidate, CONFIDENT_SCORE};

/// Candidates fetched per query.
pub const CANDIDATE_LIMIT: u32 = 5;

/// Search capability of the external catalog.
pub trait TrackSearch {
    fn search_tracks(&mut self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>>;
}

/// The ordered query cascade for one entry, most specific first.
fn build_queries(entry: &ChartEntry) -> Vec<String> {
    let title = &entry.cleaned_song_title;
    let clean_artist = &entry.cleaned_artist_credit;
    let raw_artist = entry.raw_artist_credit.trim();
    let year = entry.chart_year();

    let mut queries = vec![format!(
        "track:\"{title}\" artist:\"{clean_artist}\" year:{year}"
    )];
    if raw_artist != clean_artist {
        queries.push(format!(
            "track:\"{title}\" artist:\"{raw_artist}\" year:{year}"
        ));
    }
    queries.push(format!("track:\"{title}\" year:{year}"));
    queries.push(format!("{title} {clean_artist} year:{year}"));
    queries.push(format!(
        "track:\"{title}\" artist:\"{clean_artist}\" year:{}-{}",
        year - 1,
        year + 1
    ));
    queries.push(format!("track:\"{title}\" artist:\"{clean_artist}\""));
    queries.push(format!("track:\"{title}\""));
    queries.push(format!("{title} {clean_artist}"));
    queries
}

/// Resolves chart entries against a catalog search, accumulating the
/// run's not-found log.
#[derive(Default)]
pub struct Resolver {
    pub not_found: Vec<NotFoundEntry>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve one entry to a track id, or `None` after the full cascade.
    ///
    /// A cache hit returns immediately with no search traffic. On a
    /// fresh resolution the cache is updated; persisting it is the
    /// caller's job.
    pub fn resolve<S: TrackSearch>(
        &mut self,
        search: &mut S,
        entry: &ChartEntry,
        cache: &mut ResolutionCache,
        stats: &mut RunStats,
    ) -> Option<String> {
        let cache_key = entry.canonical_key().cache_key();
        if let Some(track_id) = cache.get(&cache_key) {
            stats.cache_hits += 1;
            return Some(track_id.clone());
        }

        let mut best: Option<(i32, CatalogTrack)> = None;
        'cascade: for query in build_queries(entry) {
            let candidates = match search.search_tracks(&query, CANDIDATE_LIMIT) {
                Ok(candidates) => candidates,
                Err(err) => {
                    warn!("search failed for {query:?}: {err:#}");
                    continue;
                }
            };
            stats.searches_issued += 1;
            for candidate in candidates {
                let score = score_candidate(entry, &candidate);
                if best.as_ref().map_or(true, |(top, _)| score > *top) {
                    best = Some((score, candidate));
                }
                if score >= CONFIDENT_SCORE {
                    break 'cascade;
                }
            }
        }

        match best {
            Some((score, track)) => {
                debug!(
                    "resolved {:?} / {:?} -> {} (score {score})",
                    entry.raw_song_title, entry.raw_artist_credit, track.track_id
                );
                cache.insert(cache_key, track.track_id.clone());
                stats.resolved += 1;
                Some(track.track_id)
            }
            None => {
                let failure = NotFoundEntry {
                    song: entry.raw_song_title.clone(),
                    artist: entry.raw_artist_credit.clone(),
                };
                // Set semantics: the same miss is logged once per run.
                if !self.not_found.contains(&failure) {
                    self.not_found.push(failure);
                    stats.not_found += 1;
                }
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rustc_hash::FxHashMap;
    use std::collections::VecDeque;

    fn entry(song: &str, artist: &str, year: i32) -> ChartEntry {
        ChartEntry {
            chart_date: NaiveDate::from_ymd_opt(year, 6, 1).unwrap(),
            raw_song_title: song.to_string(),
            raw_artist_credit: artist.to_string(),
            cleaned_song_title: crate::normalize::clean_song_title(song),
            cleaned_artist_credit: crate::normalize::clean_artist_name(artist),
        }
    }

    fn track(id: &str, title: &str, artist: &str, year: Option<i32>, popularity: i32) -> CatalogTrack {
        CatalogTrack {
            track_id: id.to_string(),
            title: title.to_string(),
            artist_names: vec![artist.to_string()],
            release_year: year,
            popularity,
        }
    }

    /// Replays scripted responses; any further query returns no candidates.
    struct ScriptedSearch {
        calls: usize,
        responses: VecDeque<Result<Vec<CatalogTrack>>>,
    }

    impl ScriptedSearch {
        fn new(responses: Vec<Result<Vec<CatalogTrack>>>) -> Self {
            Self {
                calls: 0,
                responses: responses.into(),
            }
        }

        fn empty() -> Self {
            Self::new(Vec::new())
        }
    }

    impl TrackSearch for ScriptedSearch {
        fn search_tracks(&mut self, _query: &str, _limit: u32) -> Result<Vec<CatalogTrack>> {
            self.calls += 1;
            self.responses.pop_front().unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[test]
    fn cache_hit_makes_no_search_calls() {
        let e = entry("\"Angels\"", "Robbie Williams", 1998);
        let mut cache: ResolutionCache = FxHashMap::default();
        cache.insert(e.canonical_key().cache_key(), "cached-id".to_string());

        let mut search = ScriptedSearch::empty();
        let mut stats = RunStats::default();
        let got = Resolver::new().resolve(&mut search, &e, &mut cache, &mut stats);

        assert_eq!(got.as_deref(), Some("cached-id"));
        assert_eq!(search.calls, 0);
        assert_eq!(stats.cache_hits, 1);
    }

    #[test]
    fn confident_match_short_circuits_cascade() {
        let e = entry("Angels", "Robbie Williams", 2005);
        let perfect = track("t-angels", "Angels", "Robbie Williams", Some(2005), 80);
        let mut search = ScriptedSearch::new(vec![Ok(vec![perfect])]);
        let mut cache = FxHashMap::default();
        let mut stats = RunStats::default();

        let got = Resolver::new().resolve(&mut search, &e, &mut cache, &mut stats);

        assert_eq!(got.as_deref(), Some("t-angels"));
        assert_eq!(search.calls, 1, "cascade must stop at the first query");
        assert_eq!(
            cache.get(&e.canonical_key().cache_key()).map(String::as_str),
            Some("t-angels")
        );
    }

    #[test]
    fn exhausted_cascade_returns_best_seen() {
        let e = entry("Angels", "Robbie Williams", 1998);
        // Wrong title, right artist and year: scores below the confident bar.
        let weak = track("t-feel", "Feel", "Robbie Williams", Some(1998), 0);
        let mut search = ScriptedSearch::new(vec![Ok(vec![weak])]);
        let mut cache = FxHashMap::default();
        let mut stats = RunStats::default();

        let got = Resolver::new().resolve(&mut search, &e, &mut cache, &mut stats);

        assert_eq!(got.as_deref(), Some("t-feel"));
        assert_eq!(search.calls, 7, "all cascade queries must run");
    }

    #[test]
    fn unresolved_entry_lands_in_not_found_with_raw_strings() {
        let e = entry("\"Obscure B-Side\" (Remix)", "Nobody feat. No One", 1997);
        let mut search = ScriptedSearch::empty();
        let mut cache = FxHashMap::default();
        let mut stats = RunStats::default();
        let mut resolver = Resolver::new();

        let got = resolver.resolve(&mut search, &e, &mut cache, &mut stats);

        assert_eq!(got, None);
        assert!(cache.is_empty());
        assert_eq!(
            resolver.not_found,
            vec![NotFoundEntry {
                song: "\"Obscure B-Side\" (Remix)".to_string(),
                artist: "Nobody feat. No One".to_string(),
            }]
        );
    }

    #[test]
    fn search_errors_fall_through_the_cascade() {
        let e = entry("Angels", "Robbie Williams", 2005);
        let perfect = track("t-angels", "Angels", "Robbie Williams", Some(2005), 80);
        let mut search = ScriptedSearch::new(vec![
            Err(anyhow::anyhow!("timeout")),
            Ok(vec![perfect]),
        ]);
        let mut cache = FxHashMap::default();
        let mut stats = RunStats::default();

        let got = Resolver::new().resolve(&mut search, &e, &mut cache, &mut stats);

        assert_eq!(got.as_deref(), Some("t-angels"));
        assert_eq!(stats.searches_issued, 1, "failed call is not counted as issued");
    }

    #[test]
    fn identical_clean_and_raw_artist_drops_duplicate_query() {
        let e = entry("Angels", "Robbie Williams", 1998);
        assert_eq!(build_queries(&e).len(), 7);
        let e = entry("Hit", "Band A feat. Band B", 1998);
        assert_eq!(build_queries(&e).len(), 8);
    }
}
