//! Chart harvesting: walking the fixed source pages and merging every
//! qualifying table into one chronological entry sequence.
//!
//! A page that fails to fetch contributes nothing; harvesting carries on
//! with the remaining pages. Partial results are acceptable.

use chrono::NaiveDate;
use log::{info, warn};

use crate::models::{ChartEntry, RunStats};
use crate::table::extract_entries;
use crate::wiki::{parse_tables, PageFetcher, SOURCE_PAGES};

fn harvest_pages<F: PageFetcher>(
    fetcher: &F,
    pages: &[&str],
    cutoff: NaiveDate,
    stats: &mut RunStats,
) -> Vec<ChartEntry> {
    let mut entries = Vec::new();
    for url in pages {
        let html = match fetcher.fetch(url) {
            Ok(html) => html,
            Err(err) => {
                warn!("skipping source page {url}: {err:#}");
                stats.pages_failed += 1;
                continue;
            }
        };
        stats.pages_fetched += 1;
        for table in parse_tables(&html) {
            match extract_entries(&table, cutoff) {
                Some(found) => entries.extend(found),
                None => stats.tables_skipped += 1,
            }
        }
    }
    entries
}

/// Harvest the entire chart history, sorted ascending by chart date.
pub fn harvest_all<F: PageFetcher>(
    fetcher: &F,
    cutoff: NaiveDate,
    stats: &mut RunStats,
) -> Vec<ChartEntry> {
    let mut entries = harvest_pages(fetcher, SOURCE_PAGES, cutoff, stats);
    entries.sort_by_key(|e| e.chart_date);
    stats.entries_harvested = entries.len();
    info!("harvested {} chart entries", entries.len());
    entries
}

/// Harvest only the most recent source page and return the entry with
/// the maximum chart date, if any row qualified.
pub fn harvest_latest<F: PageFetcher>(
    fetcher: &F,
    cutoff: NaiveDate,
    stats: &mut RunStats,
) -> Option<ChartEntry> {
    let page = *SOURCE_PAGES.last()?;
    let entries = harvest_pages(fetcher, &[page], cutoff, stats);
    entries.into_iter().max_by_key(|e| e.chart_date)
}
