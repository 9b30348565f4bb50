//! Table extraction: turning one scraped string grid into chart entries.
//!
//! Header text varies across decades ("Week ending", "Date", "Single",
//! "Song", "Artist(s)"), so column roles are inferred by substring match
//! on letters-only lowercased headers. Tables missing any of the three
//! roles are skipped wholesale.

use chrono::NaiveDate;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{ChartEntry, RawTable};
use crate::normalize::{clean_artist_name, clean_song_title, parse_chart_date};

static FOUR_DIGIT_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:19|20)\d{2}\b").unwrap());

/// Strip everything but letters and lowercase, so "Week ending[a]" and
/// "Week Ending" infer the same role.
fn normalize_header(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect::<String>()
        .to_lowercase()
}

fn find_column(headers: &[String], needles: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let norm = normalize_header(h);
        needles.iter().any(|n| norm.contains(n))
    })
}

/// First four-digit year in the table's caption, else its nearest
/// preceding heading. Seeds the running year for day+month-only rows.
fn base_year(table: &RawTable) -> Option<i32> {
    [table.caption.as_deref(), table.heading.as_deref()]
        .into_iter()
        .flatten()
        .find_map(|text| FOUR_DIGIT_YEAR.find(text))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract qualifying chart entries from one table.
///
/// Returns `None` when the table lacks a date, song, or artist column
/// (not a chart table). Rows whose date fails to parse or falls before
/// `cutoff` are dropped silently. A row whose date string carries an
/// explicit year advances the running year inherited by later rows.
pub fn extract_entries(table: &RawTable, cutoff: NaiveDate) -> Option<Vec<ChartEntry>> {
    let date_col = find_column(&table.headers, &["week", "date"]);
    let song_col = find_column(&table.headers, &["single", "song"]);
    let artist_col = find_column(&table.headers, &["artist"]);
    let (date_col, song_col, artist_col) = match (date_col, song_col, artist_col) {
        (Some(d), Some(s), Some(a)) => (d, s, a),
        _ => {
            debug!(
                "skipping table without date/song/artist columns (headers: {:?})",
                table.headers
            );
            return None;
        }
    };

    let mut current_year = base_year(table);
    let mut entries = Vec::new();
    for row in &table.rows {
        let (Some(date_cell), Some(song_cell), Some(artist_cell)) =
            (row.get(date_col), row.get(song_col), row.get(artist_col))
        else {
            continue;
        };

        if let Some(m) = FOUR_DIGIT_YEAR.find(date_cell) {
            if let Ok(year) = m.as_str().parse() {
                current_year = Some(year);
            }
        }

        let Some(chart_date) = parse_chart_date(date_cell, current_year) else {
            continue;
        };
        if chart_date < cutoff {
            continue;
        }

        entries.push(ChartEntry {
            chart_date,
            raw_song_title: song_cell.trim().to_string(),
            raw_artist_credit: artist_cell.trim().to_string(),
            cleaned_song_title: clean_song_title(song_cell),
            cleaned_artist_credit: clean_artist_name(artist_cell),
        });
    }
    Some(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cutoff() -> NaiveDate {
        NaiveDate::from_ymd_opt(1996, 2, 7).unwrap()
    }

    fn chart_table(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable {
            caption: None,
            heading: None,
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn infers_columns_across_header_variants() {
        let table = chart_table(
            &["Week ending", "Single", "Artist(s)"],
            &[&["6 February 1998", "\"Angels\"", "Robbie Williams"]],
        );
        let entries = extract_entries(&table, cutoff()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].cleaned_song_title, "Angels");

        let table = chart_table(
            &["Date", "Song", "Artist"],
            &[&["6 February 1998", "Angels", "Robbie Williams"]],
        );
        assert_eq!(extract_entries(&table, cutoff()).unwrap().len(), 1);
    }

    #[test]
    fn skips_table_missing_a_role_column() {
        let table = chart_table(
            &["Week ending", "Sales", "Artist"],
            &[&["6 February 1998", "90,000", "Robbie Williams"]],
        );
        assert!(extract_entries(&table, cutoff()).is_none());
    }

    #[test]
    fn rows_before_cutoff_are_dropped() {
        let table = chart_table(
            &["Week ending", "Single", "Artist"],
            &[
                &["12 January 1996", "\"Jesus to a Child\"", "George Michael"],
                &["9 February 1996", "\"Spaceman\"", "Babylon Zoo"],
            ],
        );
        let entries = extract_entries(&table, cutoff()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].raw_song_title, "\"Spaceman\"");
    }

    #[test]
    fn unparseable_dates_are_dropped_silently() {
        let table = chart_table(
            &["Week ending", "Single", "Artist"],
            &[
                &["TBA", "\"Ghost Row\"", "Nobody"],
                &["6 February 1998", "\"Angels\"", "Robbie Williams"],
            ],
        );
        assert_eq!(extract_entries(&table, cutoff()).unwrap().len(), 1);
    }

    #[test]
    fn day_month_rows_inherit_running_year() {
        let mut table = chart_table(
            &["Week ending", "Single", "Artist"],
            &[
                &["28 December 2020", "\"Last Christmas\"", "Wham!"],
                &["1 January", "\"Don't Stop Me Eatin'\"", "LadBaby"],
            ],
        );
        table.caption = Some("UK number ones of the 2020s".to_string());
        let entries = extract_entries(&table, cutoff()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[1].chart_date,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()
        );
    }

    #[test]
    fn base_year_comes_from_caption_or_heading() {
        let mut table = chart_table(
            &["Week ending", "Single", "Artist"],
            &[&["1 January", "\"Hit\"", "X"]],
        );
        table.caption = Some("Number ones of 2021".to_string());
        let entries = extract_entries(&table, cutoff()).unwrap();
        assert_eq!(
            entries[0].chart_date,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
        );

        table.caption = None;
        table.heading = Some("2021 in music".to_string());
        let entries = extract_entries(&table, cutoff()).unwrap();
        assert_eq!(
            entries[0].chart_date,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
        );
    }

    #[test]
    fn messy_row_extracts_clean_entry_and_keys() {
        let table = chart_table(
            &["Week ending", "Single", "Artist"],
            &[&[
                "6 February 1998",
                "\"Long-Distance Runaround\" (Remix)",
                "Band A feat. Band B",
            ]],
        );
        let entries = extract_entries(&table, cutoff()).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(
            entry.chart_date,
            NaiveDate::from_ymd_opt(1998, 2, 6).unwrap()
        );
        assert_eq!(entry.cleaned_song_title, "Long-Distance Runaround");
        assert_eq!(entry.cleaned_artist_credit, "Band A");
        let key = entry.canonical_key();
        assert_eq!(key.song, "long-distance runaround");
        assert_eq!(key.artist, "band a");
    }

    #[test]
    fn short_rows_are_skipped() {
        let table = chart_table(
            &["Week ending", "Single", "Artist"],
            &[&["6 February 1998"], &["6 February 1998", "\"Angels\"", "Robbie Williams"]],
        );
        assert_eq!(extract_entries(&table, cutoff()).unwrap().len(), 1);
    }
}
