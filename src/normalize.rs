//! Shared normalization functions for chart-entry / catalog matching.
//!
//! Everything here is pure: raw title, artist, and date strings in,
//! canonical comparison forms out. Both the harvester and the resolver
//! build on these, so the keys produced here define what counts as
//! "the same song".

use any_ascii::any_ascii;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Bracketed and parenthetical annotations: "(2011 Remaster)", "[a]", "(feat. X)".
static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\(\[][^\)\]]*[\)\]]").unwrap());

/// Apostrophe-prefixed two-digit year tokens: "Song '98", "Mambo No. 5 '99".
static TICK_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"['\u{2018}\u{2019}]\d{2}\b").unwrap());

/// Version/edit/remaster vocabulary stripped from song keys (whole-word).
/// "Song (2011 Remaster)", "Song - Radio Edit" and "Song" must all key equal.
static VERSION_TAGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:remaster(?:ed)?|remix(?:ed)?|re-?recorded|radio|edit|version|mix|mono|stereo|extended|single|deluxe)\b",
    )
    .unwrap()
});

/// Featuring-style separators after which an artist credit is truncated.
/// Ampersands deliberately survive: `base_artist_key` folds them instead.
static FEAT_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring|with)\s+").unwrap());

/// Joint-credit separators normalized to one delimiter in artist keys.
static CREDIT_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*&\s*|\s+and\s+").unwrap());

/// Range separators in chart-week strings ("1 January – 7 January 2021").
static DATE_RANGE_SPLIT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:–|—|-|\bto\b)\s*").unwrap());

/// Four-digit year anywhere in a date string.
static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(1[89]\d{2}|20\d{2})\b").unwrap());

/// Bare-year strings ("1998") are headers/notes, never chart weeks.
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").unwrap());

/// Regex to collapse multiple whitespace into single space.
static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

const QUOTE_CHARS: &[char] = &['"', '\'', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}'];

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII by applying NFKD decomposition,
/// removing combining marks, and transliterating what remains.
/// e.g., "Beyoncé" → "beyonce", "Björk" → "bjork"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

fn collapse_whitespace(s: &str) -> String {
    MULTI_SPACE.replace_all(s.trim(), " ").to_string()
}

// ============================================================================
// TITLE NORMALIZATION
// ============================================================================

/// Clean a scraped song title for display and search queries.
/// Strips bracketed annotations and surrounding quote characters.
/// Idempotent. Brackets go first: the closing quote often sits before
/// the annotation (`"Title" (Remix)`).
pub fn clean_song_title(raw: &str) -> String {
    let unbracketed = BRACKETED.replace_all(raw, "");
    let unquoted = unbracketed.trim().trim_matches(QUOTE_CHARS);
    collapse_whitespace(unquoted)
}

/// Canonical comparison key for a song title.
/// Two titles differing only by remaster/edit/mix tags, bracketed
/// annotations, or an apostrophe-year suffix yield the same key.
pub fn base_song_key(raw: &str) -> String {
    let cleaned = clean_song_title(raw);
    let folded = fold_to_ascii(&cleaned);
    let no_year = TICK_YEAR.replace_all(&folded, "");
    let no_tags = VERSION_TAGS.replace_all(&no_year, "");
    let mut key = collapse_whitespace(&no_tags)
        .trim_end_matches('-')
        .trim_end()
        .to_string();
    // A title made entirely of tag words ("Radio") must not key to "".
    if key.is_empty() {
        key = collapse_whitespace(&folded);
    }
    key
}

// ============================================================================
// ARTIST NORMALIZATION
// ============================================================================

/// Truncate an artist credit at the first featuring-style separator,
/// keeping only the primary credited artist(s).
/// e.g., "Band A feat. Band B" → "Band A"
pub fn clean_artist_name(raw: &str) -> String {
    let trimmed = raw.trim();
    match FEAT_SEPARATOR.find(trimmed) {
        Some(m) => trimmed[..m.start()].trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Canonical comparison key for an artist credit.
/// Joint credits are normalized to a single delimiter and capped at two
/// parts, so "Artist A & Artist B feat. C" and "Artist A and Artist B"
/// converge on the same key.
pub fn base_artist_key(raw: &str) -> String {
    let cleaned = fold_to_ascii(&clean_artist_name(raw));
    let delimited = CREDIT_SEPARATOR.replace_all(&cleaned, "/");
    let parts: Vec<&str> = delimited
        .split('/')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(2)
        .collect();
    parts.join("/")
}

/// Artist key split into its credited parts, for overlap scoring.
pub fn artist_key_parts(raw: &str) -> Vec<String> {
    base_artist_key(raw)
        .split('/')
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// CHART DATE PARSING
// ============================================================================

/// Parse a chart-week date string into a calendar date.
///
/// Handles ranged strings (only the segment before a dash/"to" is kept),
/// bracketed footnotes, and non-breaking spaces. Bare-year strings are
/// rejected. When the segment carries no explicit year, `fallback_year`
/// (the table's running year) fills in. Returns `None` when nothing
/// plausible parses; callers treat that as "skip this row".
pub fn parse_chart_date(text: &str, fallback_year: Option<i32>) -> Option<NaiveDate> {
    let despaced = text.replace(['\u{a0}', '\u{2009}'], " ");
    let unbracketed = BRACKETED.replace_all(&despaced, "");
    let segment = DATE_RANGE_SPLIT
        .split(unbracketed.trim())
        .next()
        .unwrap_or("")
        .trim()
        .to_string();
    if segment.is_empty() || BARE_YEAR.is_match(&segment) {
        return None;
    }

    let explicit_year = YEAR
        .find(&segment)
        .and_then(|m| m.as_str().parse::<i32>().ok());
    let year = explicit_year.or(fallback_year)?;

    let probe = if explicit_year.is_some() {
        segment.clone()
    } else {
        format!("{segment} {year}")
    };
    for fmt in ["%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&probe, fmt) {
            return Some(date);
        }
    }

    lenient_day_first(&segment, year)
}

/// Last-resort day-first parse: pick the first plausible day number and
/// the first month-name token out of the segment.
fn lenient_day_first(segment: &str, year: i32) -> Option<NaiveDate> {
    let mut day: Option<u32> = None;
    let mut month: Option<u32> = None;
    for token in segment.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        if day.is_none() && token.starts_with(|c: char| c.is_ascii_digit()) {
            let digits: String = token.chars().take_while(char::is_ascii_digit).collect();
            if let Ok(n) = digits.parse::<u32>() {
                if (1..=31).contains(&n) {
                    day = Some(n);
                    continue;
                }
            }
        }
        if month.is_none() && token.len() >= 3 {
            let lower = token.to_lowercase();
            if let Some(idx) = MONTHS.iter().position(|m| m.starts_with(&lower)) {
                month = Some(idx as u32 + 1);
            }
        }
    }
    NaiveDate::from_ymd_opt(year, month?, day?)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_song_title_strips_quotes_and_brackets() {
        assert_eq!(clean_song_title("\"Long-Distance Runaround\" (Remix)"), "Long-Distance Runaround");
        assert_eq!(clean_song_title("  \u{201C}Angels\u{201D}  "), "Angels");
        assert_eq!(clean_song_title("Song [a]"), "Song");
    }

    #[test]
    fn clean_song_title_is_idempotent() {
        for raw in ["\"Hit (Live)\"", "Plain Title", "  spaced  out  "] {
            let once = clean_song_title(raw);
            assert_eq!(clean_song_title(&once), once);
        }
    }

    #[test]
    fn song_key_ignores_version_tags() {
        assert_eq!(base_song_key("Song"), base_song_key("Song (2011 Remaster)"));
        assert_eq!(base_song_key("Song"), base_song_key("Song - Radio Edit"));
        assert_eq!(base_song_key("Song"), base_song_key("Song (Mono Version)"));
        assert_eq!(base_song_key("Three Lions"), base_song_key("Three Lions '98"));
    }

    #[test]
    fn song_key_folds_case_and_diacritics() {
        assert_eq!(base_song_key("Déjà Vu"), "deja vu");
        assert_eq!(base_song_key("ANGELS"), base_song_key("angels"));
    }

    #[test]
    fn song_key_of_pure_tag_title_is_not_empty() {
        assert_eq!(base_song_key("Radio"), "radio");
        assert_eq!(base_song_key("Mix"), "mix");
    }

    #[test]
    fn clean_artist_truncates_featuring() {
        assert_eq!(clean_artist_name("Band A feat. Band B"), "Band A");
        assert_eq!(clean_artist_name("Drake ft. Rihanna"), "Drake");
        assert_eq!(clean_artist_name("Queen with David Bowie"), "Queen");
        assert_eq!(clean_artist_name("Oasis"), "Oasis");
    }

    #[test]
    fn artist_key_drops_featured_credits() {
        assert_eq!(base_artist_key("Artist A feat. Artist B"), base_artist_key("Artist A"));
        assert_eq!(base_artist_key("Band A feat. Band B"), "band a");
    }

    #[test]
    fn artist_key_converges_joint_credit_variants() {
        assert_eq!(
            base_artist_key("Artist A & Artist B feat. C"),
            base_artist_key("Artist A and Artist B")
        );
        assert_eq!(base_artist_key("Artist A & Artist B"), "artist a/artist b");
    }

    #[test]
    fn artist_key_caps_at_two_parts() {
        assert_eq!(base_artist_key("A & B & C"), "a/b");
    }

    #[test]
    fn artist_key_parts_split() {
        assert_eq!(artist_key_parts("Artist A & Artist B"), vec!["artist a", "artist b"]);
        assert_eq!(artist_key_parts("Oasis"), vec!["oasis"]);
    }

    #[test]
    fn parses_full_date() {
        assert_eq!(
            parse_chart_date("6 February 1998", None),
            NaiveDate::from_ymd_opt(1998, 2, 6)
        );
    }

    #[test]
    fn parses_day_month_with_fallback_year() {
        assert_eq!(
            parse_chart_date("1 January", Some(2021)),
            NaiveDate::from_ymd_opt(2021, 1, 1)
        );
    }

    #[test]
    fn keeps_segment_before_range_separator() {
        assert_eq!(
            parse_chart_date("1 January – 7 January 2021", Some(2021)),
            NaiveDate::from_ymd_opt(2021, 1, 1)
        );
        assert_eq!(
            parse_chart_date("3 May to 9 May", Some(1996)),
            NaiveDate::from_ymd_opt(1996, 5, 3)
        );
    }

    #[test]
    fn strips_footnotes_and_nbsp() {
        assert_eq!(
            parse_chart_date("14\u{a0}August 2020 [b]", None),
            NaiveDate::from_ymd_opt(2020, 8, 14)
        );
    }

    #[test]
    fn rejects_bare_years_and_garbage() {
        assert_eq!(parse_chart_date("1998", Some(1998)), None);
        assert_eq!(parse_chart_date("n/a", Some(1998)), None);
        assert_eq!(parse_chart_date("", Some(1998)), None);
    }

    #[test]
    fn rejects_day_month_without_any_year() {
        assert_eq!(parse_chart_date("1 January", None), None);
    }

    #[test]
    fn lenient_parse_handles_abbreviations() {
        assert_eq!(
            parse_chart_date("6th Feb 1998", None),
            NaiveDate::from_ymd_opt(1998, 2, 6)
        );
    }
}
