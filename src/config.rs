//! Startup configuration.
//!
//! Built once in `main` from the environment and CLI flags, then passed
//! by reference into everything that needs it. Missing required items
//! are collected and reported together, before any network activity.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;

const CLIENT_ID_VAR: &str = "SPOTIFY_CLIENT_ID";
const CLIENT_SECRET_VAR: &str = "SPOTIFY_CLIENT_SECRET";
const REFRESH_TOKEN_VAR: &str = "SPOTIFY_REFRESH_TOKEN";
const PLAYLIST_ID_VAR: &str = "SPOTIFY_PLAYLIST_ID";
const MARKET_VAR: &str = "SPOTIFY_MARKET";
const DATA_DIR_VAR: &str = "CHARTSYNC_DATA_DIR";
const CUTOFF_VAR: &str = "CHARTSYNC_CUTOFF";

/// Entries charting before this date are out of scope.
pub fn default_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(1996, 2, 7).unwrap()
}

#[derive(Clone, Debug)]
pub struct Config {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    pub playlist_id: String,
    pub market: String,
    pub cutoff: NaiveDate,
    pub data_dir: PathBuf,
    pub dry_run: bool,
}

impl Config {
    pub fn from_env(dry_run: bool) -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok(), dry_run)
    }

    /// Environment access behind a lookup so tests don't mutate the
    /// process environment.
    pub fn from_lookup<F>(lookup: F, dry_run: bool) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut require = |name: &'static str| -> String {
            match lookup(name).filter(|v| !v.trim().is_empty()) {
                Some(value) => value.trim().to_string(),
                None => {
                    missing.push(name);
                    String::new()
                }
            }
        };

        let client_id = require(CLIENT_ID_VAR);
        let client_secret = require(CLIENT_SECRET_VAR);
        let refresh_token = require(REFRESH_TOKEN_VAR);
        let playlist_raw = require(PLAYLIST_ID_VAR);

        if !missing.is_empty() {
            bail!("missing required configuration: {}", missing.join(", "));
        }

        let cutoff = match lookup(CUTOFF_VAR) {
            Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .with_context(|| format!("malformed {CUTOFF_VAR} (expected YYYY-MM-DD): {raw:?}"))?,
            None => default_cutoff(),
        };

        Ok(Self {
            client_id,
            client_secret,
            refresh_token,
            playlist_id: normalize_playlist_id(&playlist_raw),
            market: lookup(MARKET_VAR).unwrap_or_else(|| "GB".to_string()),
            cutoff,
            data_dir: lookup(DATA_DIR_VAR).map_or_else(|| PathBuf::from("."), PathBuf::from),
            dry_run,
        })
    }
}

/// Accepts a bare playlist id, a `spotify:playlist:` URI, or a share URL
/// and returns the bare id.
pub fn normalize_playlist_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if let Some(id) = trimmed.strip_prefix("spotify:playlist:") {
        return id.to_string();
    }
    if let Some(pos) = trimmed.find("open.spotify.com/playlist/") {
        let rest = &trimmed[pos + "open.spotify.com/playlist/".len()..];
        return rest
            .split(|c| c == '?' || c == '/' || c == '#')
            .next()
            .unwrap_or(rest)
            .to_string();
    }
    trimmed.to_string()
}
