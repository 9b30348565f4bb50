//! Persistent stores: three JSON blobs with plain get/set semantics.
//!
//! A missing file reads as empty; every save rewrites the whole blob.
//! The not-found log is per-run and overwritten, never merged.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{NotFoundEntry, ResolutionCache};

pub const ADDED_TRACKS_FILE: &str = "added_tracks.json";
pub const RESOLUTION_CACHE_FILE: &str = "resolution_cache.json";
pub const NOT_FOUND_FILE: &str = "not_found.json";

pub struct Stores {
    dir: PathBuf,
}

impl Stores {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    fn read_json<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let path = self.path(name);
        if !path.exists() {
            return Ok(T::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("decoding {}", path.display()))
    }

    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let path = self.path(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))
    }

    /// Track ids already added to the playlist by previous runs.
    pub fn load_added_tracks(&self) -> Result<Vec<String>> {
        self.read_json(ADDED_TRACKS_FILE)
    }

    pub fn save_added_tracks(&self, ids: &[String]) -> Result<()> {
        self.write_json(ADDED_TRACKS_FILE, &ids)
    }

    /// Canonical-key → track-id mapping accumulated across runs.
    pub fn load_resolution_cache(&self) -> Result<ResolutionCache> {
        self.read_json(RESOLUTION_CACHE_FILE)
    }

    pub fn save_resolution_cache(&self, cache: &ResolutionCache) -> Result<()> {
        self.write_json(RESOLUTION_CACHE_FILE, cache)
    }

    /// Overwrite the not-found log with this run's failures.
    pub fn save_not_found(&self, entries: &[NotFoundEntry]) -> Result<()> {
        self.write_json(NOT_FOUND_FILE, &entries)
    }

    /// Reset every store to empty. The resolution cache is included:
    /// this is the manual invalidation path for stale mappings.
    pub fn reset(&self) -> Result<()> {
        self.save_added_tracks(&[])?;
        self.save_resolution_cache(&ResolutionCache::default())?;
        self.save_not_found(&[])
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}
