//! Spotify Web API transport: token refresh, track search, and playlist
//! reads/writes over a blocking agent.
//!
//! This module owns all wire formats; the rest of the crate only sees
//! [`CatalogTrack`] values and the search/playlist traits.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::config::Config;
use crate::models::CatalogTrack;
use crate::reconcile::PlaylistOps;
use crate::resolve::TrackSearch;

const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const API_BASE: &str = "https://api.spotify.com/v1";
const PAGE_SIZE: u32 = 100;

pub struct SpotifyClient {
    agent: ureq::Agent,
    token: String,
    playlist_id: String,
    market: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    tracks: SearchTracks,
}

#[derive(Deserialize)]
struct SearchTracks {
    #[serde(default)]
    items: Vec<TrackItem>,
}

#[derive(Deserialize)]
struct TrackItem {
    id: Option<String>,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistItem>,
    album: Option<AlbumItem>,
    #[serde(default)]
    popularity: i32,
}

#[derive(Deserialize)]
struct ArtistItem {
    name: String,
}

#[derive(Deserialize)]
struct AlbumItem {
    release_date: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistPage {
    #[serde(default)]
    items: Vec<PlaylistItem>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct PlaylistItem {
    track: Option<PlaylistTrack>,
}

#[derive(Deserialize)]
struct PlaylistTrack {
    id: Option<String>,
}

impl TrackItem {
    fn into_catalog_track(self) -> Option<CatalogTrack> {
        // Local/unavailable tracks come back without an id.
        let track_id = self.id?;
        let release_year = self
            .album
            .and_then(|a| a.release_date)
            .and_then(|d| d.get(..4).and_then(|y| y.parse().ok()));
        Some(CatalogTrack {
            track_id,
            title: self.name,
            artist_names: self.artists.into_iter().map(|a| a.name).collect(),
            release_year,
            popularity: self.popularity,
        })
    }
}

fn track_uris(ids: &[String]) -> Vec<String> {
    ids.iter().map(|id| format!("spotify:track:{id}")).collect()
}

impl SpotifyClient {
    /// Exchange the stored refresh token for a bearer session.
    pub fn connect(config: &Config) -> Result<Self> {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .build();
        let basic = BASE64.encode(format!("{}:{}", config.client_id, config.client_secret));
        let response: TokenResponse = agent
            .post(TOKEN_URL)
            .set("Authorization", &format!("Basic {basic}"))
            .send_form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", config.refresh_token.as_str()),
            ])
            .context("refreshing access token")?
            .into_json()
            .context("decoding token response")?;
        Ok(Self {
            agent,
            token: response.access_token,
            playlist_id: config.playlist_id.clone(),
            market: config.market.clone(),
        })
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn playlist_tracks_url(&self) -> String {
        format!("{API_BASE}/playlists/{}/tracks", self.playlist_id)
    }
}

impl TrackSearch for SpotifyClient {
    fn search_tracks(&mut self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>> {
        let response: SearchResponse = self
            .agent
            .get(&format!("{API_BASE}/search"))
            .set("Authorization", &self.bearer())
            .query("q", query)
            .query("type", "track")
            .query("market", &self.market)
            .query("limit", &limit.to_string())
            .call()
            .with_context(|| format!("searching catalog for {query:?}"))?
            .into_json()
            .context("decoding search response")?;
        Ok(response
            .tracks
            .items
            .into_iter()
            .filter_map(TrackItem::into_catalog_track)
            .collect())
    }
}

impl PlaylistOps for SpotifyClient {
    /// Full playlist membership in playlist order, fetched page by page.
    fn playlist_track_ids(&mut self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut offset = 0u32;
        loop {
            let page: PlaylistPage = self
                .agent
                .get(&self.playlist_tracks_url())
                .set("Authorization", &self.bearer())
                .query("fields", "items(track(id)),next")
                .query("limit", &PAGE_SIZE.to_string())
                .query("offset", &offset.to_string())
                .call()
                .context("reading playlist membership")?
                .into_json()
                .context("decoding playlist page")?;
            let count = page.items.len();
            ids.extend(
                page.items
                    .into_iter()
                    .filter_map(|item| item.track.and_then(|t| t.id)),
            );
            if page.next.is_none() || count == 0 {
                break;
            }
            offset += PAGE_SIZE;
        }
        debug!("playlist currently holds {} tracks", ids.len());
        Ok(ids)
    }

    /// Append up to 100 track ids, preserving order. Callers batch.
    fn append_tracks(&mut self, ids: &[String]) -> Result<()> {
        self.agent
            .post(&self.playlist_tracks_url())
            .set("Authorization", &self.bearer())
            .send_json(json!({ "uris": track_uris(ids) }))
            .with_context(|| format!("appending {} tracks", ids.len()))?;
        Ok(())
    }

    /// Replace the playlist's entire membership.
    fn replace_tracks(&mut self, ids: &[String]) -> Result<()> {
        self.agent
            .put(&self.playlist_tracks_url())
            .set("Authorization", &self.bearer())
            .send_json(json!({ "uris": track_uris(ids) }))
            .with_context(|| format!("replacing playlist with {} tracks", ids.len()))?;
        Ok(())
    }
}
