use async_trait::async_trait;
use rspotify::{
    AuthCodeSpotify,
    model::{PlayableItem, PlaylistId, PlaylistItem},
    prelude::*,
};
use tracing::{debug, info};
use url::Url;

use crate::auth::Credentials;
use crate::error::{AppError, Result};
use crate::spotify::auth::{client_config, token_from_credentials};
use crate::spotify::models::{SpotifyPlaylist, SpotifyTrack};
use crate::spotify::paging::{Page, drain_pages};

const PLAYLIST_PAGE_SIZE: u32 = 50;
const TRACK_PAGE_SIZE: u32 = 100;
const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Read side of the source catalog, as consumed by the migrator.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn get_user_playlists(&self) -> Result<Vec<SpotifyPlaylist>>;

    async fn get_playlist_info(&self, playlist_id: &str) -> Result<SpotifyPlaylist>;

    async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SpotifyTrack>>;
}

/// Spotify Web API client bound to a caller-owned access token. Tokens are
/// never refreshed here; build a new client after the caller refreshes.
pub struct SpotifyClient {
    client: AuthCodeSpotify,
}

impl SpotifyClient {
    pub fn from_credentials(credentials: &Credentials) -> Self {
        Self {
            client: AuthCodeSpotify::from_token_with_config(
                token_from_credentials(credentials),
                Default::default(),
                Default::default(),
                client_config(),
            ),
        }
    }

    fn playlist_id(playlist_id: &str) -> Result<PlaylistId<'static>> {
        PlaylistId::from_id(playlist_id.to_string())
            .map_err(|e| AppError::Config(format!("Invalid playlist ID: {}", e)))
    }

    /// Parse a playlist reference into a bare playlist ID.
    /// Supports formats:
    /// - 37i9dQZF1E8NC99vGqLsaH
    /// - https://open.spotify.com/playlist/37i9dQZF1E8NC99vGqLsaH?si=...
    /// - spotify:playlist:37i9dQZF1E8NC99vGqLsaH
    pub fn parse_playlist_id(input: &str) -> Result<String> {
        let input = input.trim();

        if let Some(id) = input.strip_prefix("spotify:playlist:") {
            return Ok(id.to_string());
        }

        if !input.contains("://") {
            if input.is_empty() || !input.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(AppError::Config(format!("Invalid playlist ID: {}", input)));
            }
            return Ok(input.to_string());
        }

        let url = Url::parse(input)?;

        let path_segments: Vec<&str> = url
            .path_segments()
            .ok_or_else(|| AppError::Config("Invalid Spotify URL".into()))?
            .collect();

        // Expect /playlist/{id}
        if path_segments.len() >= 2 && path_segments[0] == "playlist" {
            Ok(path_segments[1].to_string())
        } else {
            Err(AppError::Config(
                "URL does not appear to be a Spotify playlist URL".into(),
            ))
        }
    }

    async fn fetch_playlist_page(&self, offset: u32) -> Result<Page<SpotifyPlaylist>> {
        let page = self
            .client
            .current_user_playlists_manual(Some(PLAYLIST_PAGE_SIZE), Some(offset))
            .await?;

        let items = page
            .items
            .iter()
            .map(|playlist| SpotifyPlaylist {
                id: playlist.id.id().to_string(),
                name: playlist.name.clone(),
                description: None,
                track_count: playlist.tracks.total as usize,
            })
            .collect();

        Ok(Page {
            items,
            has_more: page.next.is_some(),
        })
    }

    async fn fetch_track_page(
        &self,
        playlist_id: &PlaylistId<'static>,
        offset: u32,
    ) -> Result<Page<SpotifyTrack>> {
        let page = self
            .client
            .playlist_items_manual(
                playlist_id.clone_static(),
                None,
                None,
                Some(TRACK_PAGE_SIZE),
                Some(offset),
            )
            .await?;

        Ok(Page {
            items: page.items.iter().filter_map(convert_item).collect(),
            has_more: page.next.is_some(),
        })
    }
}

fn convert_item(item: &PlaylistItem) -> Option<SpotifyTrack> {
    match &item.track {
        Some(PlayableItem::Track(track)) if !track.name.is_empty() => {
            if track.id.is_none() {
                debug!("Keeping local track: {}", track.name);
            }
            let album = Some(track.album.name.clone()).filter(|name| !name.is_empty());
            Some(SpotifyTrack {
                name: track.name.clone(),
                artist: track
                    .artists
                    .first()
                    .map(|a| a.name.clone())
                    .unwrap_or_else(|| UNKNOWN_ARTIST.to_string()),
                album,
            })
        }
        _ => None,
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    async fn get_user_playlists(&self) -> Result<Vec<SpotifyPlaylist>> {
        let playlists =
            drain_pages(PLAYLIST_PAGE_SIZE, |offset| self.fetch_playlist_page(offset)).await?;

        info!("Found {} user playlists", playlists.len());
        Ok(playlists)
    }

    async fn get_playlist_info(&self, playlist_id: &str) -> Result<SpotifyPlaylist> {
        let id = Self::playlist_id(playlist_id)?;

        let playlist = self.client.playlist(id, None, None).await?;

        debug!(
            "Fetched playlist metadata: {} ({} tracks)",
            playlist.name, playlist.tracks.total
        );

        Ok(SpotifyPlaylist {
            id: playlist_id.to_string(),
            name: playlist.name,
            description: playlist.description.filter(|d| !d.trim().is_empty()),
            track_count: playlist.tracks.total as usize,
        })
    }

    async fn get_playlist_tracks(&self, playlist_id: &str) -> Result<Vec<SpotifyTrack>> {
        let id = Self::playlist_id(playlist_id)?;

        let tracks =
            drain_pages(TRACK_PAGE_SIZE, |offset| self.fetch_track_page(&id, offset)).await?;

        info!("Fetched {} tracks from playlist", tracks.len());
        Ok(tracks)
    }
}
