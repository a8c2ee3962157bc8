use serde::{Deserialize, Serialize};

/// A track as read from the source playlist. Identity is its position in the
/// playlist; there is no ID carried through the migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotifyTrack {
    pub name: String,
    pub artist: String,
    pub album: Option<String>,
}

/// Playlist metadata snapshot. `track_count` is advisory and may be stale
/// relative to the track list actually fetched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub track_count: usize,
}

#[cfg(test)]
impl SpotifyTrack {
    pub fn mock(name: &str, artist: &str) -> Self {
        Self {
            name: name.to_string(),
            artist: artist.to_string(),
            album: Some("Mock Album".to_string()),
        }
    }
}

#[cfg(test)]
impl SpotifyPlaylist {
    pub fn mock(name: &str, track_count: usize) -> Self {
        Self {
            id: "mock_playlist".to_string(),
            name: name.to_string(),
            description: None,
            track_count,
        }
    }
}
