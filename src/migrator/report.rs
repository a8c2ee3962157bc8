use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::spotify::SpotifyTrack;
use crate::youtube::{FailureKind, YouTubePlaylist};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOutcome {
    pub playlist_name: String,
    pub total_tracks: usize,
    pub successfully_added: usize,
    pub failed: usize,
    pub failed_tracks: Vec<FailedTrack>,
    pub youtube_playlist_id: String,
    pub youtube_playlist_url: String,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTrack {
    pub track: String,
    pub artist: String,
    pub reason: String,
    pub kind: FailureKind,
    pub video_id: Option<String>,
}

impl MigrationOutcome {
    pub fn new(playlist_name: String, total_tracks: usize, playlist: &YouTubePlaylist) -> Self {
        Self {
            playlist_name,
            total_tracks,
            successfully_added: 0,
            failed: 0,
            failed_tracks: Vec::new(),
            youtube_playlist_id: playlist.id.clone(),
            youtube_playlist_url: playlist.url.clone(),
            elapsed_secs: 0.0,
        }
    }

    pub fn record_success(&mut self) {
        self.successfully_added += 1;
    }

    pub fn record_failure(
        &mut self,
        track: &SpotifyTrack,
        reason: String,
        kind: FailureKind,
        video_id: Option<String>,
    ) {
        self.failed += 1;
        self.failed_tracks.push(FailedTrack {
            track: track.name.clone(),
            artist: track.artist.clone(),
            reason,
            kind,
            video_id,
        });
    }

    pub fn processed(&self) -> usize {
        self.successfully_added + self.failed
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_tracks > 0 {
            (self.successfully_added as f64 / self.total_tracks as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn quota_failures(&self) -> usize {
        self.failed_tracks
            .iter()
            .filter(|t| t.kind == FailureKind::Quota)
            .count()
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_secs_f64(self.elapsed_secs)
    }
}

/// Percentage of `current` out of `total`, rounded; 0 for an empty run.
pub fn calculate_progress(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((current as f64 / total as f64) * 100.0).round() as u8
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    let minutes = seconds / 60;

    if minutes > 0 {
        format!("{}m {}s", minutes, seconds % 60)
    } else {
        format!("{}s", seconds)
    }
}
