use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::migrator::progress::{MigrationEvent, ProgressCallback, TrackProgress};
use crate::migrator::report::{MigrationOutcome, calculate_progress, format_elapsed};
use crate::spotify::{PlaylistSource, SpotifyPlaylist};
use crate::youtube::{FailureKind, PrivacyStatus, VideoCatalog};

/// Below this the destination starts throttling the calling credential.
pub const MIN_TRACK_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct MigrationOptions {
    track_delay: Duration,
}

impl MigrationOptions {
    pub fn new(track_delay: Duration) -> Self {
        Self {
            track_delay: track_delay.max(MIN_TRACK_DELAY),
        }
    }

    pub fn track_delay(&self) -> Duration {
        self.track_delay
    }
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self::new(MIN_TRACK_DELAY)
    }
}

pub fn playlist_description(playlist: &SpotifyPlaylist) -> String {
    match playlist.description.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => description.to_string(),
        _ => format!("Migrated from Spotify: {}", playlist.name),
    }
}

/// Moves one source playlist into a newly created destination playlist.
///
/// Only the setup phase (reading the source, creating the destination
/// playlist) can fail the run. After that every track is attempted in order,
/// one at a time, and per-track failures land in the outcome.
pub struct PlaylistMigrator<S, D> {
    source: S,
    destination: D,
    options: MigrationOptions,
    progress: Option<ProgressCallback>,
}

impl<S: PlaylistSource, D: VideoCatalog> PlaylistMigrator<S, D> {
    pub fn new(source: S, destination: D, options: MigrationOptions) -> Self {
        Self {
            source,
            destination,
            options,
            progress: None,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&MigrationEvent) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    fn emit(&self, event: MigrationEvent) {
        if let Some(callback) = &self.progress {
            callback(&event);
        }
    }

    pub async fn list_source_playlists(&self) -> Result<Vec<SpotifyPlaylist>> {
        self.source.get_user_playlists().await
    }

    pub async fn migrate(
        &self,
        playlist_id: &str,
        privacy: PrivacyStatus,
    ) -> Result<MigrationOutcome> {
        let start = Instant::now();

        let playlist_info = self.source.get_playlist_info(playlist_id).await?;
        info!(
            "Found playlist: {} ({} tracks)",
            playlist_info.name, playlist_info.track_count
        );

        let tracks = self.source.get_playlist_tracks(playlist_id).await?;
        let total = tracks.len();
        info!("Loaded {} tracks from Spotify", total);
        self.emit(MigrationEvent::SourceLoaded {
            name: playlist_info.name.clone(),
            total,
        });

        let description = playlist_description(&playlist_info);
        let playlist = self
            .destination
            .create_playlist(&playlist_info.name, &description, privacy)
            .await?;
        info!("Created {} YouTube playlist: {}", privacy, playlist.url);
        self.emit(MigrationEvent::PlaylistCreated {
            id: playlist.id.clone(),
            url: playlist.url.clone(),
        });

        let mut outcome = MigrationOutcome::new(playlist_info.name.clone(), total, &playlist);

        for (index, track) in tracks.iter().enumerate() {
            let percent = calculate_progress(index + 1, total);
            info!(
                "[{}/{}] ({}%) {} - {}",
                index + 1,
                total,
                percent,
                track.name,
                track.artist
            );

            let result = self
                .destination
                .search_and_add(&playlist.id, &track.name, &track.artist)
                .await;

            let reason = if result.success {
                debug!("Added (video ID: {:?})", result.video_id);
                outcome.record_success();
                None
            } else {
                let reason = result
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                warn!("Failed: {} - {}: {}", track.name, track.artist, reason);
                outcome.record_failure(
                    track,
                    reason.clone(),
                    result.kind.unwrap_or(FailureKind::NoMatch),
                    result.video_id.clone(),
                );
                Some(reason)
            };

            self.emit(MigrationEvent::Track(TrackProgress {
                index,
                total,
                percent,
                track: track.clone(),
                success: result.success,
                video_id: result.video_id,
                reason,
            }));

            if index + 1 < total {
                tokio::time::sleep(self.options.track_delay).await;
            }
        }

        outcome.elapsed_secs = start.elapsed().as_secs_f64();

        info!(
            "Migration of {} finished in {}: {}/{} added, {} failed",
            outcome.playlist_name,
            format_elapsed(outcome.elapsed()),
            outcome.successfully_added,
            outcome.total_tracks,
            outcome.failed
        );
        if outcome.quota_failures() > 0 {
            warn!(
                "{} tracks failed on YouTube quota; retry after the daily reset",
                outcome.quota_failures()
            );
        }

        self.emit(MigrationEvent::Finished {
            successes: outcome.successfully_added,
            failures: outcome.failed,
        });

        Ok(outcome)
    }
}
