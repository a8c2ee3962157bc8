use crate::spotify::SpotifyTrack;

/// Per-track progress, emitted after the track has been processed.
#[derive(Debug, Clone)]
pub struct TrackProgress {
    /// Zero-based position in the source playlist.
    pub index: usize,
    pub total: usize,
    pub percent: u8,
    pub track: SpotifyTrack,
    pub success: bool,
    pub video_id: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone)]
pub enum MigrationEvent {
    SourceLoaded { name: String, total: usize },
    PlaylistCreated { id: String, url: String },
    Track(TrackProgress),
    Finished { successes: usize, failures: usize },
}

pub type ProgressCallback = Box<dyn Fn(&MigrationEvent) + Send + Sync>;
