pub mod auth;
pub mod config;
pub mod error;
pub mod migrator;
pub mod spotify;
pub mod youtube;

pub use auth::{AuthCoordinator, AuthSession, CorrelationStore, Credentials, GoogleOAuth};
pub use config::Config;
pub use error::{AppError, Result};
pub use migrator::{MigrationEvent, MigrationOptions, MigrationOutcome, PlaylistMigrator};
pub use spotify::{PlaylistSource, SpotifyAuth, SpotifyClient, SpotifyPlaylist, SpotifyTrack};
pub use youtube::{PrivacyStatus, VideoCatalog, YouTubeClient, YouTubePlaylist};
