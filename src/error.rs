use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spotify API error: {0}")]
    SpotifyApi(#[from] rspotify::ClientError),

    #[error("YouTube API error ({status}): {message}")]
    YouTubeApi {
        status: u16,
        reason: Option<String>,
        message: String,
    },

    /// The destination quota resets once a day, so retrying inside the same
    /// run is pointless.
    #[error(
        "YouTube quota exceeded during {operation}: {message}. \
         The daily quota resets at midnight Pacific Time; wait for the reset \
         or authorize a different Google account"
    )]
    QuotaExceeded { operation: String, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Playlist not found: {0}")]
    NotFound(String),
}

impl AppError {
    pub fn is_quota(&self) -> bool {
        matches!(self, AppError::QuotaExceeded { .. })
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
