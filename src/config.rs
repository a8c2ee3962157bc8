use std::time::Duration;

use crate::error::{AppError, Result};
use crate::migrator::MigrationOptions;
use crate::youtube::{CredentialRole, SearchStrategy};

const DEFAULT_TRACK_DELAY_MS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_redirect_uri: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_redirect_uri: String,
    pub youtube_api_key: Option<String>,
    pub track_delay: Duration,
    pub search_order: Vec<CredentialRole>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let spotify_client_id = std::env::var("SPOTIFY_CLIENT_ID")
            .map_err(|_| AppError::Config("SPOTIFY_CLIENT_ID not set".into()))?;

        let spotify_client_secret = std::env::var("SPOTIFY_CLIENT_SECRET")
            .map_err(|_| AppError::Config("SPOTIFY_CLIENT_SECRET not set".into()))?;

        let spotify_redirect_uri = std::env::var("SPOTIFY_REDIRECT_URI")
            .unwrap_or_else(|_| "http://127.0.0.1:8888/callback".to_string());

        // Google credentials are only needed for migration, so a missing value
        // is reported by get_missing_config instead of failing here.
        let google_client_id = std::env::var("GOOGLE_CLIENT_ID").unwrap_or_default();
        let google_client_secret = std::env::var("GOOGLE_CLIENT_SECRET").unwrap_or_default();
        let google_redirect_uri = std::env::var("GOOGLE_REDIRECT_URI")
            .unwrap_or_else(|_| "http://127.0.0.1:8888/google-callback".to_string());

        let youtube_api_key = std::env::var("YOUTUBE_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let track_delay = match std::env::var("TRACK_DELAY_MS") {
            Ok(raw) => parse_track_delay(&raw)?,
            Err(_) => Duration::from_millis(DEFAULT_TRACK_DELAY_MS),
        };

        let search_order = match std::env::var("SEARCH_CREDENTIAL_ORDER") {
            Ok(raw) => parse_search_order(&raw)?,
            Err(_) => vec![CredentialRole::AppLevel, CredentialRole::UserDelegated],
        };

        Ok(Self {
            spotify_client_id,
            spotify_client_secret,
            spotify_redirect_uri,
            google_client_id,
            google_client_secret,
            google_redirect_uri,
            youtube_api_key,
            track_delay,
            search_order,
        })
    }

    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.spotify_client_id.is_empty() {
            missing.push("SPOTIFY_CLIENT_ID".to_string());
        }
        if self.spotify_client_secret.is_empty() {
            missing.push("SPOTIFY_CLIENT_SECRET".to_string());
        }
        if self.google_client_id.is_empty() {
            missing.push("GOOGLE_CLIENT_ID".to_string());
        }
        if self.google_client_secret.is_empty() {
            missing.push("GOOGLE_CLIENT_SECRET".to_string());
        }

        missing
    }

    pub fn validate_spotify_config(&self) -> bool {
        !self.spotify_client_id.is_empty() && !self.spotify_client_secret.is_empty()
    }

    pub fn validate_youtube_config(&self) -> bool {
        !self.google_client_id.is_empty() && !self.google_client_secret.is_empty()
    }

    /// Search order with the app-level role dropped when no API key is set.
    pub fn search_strategy(&self) -> SearchStrategy {
        let has_api_key = self.youtube_api_key.is_some();
        SearchStrategy::new(
            self.search_order
                .iter()
                .copied()
                .filter(|role| has_api_key || *role != CredentialRole::AppLevel)
                .collect(),
        )
    }

    pub fn migration_options(&self) -> MigrationOptions {
        MigrationOptions::new(self.track_delay)
    }
}

fn parse_track_delay(raw: &str) -> Result<Duration> {
    let millis: u64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("TRACK_DELAY_MS is not a number: {}", raw)))?;
    Ok(Duration::from_millis(millis))
}

fn parse_search_order(raw: &str) -> Result<Vec<CredentialRole>> {
    let mut roles = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let role = match part.to_lowercase().as_str() {
            "app" | "app-level" | "key" => CredentialRole::AppLevel,
            "user" | "user-delegated" | "oauth" => CredentialRole::UserDelegated,
            other => {
                return Err(AppError::Config(format!(
                    "Unknown search credential role in SEARCH_CREDENTIAL_ORDER: {}",
                    other
                )));
            }
        };
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    if roles.is_empty() {
        return Err(AppError::Config(
            "SEARCH_CREDENTIAL_ORDER must name at least one role".into(),
        ));
    }

    Ok(roles)
}

#[cfg(test)]
impl Config {
    pub fn mock() -> Self {
        Self {
            spotify_client_id: "spotify-id".to_string(),
            spotify_client_secret: "spotify-secret".to_string(),
            spotify_redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
            google_client_id: "google-id".to_string(),
            google_client_secret: "google-secret".to_string(),
            google_redirect_uri: "http://127.0.0.1:8888/google-callback".to_string(),
            youtube_api_key: Some("api-key".to_string()),
            track_delay: Duration::from_millis(DEFAULT_TRACK_DELAY_MS),
            search_order: vec![CredentialRole::AppLevel, CredentialRole::UserDelegated],
        }
    }
}
