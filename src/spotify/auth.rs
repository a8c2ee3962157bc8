use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use rspotify::{
    AuthCodeSpotify, Config as ClientConfig, Credentials as ClientCredentials, OAuth, Token,
    prelude::*, scopes,
};
use tracing::{debug, info, warn};

use crate::auth::{AuthCallback, Credentials, TokenExchanger};
use crate::config::Config;
use crate::error::{AppError, Result};

/// Spotify's documented access token lifetime.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Spotify authorization-code flow on top of rspotify's OAuth client.
pub struct SpotifyAuth {
    creds: ClientCredentials,
    redirect_uri: String,
}

impl SpotifyAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            creds: ClientCredentials::new(&config.spotify_client_id, &config.spotify_client_secret),
            redirect_uri: config.spotify_redirect_uri.clone(),
        }
    }

    fn oauth(&self, state: &str) -> OAuth {
        OAuth {
            redirect_uri: self.redirect_uri.clone(),
            state: state.to_string(),
            scopes: scopes!(
                "user-read-private",
                "user-read-email",
                "playlist-read-private",
                "playlist-read-collaborative"
            ),
            ..Default::default()
        }
    }

    fn client(&self, state: &str) -> AuthCodeSpotify {
        AuthCodeSpotify::with_config(self.creds.clone(), self.oauth(state), client_config())
    }

    /// Exchange the refresh token for a new access token. rspotify carries
    /// the old refresh token over; an empty scope keeps the previous one.
    pub async fn refresh(&self, credentials: &Credentials) -> Result<Credentials> {
        if credentials.refresh_token.is_none() {
            return Err(AppError::Auth("No Spotify refresh token available".into()));
        }

        let client = AuthCodeSpotify::from_token_with_config(
            token_from_credentials(credentials),
            self.creds.clone(),
            self.oauth(""),
            client_config(),
        );
        client.refresh_token().await?;

        let mut refreshed = credentials_from_token(current_token(&client).await?);
        if refreshed.scope.is_empty() {
            refreshed.scope = credentials.scope.clone();
        }

        info!("Refreshed Spotify access token");
        Ok(refreshed)
    }
}

#[async_trait]
impl TokenExchanger for SpotifyAuth {
    fn authorize_url(&self, state: &str) -> Result<String> {
        Ok(self.client(state).get_authorize_url(true)?)
    }

    async fn exchange_code(&self, code: &str) -> Result<Credentials> {
        debug!("Exchanging Spotify authorization code");

        let client = AuthCodeSpotify::with_config(
            self.creds.clone(),
            self.oauth(""),
            client_config(),
        );
        client.request_token(code).await?;

        let credentials = credentials_from_token(current_token(&client).await?);
        info!(
            "Spotify tokens received (refresh token present: {})",
            credentials.refresh_token.is_some()
        );

        Ok(credentials)
    }

    fn parse_callback(&self, state: &str, redirect_url: &str) -> Result<AuthCallback> {
        let code = self
            .client(state)
            .parse_response_code(redirect_url.trim())
            .ok_or_else(|| AppError::Auth("Failed to parse authorization code".into()))?;

        Ok(AuthCallback {
            code,
            state: Some(state.to_string()),
        })
    }
}

/// Clients never refresh on their own; the caller owns token lifetimes.
pub(crate) fn client_config() -> ClientConfig {
    ClientConfig {
        token_refreshing: false,
        ..Default::default()
    }
}

/// Build an rspotify token from stored credentials. A lifetime that does not
/// fit chrono's range falls back to Spotify's default of one hour.
pub(crate) fn token_from_credentials(credentials: &Credentials) -> Token {
    let now = Utc::now();
    let lifetime = i64::try_from(credentials.expires_in)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|expires_in| Some((expires_in, now.checked_add_signed(expires_in)?)));

    let (expires_in, expires_at) = match lifetime {
        Some(lifetime) => lifetime,
        None => {
            warn!(
                "Token lifetime of {}s is out of range, assuming {}s",
                credentials.expires_in, DEFAULT_TOKEN_LIFETIME_SECS
            );
            let fallback = TimeDelta::seconds(DEFAULT_TOKEN_LIFETIME_SECS);
            (fallback, now + fallback)
        }
    };

    Token {
        access_token: credentials.access_token.clone(),
        expires_in,
        expires_at: Some(expires_at),
        refresh_token: credentials.refresh_token.clone(),
        scopes: credentials
            .scope
            .split_whitespace()
            .map(str::to_owned)
            .collect(),
    }
}

fn credentials_from_token(token: Token) -> Credentials {
    let mut scopes: Vec<String> = token.scopes.into_iter().collect();
    scopes.sort();

    Credentials {
        access_token: token.access_token,
        token_type: "Bearer".to_string(),
        expires_in: u64::try_from(token.expires_in.num_seconds()).unwrap_or(0),
        refresh_token: token.refresh_token,
        scope: scopes.join(" "),
    }
}

async fn current_token(client: &AuthCodeSpotify) -> Result<Token> {
    let token = client.get_token();
    let guard = token
        .lock()
        .await
        .map_err(|_| AppError::Auth("Spotify token is unavailable".into()))?;

    guard
        .clone()
        .ok_or_else(|| AppError::Auth("Spotify returned no token".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn query_value(url: &str, key: &str) -> Option<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_authorize_url_carries_state() {
        let auth = SpotifyAuth::new(&Config::mock());
        let url = auth.authorize_url("abc123").unwrap();

        assert!(url.starts_with("https://accounts.spotify.com/authorize"));
        assert_eq!(query_value(&url, "state").as_deref(), Some("abc123"));
        assert_eq!(query_value(&url, "client_id").as_deref(), Some("spotify-id"));
        assert_eq!(query_value(&url, "show_dialog").as_deref(), Some("true"));
        assert!(
            query_value(&url, "scope")
                .unwrap()
                .contains("playlist-read-private")
        );
    }

    #[test]
    fn test_callback_state_must_match() {
        let auth = SpotifyAuth::new(&Config::mock());

        let callback = auth
            .parse_callback(
                "abc123",
                "http://127.0.0.1:8888/callback?code=AQD123&state=abc123\n",
            )
            .unwrap();
        assert_eq!(callback.code, "AQD123");
        assert_eq!(callback.state.as_deref(), Some("abc123"));

        assert!(
            auth.parse_callback(
                "abc123",
                "http://127.0.0.1:8888/callback?code=AQD123&state=forged",
            )
            .is_err()
        );
        assert!(
            auth.parse_callback(
                "abc123",
                "http://127.0.0.1:8888/callback?error=access_denied&state=abc123",
            )
            .is_err()
        );
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let auth = SpotifyAuth::new(&Config::mock());
        let mut credentials = Credentials::mock("token");
        credentials.refresh_token = None;

        assert!(matches!(
            auth.refresh(&credentials).await,
            Err(AppError::Auth(_))
        ));
    }

    #[test]
    fn test_token_keeps_normal_lifetime() {
        let token = token_from_credentials(&Credentials::mock("token"));

        assert_eq!(token.expires_in.num_seconds(), 3600);
        assert!(!token.is_expired());
        assert!(token.scopes.contains("playlist-read-private"));
    }

    #[test]
    fn test_out_of_range_lifetime_falls_back() {
        for expires_in in [i64::MAX as u64, u64::MAX, i64::MAX as u64 / 1000 + 1] {
            let mut credentials = Credentials::mock("token");
            credentials.expires_in = expires_in;

            let token = token_from_credentials(&credentials);

            assert_eq!(token.expires_in.num_seconds(), DEFAULT_TOKEN_LIFETIME_SECS);
            assert!(!token.is_expired());
        }
    }

    #[test]
    fn test_token_round_trips_into_credentials() {
        let mut credentials = Credentials::mock("token");
        credentials.scope = "user-read-email playlist-read-private".to_string();

        let back = credentials_from_token(token_from_credentials(&credentials));

        assert_eq!(back.access_token, "token");
        assert_eq!(back.expires_in, 3600);
        assert_eq!(back.refresh_token.as_deref(), Some("token-refresh"));
        assert_eq!(back.scope, "playlist-read-private user-read-email");
    }
}
