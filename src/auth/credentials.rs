use serde::{Deserialize, Serialize};

/// Token endpoint response for either provider. Owned by the caller; the
/// library only reads these and hands back refreshed replacements.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

// Tokens stay out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Spotify,
    YouTube,
}

impl Provider {
    pub fn other(&self) -> Provider {
        match self {
            Provider::Spotify => Provider::YouTube,
            Provider::YouTube => Provider::Spotify,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Spotify => write!(f, "Spotify"),
            Provider::YouTube => write!(f, "YouTube"),
        }
    }
}

/// The caller's view of which providers are authorized. Stands in for
/// whatever session layer the caller keeps.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
    pub spotify: Option<Credentials>,
    pub youtube: Option<Credentials>,
}

impl AuthSession {
    pub fn get(&self, provider: Provider) -> Option<&Credentials> {
        match provider {
            Provider::Spotify => self.spotify.as_ref(),
            Provider::YouTube => self.youtube.as_ref(),
        }
    }

    pub fn set(&mut self, provider: Provider, credentials: Credentials) {
        match provider {
            Provider::Spotify => self.spotify = Some(credentials),
            Provider::YouTube => self.youtube = Some(credentials),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.spotify.is_some() && self.youtube.is_some()
    }
}

#[cfg(test)]
impl Credentials {
    pub fn mock(access_token: &str) -> Self {
        Self {
            access_token: access_token.to_string(),
            token_type: "Bearer".to_string(),
            expires_in: 3600,
            refresh_token: Some(format!("{}-refresh", access_token)),
            scope: "playlist-read-private".to_string(),
        }
    }
}
