use serde::{Deserialize, Serialize};

const PLAYLIST_URL_BASE: &str = "https://www.youtube.com/playlist?list=";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubePlaylist {
    pub id: String,
    pub url: String,
}

impl YouTubePlaylist {
    pub fn from_id(id: String) -> Self {
        let url = format!("{}{}", PLAYLIST_URL_BASE, id);
        Self { id, url }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Private,
    Public,
    Unlisted,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Private => "private",
            PrivacyStatus::Public => "public",
            PrivacyStatus::Unlisted => "unlisted",
        }
    }
}

impl std::fmt::Display for PrivacyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which credential a destination request is made with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CredentialRole {
    /// API key with the higher search quota. Never used for mutations.
    AppLevel,
    /// The user's OAuth token. Required for playlist creation and inserts.
    UserDelegated,
}

impl std::fmt::Display for CredentialRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialRole::AppLevel => write!(f, "app-level"),
            CredentialRole::UserDelegated => write!(f, "user-delegated"),
        }
    }
}

/// Ordered list of credential roles to try when searching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchStrategy {
    roles: Vec<CredentialRole>,
}

impl SearchStrategy {
    pub fn new(roles: Vec<CredentialRole>) -> Self {
        Self { roles }
    }

    pub fn roles(&self) -> &[CredentialRole] {
        &self.roles
    }
}

impl Default for SearchStrategy {
    fn default() -> Self {
        Self::new(vec![CredentialRole::AppLevel, CredentialRole::UserDelegated])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    NoMatch,
    AppendRejected,
    Quota,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::NoMatch => write!(f, "NoMatch"),
            FailureKind::AppendRejected => write!(f, "AppendRejected"),
            FailureKind::Quota => write!(f, "Quota"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchAndAddResult {
    pub success: bool,
    pub video_id: Option<String>,
    pub error: Option<String>,
    pub kind: Option<FailureKind>,
}

impl SearchAndAddResult {
    pub fn added(video_id: String) -> Self {
        Self {
            success: true,
            video_id: Some(video_id),
            error: None,
            kind: None,
        }
    }

    pub fn failed(kind: FailureKind, video_id: Option<String>, error: String) -> Self {
        Self {
            success: false,
            video_id,
            error: Some(error),
            kind: Some(kind),
        }
    }
}
