use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::Credentials;
use crate::error::{AppError, Result};
use crate::youtube::catalog::VideoCatalog;
use crate::youtube::models::{CredentialRole, PrivacyStatus, SearchStrategy, YouTubePlaylist};

const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const MUSIC_CATEGORY_ID: &str = "10";

const QUOTA_REASONS: &[&str] = &[
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistSnippet<'a> {
    title: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistStatus {
    privacy_status: PrivacyStatus,
}

#[derive(Debug, Serialize)]
struct CreatePlaylistRequest<'a> {
    snippet: PlaylistSnippet<'a>,
    status: PlaylistStatus,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylist {
    id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId<'a> {
    kind: &'a str,
    video_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet<'a> {
    playlist_id: &'a str,
    resource_id: ResourceId<'a>,
}

#[derive(Debug, Serialize)]
struct InsertPlaylistItemRequest<'a> {
    snippet: PlaylistItemSnippet<'a>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorReason {
    reason: Option<String>,
}

/// Turn a failed YouTube response into a typed error, separating quota
/// exhaustion from everything else.
fn classify_error(status: StatusCode, body: &str, operation: &str) -> AppError {
    let (message, reason) = match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) => {
            let reason = parsed.error.errors.into_iter().find_map(|e| e.reason);
            (parsed.error.message, reason)
        }
        Err(_) => (body.trim().to_string(), None),
    };

    let message = if message.is_empty() {
        status.canonical_reason().unwrap_or("unknown error").to_string()
    } else {
        message
    };

    let is_quota = status == StatusCode::TOO_MANY_REQUESTS
        || reason
            .as_deref()
            .is_some_and(|r| QUOTA_REASONS.contains(&r));

    if is_quota {
        AppError::QuotaExceeded {
            operation: operation.to_string(),
            message,
        }
    } else {
        AppError::YouTubeApi {
            status: status.as_u16(),
            reason,
            message,
        }
    }
}

/// YouTube Data API v3 client holding both credential contexts: the user's
/// OAuth token for mutations and an optional API key for searches.
pub struct YouTubeClient {
    http_client: Client,
    access_token: String,
    api_key: Option<String>,
    search_strategy: SearchStrategy,
}

impl YouTubeClient {
    pub fn new(
        credentials: &Credentials,
        api_key: Option<String>,
        search_strategy: SearchStrategy,
    ) -> Self {
        Self {
            http_client: Client::new(),
            access_token: credentials.access_token.clone(),
            api_key,
            search_strategy,
        }
    }

    fn authorize(&self, request: RequestBuilder, role: CredentialRole) -> Result<RequestBuilder> {
        match role {
            CredentialRole::UserDelegated => Ok(request.bearer_auth(&self.access_token)),
            CredentialRole::AppLevel => {
                let key = self.api_key.as_deref().ok_or_else(|| {
                    AppError::Config("YOUTUBE_API_KEY not set; app-level search unavailable".into())
                })?;
                Ok(request.query(&[("key", key)]))
            }
        }
    }

    async fn check(response: Response, operation: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();
        let error = classify_error(status, &error_text, operation);
        warn!("YouTube {} failed ({}): {}", operation, status, error);
        Err(error)
    }
}

#[async_trait]
impl VideoCatalog for YouTubeClient {
    fn search_strategy(&self) -> &SearchStrategy {
        &self.search_strategy
    }

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> Result<YouTubePlaylist> {
        let request = CreatePlaylistRequest {
            snippet: PlaylistSnippet { title, description },
            status: PlaylistStatus {
                privacy_status: privacy,
            },
        };

        let builder = self
            .http_client
            .post(format!("{}/playlists", YOUTUBE_API_BASE))
            .query(&[("part", "snippet,status")])
            .json(&request);

        let response = self
            .authorize(builder, CredentialRole::UserDelegated)?
            .send()
            .await?;
        let response = Self::check(response, "playlist creation").await?;

        let api_playlist: ApiPlaylist = response.json().await?;
        let playlist = YouTubePlaylist::from_id(api_playlist.id);

        info!("Created YouTube playlist: {} ({})", title, playlist.url);

        Ok(playlist)
    }

    async fn search_video(&self, query: &str, role: CredentialRole) -> Result<Option<String>> {
        let builder = self
            .http_client
            .get(format!("{}/search", YOUTUBE_API_BASE))
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", "1"),
                ("videoCategoryId", MUSIC_CATEGORY_ID),
            ]);

        let response = self.authorize(builder, role)?.send().await?;
        let response = Self::check(response, "search").await?;

        let search_response: SearchResponse = response.json().await?;

        let video_id = search_response
            .items
            .into_iter()
            .next()
            .and_then(|item| item.id.video_id);

        debug!("Search ({}) for {:?} -> {:?}", role, query, video_id);

        Ok(video_id)
    }

    async fn insert_playlist_item(&self, playlist_id: &str, video_id: &str) -> Result<()> {
        let request = InsertPlaylistItemRequest {
            snippet: PlaylistItemSnippet {
                playlist_id,
                resource_id: ResourceId {
                    kind: "youtube#video",
                    video_id,
                },
            },
        };

        let builder = self
            .http_client
            .post(format!("{}/playlistItems", YOUTUBE_API_BASE))
            .query(&[("part", "snippet")])
            .json(&request);

        let response = self
            .authorize(builder, CredentialRole::UserDelegated)?
            .send()
            .await?;
        Self::check(response, "playlist insert").await?;

        debug!("Added video {} to playlist {}", video_id, playlist_id);
        Ok(())
    }
}
