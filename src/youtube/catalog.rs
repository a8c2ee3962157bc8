use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::youtube::models::{
    CredentialRole, FailureKind, PrivacyStatus, SearchAndAddResult, SearchStrategy,
    YouTubePlaylist,
};

pub const NO_MATCH: &str = "no match found";

/// Biases results toward studio recordings over live and cover versions.
const QUERY_SUFFIX: &str = "official audio";

pub fn build_search_query(track_name: &str, artist_name: &str) -> String {
    format!("{} {} {}", track_name, artist_name, QUERY_SUFFIX)
}

/// Destination catalog operations used by the migrator. Implementors supply
/// the three API primitives; matching and fallback live in the provided
/// methods.
#[async_trait]
pub trait VideoCatalog: Send + Sync {
    fn search_strategy(&self) -> &SearchStrategy;

    async fn create_playlist(
        &self,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> Result<YouTubePlaylist>;

    /// Returns the first music-category result, if any.
    async fn search_video(&self, query: &str, role: CredentialRole) -> Result<Option<String>>;

    /// Always performed with the user-delegated credential.
    async fn insert_playlist_item(&self, playlist_id: &str, video_id: &str) -> Result<()>;

    /// Try each role of the search strategy in order, moving on only when a
    /// search errors. An empty result is final.
    async fn find_video(&self, query: &str) -> Result<Option<String>> {
        let mut last_error = None;

        for role in self.search_strategy().roles() {
            match self.search_video(query, *role).await {
                Ok(found) => return Ok(found),
                Err(e) => {
                    warn!("Search with {} credential failed: {}", role, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| AppError::Config("No search credential configured".into())))
    }

    async fn search_and_add(
        &self,
        playlist_id: &str,
        track_name: &str,
        artist_name: &str,
    ) -> SearchAndAddResult {
        let query = build_search_query(track_name, artist_name);

        let video_id = match self.find_video(&query).await {
            Ok(Some(video_id)) => video_id,
            Ok(None) => {
                debug!("No match found for query: {}", query);
                return SearchAndAddResult::failed(FailureKind::NoMatch, None, NO_MATCH.into());
            }
            Err(e) => {
                let kind = if e.is_quota() {
                    FailureKind::Quota
                } else {
                    FailureKind::NoMatch
                };
                return SearchAndAddResult::failed(
                    kind,
                    None,
                    format!("{} (search failed: {})", NO_MATCH, e),
                );
            }
        };

        match self.insert_playlist_item(playlist_id, &video_id).await {
            Ok(()) => SearchAndAddResult::added(video_id),
            Err(e) => {
                let kind = if e.is_quota() {
                    FailureKind::Quota
                } else {
                    FailureKind::AppendRejected
                };
                let reason = format!(
                    "matched video {} but could not add it to the playlist: {}",
                    video_id, e
                );
                SearchAndAddResult::failed(kind, Some(video_id), reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum SearchOutcome {
        Found(&'static str),
        Empty,
        Fails,
        Quota,
    }

    struct MockCatalog {
        strategy: SearchStrategy,
        search: HashMap<CredentialRole, SearchOutcome>,
        insert_error: Option<fn() -> AppError>,
        searches: Mutex<Vec<CredentialRole>>,
        inserts: Mutex<Vec<String>>,
    }

    impl MockCatalog {
        fn new(search: Vec<(CredentialRole, SearchOutcome)>) -> Self {
            Self {
                strategy: SearchStrategy::default(),
                search: search.into_iter().collect(),
                insert_error: None,
                searches: Mutex::new(Vec::new()),
                inserts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VideoCatalog for MockCatalog {
        fn search_strategy(&self) -> &SearchStrategy {
            &self.strategy
        }

        async fn create_playlist(
            &self,
            _title: &str,
            _description: &str,
            _privacy: PrivacyStatus,
        ) -> Result<YouTubePlaylist> {
            Ok(YouTubePlaylist::from_id("PL123".into()))
        }

        async fn search_video(&self, _query: &str, role: CredentialRole) -> Result<Option<String>> {
            self.searches.lock().unwrap().push(role);
            match self.search.get(&role) {
                Some(SearchOutcome::Found(id)) => Ok(Some(id.to_string())),
                Some(SearchOutcome::Empty) | None => Ok(None),
                Some(SearchOutcome::Fails) => Err(AppError::YouTubeApi {
                    status: 400,
                    reason: Some("keyInvalid".into()),
                    message: "API key not valid".into(),
                }),
                Some(SearchOutcome::Quota) => Err(AppError::QuotaExceeded {
                    operation: "search".into(),
                    message: "quota".into(),
                }),
            }
        }

        async fn insert_playlist_item(&self, _playlist_id: &str, video_id: &str) -> Result<()> {
            self.inserts.lock().unwrap().push(video_id.to_string());
            match self.insert_error {
                Some(make_error) => Err(make_error()),
                None => Ok(()),
            }
        }
    }

    #[test]
    fn test_query_has_suffix() {
        assert_eq!(
            build_search_query("Song A", "Artist X"),
            "Song A Artist X official audio"
        );
    }

    #[tokio::test]
    async fn test_app_level_search_is_tried_first() {
        let catalog = MockCatalog::new(vec![
            (CredentialRole::AppLevel, SearchOutcome::Found("vid1")),
            (CredentialRole::UserDelegated, SearchOutcome::Found("vid2")),
        ]);

        let result = catalog.search_and_add("PL123", "Song A", "Artist X").await;

        assert!(result.success);
        assert_eq!(result.video_id.as_deref(), Some("vid1"));
        assert_eq!(*catalog.searches.lock().unwrap(), vec![CredentialRole::AppLevel]);
        assert_eq!(*catalog.inserts.lock().unwrap(), vec!["vid1".to_string()]);
    }

    #[tokio::test]
    async fn test_falls_back_to_user_credential_on_search_error() {
        let catalog = MockCatalog::new(vec![
            (CredentialRole::AppLevel, SearchOutcome::Fails),
            (CredentialRole::UserDelegated, SearchOutcome::Found("vid2")),
        ]);

        let result = catalog.search_and_add("PL123", "Song A", "Artist X").await;

        assert!(result.success);
        assert_eq!(result.video_id.as_deref(), Some("vid2"));
        assert_eq!(
            *catalog.searches.lock().unwrap(),
            vec![CredentialRole::AppLevel, CredentialRole::UserDelegated]
        );
    }

    #[tokio::test]
    async fn test_empty_result_does_not_fall_back() {
        let catalog = MockCatalog::new(vec![
            (CredentialRole::AppLevel, SearchOutcome::Empty),
            (CredentialRole::UserDelegated, SearchOutcome::Found("vid2")),
        ]);

        let result = catalog.search_and_add("PL123", "Song B", "Artist Y").await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some(NO_MATCH));
        assert_eq!(result.kind, Some(FailureKind::NoMatch));
        assert_eq!(catalog.searches.lock().unwrap().len(), 1);
        assert!(catalog.inserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_all_searches_failing_is_a_match_failure() {
        let catalog = MockCatalog::new(vec![
            (CredentialRole::AppLevel, SearchOutcome::Fails),
            (CredentialRole::UserDelegated, SearchOutcome::Fails),
        ]);

        let result = catalog.search_and_add("PL123", "Song A", "Artist X").await;

        assert!(!result.success);
        assert_eq!(result.kind, Some(FailureKind::NoMatch));
        assert!(result.error.unwrap().starts_with(NO_MATCH));
        assert!(catalog.inserts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_quota_is_reported_as_quota() {
        let catalog = MockCatalog::new(vec![
            (CredentialRole::AppLevel, SearchOutcome::Fails),
            (CredentialRole::UserDelegated, SearchOutcome::Quota),
        ]);

        let result = catalog.search_and_add("PL123", "Song A", "Artist X").await;

        assert_eq!(result.kind, Some(FailureKind::Quota));
    }

    #[tokio::test]
    async fn test_rejected_append_keeps_video_id() {
        let mut catalog = MockCatalog::new(vec![(
            CredentialRole::AppLevel,
            SearchOutcome::Found("blocked"),
        )]);
        catalog.insert_error = Some(|| AppError::YouTubeApi {
            status: 403,
            reason: Some("forbidden".into()),
            message: "The video is not available in your region".into(),
        });

        let result = catalog.search_and_add("PL123", "Song A", "Artist X").await;

        assert!(!result.success);
        assert_eq!(result.kind, Some(FailureKind::AppendRejected));
        assert_eq!(result.video_id.as_deref(), Some("blocked"));
        assert!(result.error.unwrap().contains("not available in your region"));
    }

    #[tokio::test]
    async fn test_append_quota_is_distinct() {
        let mut catalog = MockCatalog::new(vec![(
            CredentialRole::AppLevel,
            SearchOutcome::Found("vid1"),
        )]);
        catalog.insert_error = Some(|| AppError::QuotaExceeded {
            operation: "playlist insert".into(),
            message: "quota".into(),
        });

        let result = catalog.search_and_add("PL123", "Song A", "Artist X").await;

        assert_eq!(result.kind, Some(FailureKind::Quota));
        assert!(result.error.unwrap().contains("daily quota resets"));
    }

    #[tokio::test]
    async fn test_empty_strategy_fails_without_searching() {
        let mut catalog = MockCatalog::new(Vec::new());
        catalog.strategy = SearchStrategy::new(Vec::new());

        let result = catalog.search_and_add("PL123", "Song A", "Artist X").await;

        assert!(!result.success);
        assert!(catalog.searches.lock().unwrap().is_empty());
    }
}
