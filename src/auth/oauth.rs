use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

use crate::auth::credentials::Credentials;
use crate::auth::flow::AuthCallback;
use crate::config::Config;
use crate::error::{AppError, Result};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const GOOGLE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/youtube.force-ssl"];

/// The two halves of an authorization-code leg.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    fn authorize_url(&self, state: &str) -> Result<String>;

    async fn exchange_code(&self, code: &str) -> Result<Credentials>;

    /// Read the redirect the provider sent back for the attempt issued with
    /// `state`. Redirects carrying any other state are rejected.
    fn parse_callback(&self, state: &str, redirect_url: &str) -> Result<AuthCallback> {
        let callback = AuthCallback::from_redirect_url(redirect_url)?;
        if callback.state.as_deref() != Some(state) {
            return Err(AppError::Auth(
                "Redirect does not belong to this authorization attempt".into(),
            ));
        }
        Ok(callback)
    }
}

/// Authorization-code client for Google's OAuth endpoints.
pub struct GoogleOAuth {
    http_client: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuth {
    pub fn new(config: &Config) -> Self {
        Self {
            http_client: Client::new(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<Credentials> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Auth(format!(
                "Google token request failed ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to parse Google token response: {}", e)))
    }

    /// Exchange a refresh token for a new access token. The returned
    /// credentials keep the previous refresh token when Google does not
    /// rotate it.
    pub async fn refresh(&self, credentials: &Credentials) -> Result<Credentials> {
        let refresh_token = credentials
            .refresh_token
            .as_deref()
            .ok_or_else(|| AppError::Auth("No Google refresh token available".into()))?;

        let mut refreshed = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;

        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token.to_string());
        }
        if refreshed.scope.is_empty() {
            refreshed.scope = credentials.scope.clone();
        }

        info!("Refreshed Google access token");
        Ok(refreshed)
    }
}

#[async_trait]
impl TokenExchanger for GoogleOAuth {
    fn authorize_url(&self, state: &str) -> Result<String> {
        let scope = GOOGLE_SCOPES.join(" ");
        let params = [
            ("client_id", self.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("scope", scope.as_str()),
            ("state", state),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ];

        let url = Url::parse_with_params(GOOGLE_AUTH_URL, &params)?;
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<Credentials> {
        debug!("Exchanging Google authorization code");

        let credentials = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .await?;

        info!(
            "Google tokens received (refresh token present: {})",
            credentials.refresh_token.is_some()
        );

        Ok(credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query_value(url: &str, key: &str) -> Option<String> {
        Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_google_authorize_url_requests_offline_access() {
        let oauth = GoogleOAuth::new(&Config::mock());
        let url = oauth.authorize_url("xyz").unwrap();

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert_eq!(query_value(&url, "state").as_deref(), Some("xyz"));
        assert_eq!(query_value(&url, "access_type").as_deref(), Some("offline"));
        assert_eq!(query_value(&url, "prompt").as_deref(), Some("consent"));
        assert_eq!(
            query_value(&url, "redirect_uri").as_deref(),
            Some("http://127.0.0.1:8888/google-callback")
        );
    }

    #[test]
    fn test_callback_must_carry_issued_state() {
        let oauth = GoogleOAuth::new(&Config::mock());

        let callback = oauth
            .parse_callback(
                "xyz",
                "http://127.0.0.1:8888/google-callback?code=4/abc&state=xyz",
            )
            .unwrap();
        assert_eq!(callback.code, "4/abc");

        assert!(
            oauth
                .parse_callback(
                    "xyz",
                    "http://127.0.0.1:8888/google-callback?code=4/abc&state=other",
                )
                .is_err()
        );
        assert!(
            oauth
                .parse_callback("xyz", "http://127.0.0.1:8888/google-callback?code=4/abc")
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_refresh_requires_refresh_token() {
        let oauth = GoogleOAuth::new(&Config::mock());
        let mut credentials = Credentials::mock("token");
        credentials.refresh_token = None;

        assert!(matches!(
            oauth.refresh(&credentials).await,
            Err(AppError::Auth(_))
        ));
    }
}
