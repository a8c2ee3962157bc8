use std::sync::Arc;

use tracing::{debug, info};
use url::Url;

use crate::auth::correlation::CorrelationStore;
use crate::auth::credentials::{AuthSession, Provider};
use crate::auth::oauth::TokenExchanger;
use crate::error::{AppError, Result};

/// Where to send the user for one authorization leg.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub provider: Provider,
    pub state: String,
    pub url: String,
}

/// Query parameters a provider appends to its redirect.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthCallback {
    pub code: String,
    pub state: Option<String>,
}

impl AuthCallback {
    pub fn from_redirect_url(redirect_url: &str) -> Result<Self> {
        let url = Url::parse(redirect_url.trim())?;

        let mut code = None;
        let mut state = None;
        let mut error = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()).filter(|s| !s.is_empty()),
                "error" => error = Some(value.into_owned()),
                _ => {}
            }
        }

        if let Some(error) = error {
            return Err(AppError::Auth(format!("Authorization denied: {}", error)));
        }

        let code = code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::Auth("Redirect URL has no authorization code".into()))?;

        Ok(Self { code, state })
    }
}

/// Runs the two authorization legs so that tokens from whichever leg
/// finished first survive the redirect of the second.
pub struct AuthCoordinator {
    store: Arc<CorrelationStore>,
    spotify: Arc<dyn TokenExchanger>,
    youtube: Arc<dyn TokenExchanger>,
}

impl AuthCoordinator {
    pub fn new(
        store: Arc<CorrelationStore>,
        spotify: Arc<dyn TokenExchanger>,
        youtube: Arc<dyn TokenExchanger>,
    ) -> Self {
        Self {
            store,
            spotify,
            youtube,
        }
    }

    fn exchanger(&self, provider: Provider) -> &dyn TokenExchanger {
        match provider {
            Provider::Spotify => self.spotify.as_ref(),
            Provider::YouTube => self.youtube.as_ref(),
        }
    }

    /// Start a leg for `provider`. If the session already holds the other
    /// provider's tokens they are parked under the new state token.
    pub async fn begin(
        &self,
        provider: Provider,
        session: &AuthSession,
    ) -> Result<AuthorizationRequest> {
        let state = CorrelationStore::issue_token();

        if let Some(existing) = session.get(provider.other()) {
            let (spotify, youtube) = match provider.other() {
                Provider::Spotify => (Some(existing.clone()), None),
                Provider::YouTube => (None, Some(existing.clone())),
            };
            self.store.upsert(&state, spotify, youtube).await;
            info!(
                "Saved {} tokens before redirecting to {}",
                provider.other(),
                provider
            );
        }

        let url = self.exchanger(provider).authorize_url(&state)?;

        Ok(AuthorizationRequest {
            provider,
            state,
            url,
        })
    }

    /// Read the redirect for `request` with the provider's own parser, which
    /// rejects a state other than the one issued.
    pub fn parse_callback(
        &self,
        request: &AuthorizationRequest,
        redirect_url: &str,
    ) -> Result<AuthCallback> {
        self.exchanger(request.provider)
            .parse_callback(&request.state, redirect_url)
    }

    /// Finish a leg: exchange the code, then consume the correlation entry
    /// and restore the other provider's parked tokens into the session.
    pub async fn complete(
        &self,
        provider: Provider,
        callback: &AuthCallback,
        session: &mut AuthSession,
    ) -> Result<()> {
        let credentials = self.exchanger(provider).exchange_code(&callback.code).await?;
        info!("{} authorization complete", provider);

        if let Some(state) = &callback.state {
            match self.store.take(state).await {
                Some(entry) => {
                    let parked = match provider.other() {
                        Provider::Spotify => entry.spotify,
                        Provider::YouTube => entry.youtube,
                    };
                    if let Some(parked) = parked {
                        session.set(provider.other(), parked);
                        info!("Restored {} tokens from state", provider.other());
                    }
                }
                None => debug!("No parked tokens for this state"),
            }
        }

        session.set(provider, credentials);
        Ok(())
    }
}
