//! Session gate: decides whether the user list may be shown and runs the
//! provider's redirect flow for sign-in and sign-out.

mod callback;
mod oidc;
mod store;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::client::AccessTokenSource;
use crate::config::IdentityConfig;
use crate::error::{Error, Result};

use callback::{CallbackParams, CallbackServer};
use oidc::{AuthorizationRequest, OidcClient, ProviderMetadata};
pub use store::{SessionStore, StoredSession};

/// Time left for the browser to load the root page after the redirect.
const ROOT_PAGE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    SignedOut,
    SignedIn { expires_at: DateTime<Utc> },
    /// Access token expired; a refresh will be attempted on next use.
    Expired { expires_at: DateTime<Utc> },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, SessionState::SignedOut)
    }
}

pub struct SessionGate {
    oidc: OidcClient,
    store: SessionStore,
}

impl SessionGate {
    pub fn new(identity: IdentityConfig, store: SessionStore) -> Result<Self> {
        Ok(Self {
            oidc: OidcClient::new(identity)?,
            store,
        })
    }

    pub fn state(&self) -> SessionState {
        match self.store.load() {
            None => SessionState::SignedOut,
            Some(session) if !session.is_expired() => SessionState::SignedIn {
                expires_at: session.expires_at,
            },
            Some(session) if session.refresh_token.is_some() => SessionState::Expired {
                expires_at: session.expires_at,
            },
            Some(_) => SessionState::SignedOut,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Current access token, refreshed first if it has expired.
    pub async fn access_token(&self) -> Result<String> {
        let session = self.store.load().ok_or(Error::NotSignedIn)?;
        if !session.is_expired() {
            return Ok(session.access_token);
        }

        let refresh_token = session.refresh_token.ok_or(Error::NotSignedIn)?;
        match self.refresh(&refresh_token).await {
            Ok(refreshed) => Ok(refreshed.access_token),
            Err(e) => {
                warn!(error = %e, "token refresh failed; signing out");
                self.store.clear()?;
                Err(Error::NotSignedIn)
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredSession> {
        let provider = self.oidc.discover().await?;
        let mut refreshed = self.oidc.refresh(&provider, refresh_token).await?.into_session();

        // Providers without rotation omit the refresh token.
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token.to_string());
        }

        self.store.save(&refreshed)?;
        info!(expires_at = %refreshed.expires_at, "session refreshed");
        Ok(refreshed)
    }

    /// Run the authorization-code flow. `open` receives the URL the user must
    /// visit; the provider then redirects to `redirect_uri`, where a local
    /// listener exchanges the code and forwards the browser to `/`.
    pub async fn sign_in(
        &self,
        redirect_uri: &str,
        open: impl FnOnce(&str),
    ) -> Result<StoredSession> {
        let provider = self.oidc.discover().await?;
        let request = AuthorizationRequest::new();
        let url = self.oidc.authorization_url(&provider, &request, redirect_uri)?;

        let mut server = CallbackServer::bind(redirect_uri).await?;
        open(url.as_str());

        let timeout = self.oidc.identity().sign_in_timeout;
        let session = tokio::time::timeout(
            timeout,
            self.complete_sign_in(&mut server, &provider, &request, redirect_uri),
        )
        .await
        .map_err(|_| Error::SignInTimeout(timeout.as_secs()))??;

        tokio::time::sleep(ROOT_PAGE_GRACE).await;
        drop(server);

        info!(expires_at = %session.expires_at, "signed in");
        Ok(session)
    }

    async fn complete_sign_in(
        &self,
        server: &mut CallbackServer,
        provider: &ProviderMetadata,
        request: &AuthorizationRequest,
        redirect_uri: &str,
    ) -> Result<StoredSession> {
        let callback = server
            .next()
            .await
            .ok_or_else(|| Error::Provider("callback listener stopped".to_string()))?;

        match self
            .exchange(&callback.params, provider, request, redirect_uri)
            .await
        {
            Ok(session) => {
                callback.complete(true);
                Ok(session)
            }
            Err(e) => {
                callback.complete(false);
                Err(e)
            }
        }
    }

    async fn exchange(
        &self,
        params: &CallbackParams,
        provider: &ProviderMetadata,
        request: &AuthorizationRequest,
        redirect_uri: &str,
    ) -> Result<StoredSession> {
        if let Some(error) = &params.error {
            let message = match &params.error_description {
                Some(description) => format!("{error}: {description}"),
                None => error.clone(),
            };
            return Err(Error::Provider(message));
        }

        if params.state.as_deref() != Some(request.state.as_str()) {
            return Err(Error::StateMismatch);
        }

        let code = params
            .code
            .as_deref()
            .ok_or_else(|| Error::Provider("callback carried no code".to_string()))?;

        let session = self
            .oidc
            .exchange_code(provider, request, code, redirect_uri)
            .await?
            .into_session();
        self.store.save(&session)?;
        Ok(session)
    }

    /// Forget the local session and return the provider's end-session URL,
    /// if it advertises one. Revocation is best effort.
    pub async fn sign_out(&self, redirect_uri: &str) -> Result<Option<String>> {
        let session = self.store.load();
        self.store.clear()?;
        info!("local session cleared");

        let provider = match self.oidc.discover().await {
            Ok(provider) => provider,
            Err(e) => {
                warn!(error = %e, "skipping provider sign-out");
                return Ok(None);
            }
        };

        if let Some(refresh_token) = session.as_ref().and_then(|s| s.refresh_token.as_deref()) {
            if let Err(e) = self.oidc.revoke(&provider, refresh_token).await {
                warn!(error = %e, "refresh token revocation failed");
            }
        }

        let id_token = session.as_ref().and_then(|s| s.id_token.as_deref());
        Ok(self
            .oidc
            .end_session_url(&provider, redirect_uri, id_token)
            .map(String::from))
    }
}

#[async_trait]
impl AccessTokenSource for SessionGate {
    async fn access_token(&self) -> Result<String> {
        SessionGate::access_token(self).await
    }
}
