//! The small slice of OpenID Connect a public client needs: discovery, an
//! authorization-code request with PKCE, and the token endpoint grants.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use rand::RngCore;
use reqwest::{Client, Response};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use super::store::StoredSession;
use crate::config::IdentityConfig;
use crate::error::{Error, Result};

const DISCOVERY_PATH: &str = "/oidc/.well-known/openid-configuration";
const SCOPES: &str = "openid offline_access profile";

/// Endpoints advertised by the provider's discovery document.
#[derive(Deserialize, Debug, Clone)]
pub struct ProviderMetadata {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
    #[serde(default)]
    pub revocation_endpoint: Option<String>,
}

/// One sign-in attempt: the PKCE verifier and the anti-forgery state.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub verifier: String,
    pub state: String,
}

impl AuthorizationRequest {
    pub fn new() -> Self {
        Self {
            verifier: random_token(),
            state: random_token(),
        }
    }

    pub fn challenge(&self) -> String {
        pkce_challenge(&self.verifier)
    }
}

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    pub expires_in: i64,
}

impl TokenResponse {
    pub fn into_session(self) -> StoredSession {
        StoredSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            id_token: self.id_token,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
        }
    }
}

#[derive(Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

pub struct OidcClient {
    http: Client,
    identity: IdentityConfig,
}

impl OidcClient {
    pub fn new(identity: IdentityConfig) -> Result<Self> {
        Ok(Self {
            http: Client::builder().build()?,
            identity,
        })
    }

    pub fn identity(&self) -> &IdentityConfig {
        &self.identity
    }

    pub async fn discover(&self) -> Result<ProviderMetadata> {
        let url = format!("{}{DISCOVERY_PATH}", self.identity.endpoint);
        debug!(url = url.as_str(), "fetching provider metadata");

        let discovery_error = |reason: String| Error::Discovery {
            url: url.clone(),
            reason,
        };

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| discovery_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(discovery_error(format!("status {}", response.status())));
        }

        response
            .json()
            .await
            .map_err(|e| discovery_error(e.to_string()))
    }

    pub fn authorization_url(
        &self,
        provider: &ProviderMetadata,
        request: &AuthorizationRequest,
        redirect_uri: &str,
    ) -> Result<Url> {
        let mut url =
            Url::parse(&provider.authorization_endpoint).map_err(|_| Error::InvalidUrl {
                field: "authorization endpoint",
                value: provider.authorization_endpoint.clone(),
            })?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.identity.app_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("response_type", "code")
                .append_pair("scope", SCOPES)
                .append_pair("prompt", "consent")
                .append_pair("state", &request.state)
                .append_pair("code_challenge", &request.challenge())
                .append_pair("code_challenge_method", "S256");
            if let Some(resource) = &self.identity.resource {
                query.append_pair("resource", resource);
            }
        }

        Ok(url)
    }

    pub async fn exchange_code(
        &self,
        provider: &ProviderMetadata,
        request: &AuthorizationRequest,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.identity.app_id.as_str()),
            ("code_verifier", request.verifier.as_str()),
        ];
        if let Some(resource) = &self.identity.resource {
            form.push(("resource", resource.as_str()));
        }

        let response = self
            .http
            .post(&provider.token_endpoint)
            .form(&form)
            .send()
            .await?;

        Ok(token_response(response).await?.json().await?)
    }

    pub async fn refresh(
        &self,
        provider: &ProviderMetadata,
        refresh_token: &str,
    ) -> Result<TokenResponse> {
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.identity.app_id.as_str()),
        ];
        if let Some(resource) = &self.identity.resource {
            form.push(("resource", resource.as_str()));
        }

        let response = self
            .http
            .post(&provider.token_endpoint)
            .form(&form)
            .send()
            .await?;

        Ok(token_response(response).await?.json().await?)
    }

    /// Revoke a refresh token. Providers without a revocation endpoint are
    /// skipped.
    pub async fn revoke(&self, provider: &ProviderMetadata, refresh_token: &str) -> Result<()> {
        let Some(endpoint) = &provider.revocation_endpoint else {
            return Ok(());
        };

        let form = [
            ("token", refresh_token),
            ("token_type_hint", "refresh_token"),
            ("client_id", self.identity.app_id.as_str()),
        ];

        let response = self.http.post(endpoint).form(&form).send().await?;
        token_response(response).await?;
        Ok(())
    }

    pub fn end_session_url(
        &self,
        provider: &ProviderMetadata,
        post_logout_redirect_uri: &str,
        id_token: Option<&str>,
    ) -> Option<Url> {
        let mut url = Url::parse(provider.end_session_endpoint.as_deref()?).ok()?;

        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("client_id", &self.identity.app_id)
                .append_pair("post_logout_redirect_uri", post_logout_redirect_uri);
            if let Some(id_token) = id_token {
                query.append_pair("id_token_hint", id_token);
            }
        }

        Some(url)
    }
}

/// Map a non-success token endpoint answer to `Error::Provider`.
async fn token_response(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<OAuthErrorBody>(&body) {
        Ok(OAuthErrorBody {
            error,
            error_description: Some(description),
        }) => format!("{error}: {description}"),
        Ok(OAuthErrorBody { error, .. }) => error,
        Err(_) => format!("status {status}: {body}"),
    };

    Err(Error::Provider(message))
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge (RFC 7636 section 4.2).
pub fn pkce_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration as StdDuration;

    use super::*;

    fn identity(resource: Option<&str>) -> IdentityConfig {
        IdentityConfig {
            endpoint: "https://tenant.logto.app".to_string(),
            app_id: "app-1".to_string(),
            resource: resource.map(String::from),
            sign_in_timeout: StdDuration::from_secs(5),
        }
    }

    fn provider() -> ProviderMetadata {
        ProviderMetadata {
            authorization_endpoint: "https://tenant.logto.app/oidc/auth".to_string(),
            token_endpoint: "https://tenant.logto.app/oidc/token".to_string(),
            end_session_endpoint: Some("https://tenant.logto.app/oidc/session/end".to_string()),
            revocation_endpoint: None,
        }
    }

    fn query_of(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn pkce_matches_rfc7636_example() {
        assert_eq!(
            pkce_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn requests_are_unpredictable() {
        let a = AuthorizationRequest::new();
        let b = AuthorizationRequest::new();

        assert_ne!(a.state, b.state);
        assert_ne!(a.verifier, b.verifier);
        assert_eq!(a.verifier.len(), 43);
    }

    #[test]
    fn authorization_url_carries_pkce_and_resource() {
        let client = OidcClient::new(identity(Some("https://api.example.com"))).unwrap();
        let request = AuthorizationRequest::new();

        let url = client
            .authorization_url(&provider(), &request, "http://localhost:3000/callback")
            .unwrap();
        let query = query_of(&url);

        assert_eq!(url.path(), "/oidc/auth");
        assert_eq!(query["client_id"], "app-1");
        assert_eq!(query["redirect_uri"], "http://localhost:3000/callback");
        assert_eq!(query["response_type"], "code");
        assert_eq!(query["scope"], SCOPES);
        assert_eq!(query["state"], request.state);
        assert_eq!(query["code_challenge"], request.challenge());
        assert_eq!(query["code_challenge_method"], "S256");
        assert_eq!(query["resource"], "https://api.example.com");
    }

    #[test]
    fn authorization_url_omits_missing_resource() {
        let client = OidcClient::new(identity(None)).unwrap();

        let url = client
            .authorization_url(&provider(), &AuthorizationRequest::new(), "http://x/callback")
            .unwrap();

        assert!(!query_of(&url).contains_key("resource"));
    }

    #[test]
    fn end_session_url_includes_hint_when_known() {
        let client = OidcClient::new(identity(None)).unwrap();

        let url = client
            .end_session_url(&provider(), "http://localhost:3000", Some("id-tok"))
            .unwrap();
        let query = query_of(&url);

        assert_eq!(query["post_logout_redirect_uri"], "http://localhost:3000");
        assert_eq!(query["id_token_hint"], "id-tok");

        let mut without = provider();
        without.end_session_endpoint = None;
        assert!(client
            .end_session_url(&without, "http://localhost:3000", None)
            .is_none());
    }
}
