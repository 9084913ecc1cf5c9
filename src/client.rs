use std::sync::Arc;

use async_trait::async_trait;
use const_format::concatcp;
use reqwest::{Client, Method, RequestBuilder, Response};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::{User, UserDraft, UserId};

const USER_AGENT: &str = concatcp!("users/", env!("CARGO_PKG_VERSION"));

/// The remote user store. `UserManager` only talks to the API through this.
#[async_trait]
pub trait UsersApi {
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn get_user(&self, id: UserId) -> Result<User>;

    async fn create_user(&self, draft: &UserDraft) -> Result<User>;

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<User>;

    async fn delete_user(&self, id: UserId) -> Result<()>;
}

/// Where the bearer token comes from. Asked once per request, so a source
/// backed by the session can refresh an expired token in between.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// REST client for `{api_url}/api/users`.
pub struct UsersClient {
    http: Client,
    base_url: String,
    tokens: Option<Arc<dyn AccessTokenSource>>,
}

impl UsersClient {
    pub fn new(
        base_url: impl Into<String>,
        tokens: Option<Arc<dyn AccessTokenSource>>,
    ) -> Result<Self> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        })
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = format!("{}{path}", self.base_url);
        debug!(method = method.as_str(), url = url.as_str(), "sending request");

        let request = self.http.request(method, url);
        match &self.tokens {
            Some(tokens) => Ok(request.bearer_auth(tokens.access_token().await?)),
            None => Ok(request),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(Error::Api {
                status: response.status().as_u16(),
                message: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<failed to read response body>".to_string()),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl UsersApi for UsersClient {
    async fn list_users(&self) -> Result<Vec<User>> {
        let response = self.send(self.request(Method::GET, "/users").await?).await?;

        // An empty table comes back as `null`.
        let users: Option<Vec<User>> = response.json().await?;
        Ok(users.unwrap_or_default())
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let response = self
            .send(self.request(Method::GET, &format!("/users/{id}")).await?)
            .await?;
        Ok(response.json().await?)
    }

    async fn create_user(&self, draft: &UserDraft) -> Result<User> {
        let response = self
            .send(self.request(Method::POST, "/users").await?.json(draft))
            .await?;
        Ok(response.json().await?)
    }

    async fn update_user(&self, id: UserId, draft: &UserDraft) -> Result<User> {
        let response = self
            .send(
                self.request(Method::PUT, &format!("/users/{id}"))
                    .await?
                    .json(draft),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn delete_user(&self, id: UserId) -> Result<()> {
        self.send(self.request(Method::DELETE, &format!("/users/{id}")).await?)
            .await?;
        Ok(())
    }
}
