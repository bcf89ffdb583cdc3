//! Authentication state for the PikPak APIs.
//!
//! [`SessionManager`] owns the access/refresh token pair. Callers only issue
//! requests through it; tokens never leave this module. A request rejected with
//! HTTP 401 triggers one refresh and one retry. Concurrent 401s coalesce into a
//! single refresh: the refresh lock is taken, and a caller that finds the token
//! generation already advanced simply retries with the new token.

use super::wire::{ErrorBody, RefreshRequest, SigninRequest, TokenResponse};
use super::{CLIENT_ID, CLIENT_SECRET};
use crate::error::{AuthError, Error, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};

/// Access/refresh pair; always replaced as a whole
#[derive(Clone)]
struct Credentials {
    access_token: String,
    refresh_token: String,
}

impl From<TokenResponse> for Credentials {
    fn from(tokens: TokenResponse) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

#[derive(Default)]
struct TokenState {
    credentials: Option<Credentials>,
    /// Incremented every time the credentials are replaced
    generation: u64,
}

/// Login, refresh and authorized request dispatch
pub struct SessionManager {
    http: reqwest::Client,
    user_base: String,
    username: String,
    password: String,
    state: RwLock<TokenState>,
    refresh_lock: Mutex<()>,
}

impl SessionManager {
    /// Create a session; no request is made until [`login`](Self::login)
    pub fn new(
        http: reqwest::Client,
        user_base: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            http,
            user_base: user_base.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            state: RwLock::new(TokenState::default()),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Exchange the account identity for a fresh token pair
    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/v1/auth/signin", self.user_base);
        let body = SigninRequest {
            client_id: CLIENT_ID,
            client_secret: CLIENT_SECRET,
            username: &self.username,
            password: &self.password,
        };

        let tokens = self.token_exchange(&url, &body).await?;
        self.store(tokens.into()).await;
        tracing::info!(username = %self.username, "logged in to PikPak");
        Ok(())
    }

    /// Exchange the refresh token for a new pair
    ///
    /// On failure the previous credentials stay in place.
    pub async fn refresh(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// True once a login has succeeded
    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.credentials.is_some()
    }

    /// Send a JSON request with the current access token and decode the reply
    ///
    /// A 401 triggers one refresh and one retry; a second 401 is
    /// [`AuthError::Unauthorized`]. Other non-success statuses become
    /// [`Error::Remote`].
    pub async fn authorized_request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
    ) -> Result<T> {
        let (token, generation) = self.current_token().await?;
        let response = self.send(method.clone(), url, query, body, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return decode(response).await;
        }

        tracing::debug!(url, "access token rejected, refreshing");
        self.refresh_after(generation).await?;

        let (token, _) = self.current_token().await?;
        let response = self.send(method, url, query, body, &token).await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(url, "request still unauthorized after refresh");
            return Err(AuthError::Unauthorized.into());
        }
        decode(response).await
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        body: Option<&serde_json::Value>,
        token: &str,
    ) -> Result<reqwest::Response> {
        let mut request = self.http.request(method, url).bearer_auth(token);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }

    async fn current_token(&self) -> Result<(String, u64)> {
        let state = self.state.read().await;
        match &state.credentials {
            Some(credentials) => Ok((credentials.access_token.clone(), state.generation)),
            None => Err(AuthError::NotLoggedIn.into()),
        }
    }

    /// Refresh unless another caller already replaced the token seen at `generation`
    async fn refresh_after(&self, generation: u64) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        if self.state.read().await.generation != generation {
            tracing::debug!("credentials already refreshed by a concurrent request");
            return Ok(());
        }
        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<()> {
        let refresh_token = match &self.state.read().await.credentials {
            Some(credentials) => credentials.refresh_token.clone(),
            None => return Err(AuthError::NotLoggedIn.into()),
        };

        let url = format!("{}/v1/auth/token", self.user_base);
        let body = RefreshRequest {
            client_id: CLIENT_ID,
            client_secret: CLIENT_SECRET,
            grant_type: "refresh_token",
            refresh_token: &refresh_token,
        };

        let tokens = self.token_exchange(&url, &body).await.inspect_err(|e| {
            tracing::warn!(error = %e, "credential refresh failed");
        })?;
        self.store(tokens.into()).await;
        tracing::info!("refreshed PikPak credentials");
        Ok(())
    }

    async fn token_exchange<B: serde::Serialize>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<TokenResponse> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message: ErrorBody::message_from(&bytes),
            }
            .into());
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| AuthError::Network(format!("malformed token response: {e}")).into())
    }

    async fn store(&self, credentials: Credentials) {
        let mut state = self.state.write().await;
        state.credentials = Some(credentials);
        state.generation += 1;
    }
}

/// Decode a drive API response, mapping error statuses to [`Error::Remote`]
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(Error::Remote {
            status: status.as_u16(),
            message: ErrorBody::message_from(&bytes),
        });
    }
    Ok(serde_json::from_slice(&bytes)?)
}
