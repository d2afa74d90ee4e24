use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use super::decode;
use crate::error::ClientError;
use crate::session::SessionManager;

/// How a request carries the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Fail fast without a token.
    Required,
    /// Attach the token when there is one (guest uploads).
    Optional,
    /// Never attach it (login, register, health).
    Anonymous,
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    sessions: SessionManager,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        sessions: SessionManager,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Network {
                endpoint: base_url.to_string(),
                source: e,
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            sessions,
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Sends a request, attaching `Authorization: Token <t>` per `auth`.
    ///
    /// A 401 on a request that carried a token clears the session and
    /// returns [`ClientError::Unauthorized`]; every other status is handed
    /// back to the caller untouched.
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        auth: AuthMode,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ClientError> {
        self.request(method, &self.url(endpoint), endpoint, "application/json", auth, build)
            .await
    }

    /// Fetches an absolute URL (a media link from a document) as raw bytes.
    pub async fn get_bytes(&self, url: &str, auth: AuthMode) -> Result<Bytes, ClientError> {
        let resp = self
            .request(Method::GET, url, url, "*/*", auth, |r| r)
            .await?;
        decode::read_bytes(url, resp).await
    }

    async fn request(
        &self,
        method: Method,
        url: &str,
        endpoint: &str,
        accept: &str,
        auth: AuthMode,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<Response, ClientError> {
        let token = match auth {
            AuthMode::Anonymous => None,
            AuthMode::Optional => self.sessions.token()?,
            AuthMode::Required => match self.sessions.token()? {
                Some(t) => Some(t),
                None => {
                    warn!(endpoint, "no session token, request not sent");
                    return Err(ClientError::Unauthorized {
                        endpoint: endpoint.to_string(),
                    });
                }
            },
        };

        let mut req = self
            .http
            .request(method.clone(), url)
            .header(header::ACCEPT, accept);
        if let Some(t) = &token {
            req = req.header(header::AUTHORIZATION, format!("Token {}", t));
        }
        let req = build(req);

        debug!(%method, endpoint, authenticated = token.is_some(), "request");
        let resp = req.send().await.map_err(|e| {
            error!(%method, endpoint, error = %e, "request failed");
            ClientError::Network {
                endpoint: endpoint.to_string(),
                source: e,
            }
        })?;

        if resp.status() == StatusCode::UNAUTHORIZED && token.is_some() {
            warn!(%method, endpoint, "token rejected, clearing session");
            if let Err(e) = self.sessions.clear() {
                error!(error = %e, "failed to clear session after 401");
            }
            return Err(ClientError::Unauthorized {
                endpoint: endpoint.to_string(),
            });
        }
        Ok(resp)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        auth: AuthMode,
    ) -> Result<T, ClientError> {
        let resp = self.send(Method::GET, endpoint, auth, |r| r).await?;
        decode::read_json(endpoint, resp).await
    }

    pub async fn post_json<B, T>(
        &self,
        endpoint: &str,
        auth: AuthMode,
        body: &B,
    ) -> Result<T, ClientError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .send(Method::POST, endpoint, auth, |r| r.json(body))
            .await?;
        decode::read_json(endpoint, resp).await
    }
}
