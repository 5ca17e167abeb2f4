//! HTTP client for the EarnIt backend. Every request picks up the stored bearer
//! token, and a 401 response clears the local session before the error reaches
//! the caller.

pub mod config;

use earnit_session::SessionManager;
use reqwest::{
    header::{HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT},
    Method, Request, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

pub use config::{default_base_url, realtime_url, resolve_base_url, BaseUrl, BaseUrlSource};

/// Marker header that opts a single request out of auth injection. Stripped before sending.
pub const SKIP_AUTH_HEADER: &str = "x-skip-auth";

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server rejected the credentials; the local session has already been cleared.
    #[error("{method} {url} was unauthorized; session cleared")]
    Unauthorized { method: Method, url: String },
    /// Any other non-success status, passed through untouched.
    #[error("{method} {url} failed with {status}: {body}")]
    Status {
        method: Method,
        url: String,
        status: StatusCode,
        body: String,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            ApiError::InvalidHeader(_) => None,
        }
    }
}

/// Thin wrapper over `reqwest::Client` bound to a base URL and the session store.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionManager,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionManager) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Client using the process-wide base URL (build env, runtime env, then local default).
    pub fn from_env(session: SessionManager) -> Self {
        Self::new(default_base_url().url.clone(), session)
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn realtime_url(&self, token: &str) -> String {
        realtime_url(&self.base_url, token)
    }

    pub fn request(&self, method: Method, path: &str) -> ApiRequest<'_> {
        ApiRequest {
            client: self,
            builder: self
                .http
                .request(method, self.url(path))
                .header(USER_AGENT, HeaderValue::from_static("earnit-client")),
            skip_auth: false,
        }
    }

    pub fn get(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::PUT, path)
    }

    pub fn delete(&self, path: &str) -> ApiRequest<'_> {
        self.request(Method::DELETE, path)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.get(path).send_json().await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post(path).json(body).send_json().await
    }

    async fn authorize(&self, request: &mut Request, skip_auth: bool) -> Result<(), ApiError> {
        let skip_header = request.headers_mut().remove(SKIP_AUTH_HEADER).is_some();
        if skip_auth || skip_header {
            debug!(url = %request.url(), "auth skipped for request");
            return Ok(());
        }

        match self.session.get_session().await.token {
            Some(token) => {
                if !request.headers().contains_key(AUTHORIZATION) {
                    let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
                    value.set_sensitive(true);
                    request.headers_mut().insert(AUTHORIZATION, value);
                }
            }
            None => {
                if cfg!(debug_assertions) {
                    warn!(url = %request.url(), "no auth token for request");
                }
            }
        }
        Ok(())
    }

    async fn intercept(
        &self,
        method: Method,
        url: String,
        response: Response,
    ) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.session.clear_session().await;
            warn!(%method, %url, "unauthorized response, session cleared");
            return Err(ApiError::Unauthorized { method, url });
        }

        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            method,
            url,
            status,
            body,
        })
    }
}

/// A request being built against an [`ApiClient`].
pub struct ApiRequest<'a> {
    client: &'a ApiClient,
    builder: reqwest::RequestBuilder,
    skip_auth: bool,
}

impl ApiRequest<'_> {
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        self.builder = self.builder.json(body);
        self
    }

    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        self.builder = self.builder.query(query);
        self
    }

    /// Send without the stored bearer token (pre-auth endpoints such as code redemption).
    pub fn skip_auth(mut self) -> Self {
        self.skip_auth = true;
        self
    }

    /// Send once. No retry; errors other than 401 carry no side effects.
    #[instrument(skip_all)]
    pub async fn send(self) -> Result<Response, ApiError> {
        let mut request = self.builder.build()?;
        self.client.authorize(&mut request, self.skip_auth).await?;

        let method = request.method().clone();
        let url = request.url().to_string();
        debug!(%method, %url, "sending request");
        let response = self.client.http.execute(request).await?;
        self.client.intercept(method, url, response).await
    }

    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        Ok(self.send().await?.json().await?)
    }
}
