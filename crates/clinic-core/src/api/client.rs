//! HTTP client for the clinic backend REST API.
//!
//! Every request carries the session's bearer token when one is stored.
//! A 401 triggers one refresh-and-retry (see [`super::retry`]); a second
//! rejection or a failed refresh clears the session and surfaces
//! `ApiError::Unauthenticated`.

use std::sync::Arc;
use std::time::Duration;

use reqwest::multipart::Form;
use reqwest::{header, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::Session;
use crate::models::{LoginRequest, LoginResponse, SignupRequest};

use super::retry::{with_refresh, MAX_REFRESH_ATTEMPTS};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Exchanges the refresh cookie for a new access token.
pub const REFRESH_PATH: &str = "/api/users/auth/token/refresh/";

/// Username/password login.
pub const LOGIN_PATH: &str = "/api/users/auth/token/";

/// Account registration.
pub const SIGNUP_PATH: &str = "/api/users/register/";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken", alias = "access")]
    access_token: String,
}

/// Per-request extras supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: header::HeaderMap,
}

impl RequestOptions {
    pub fn with_header(mut self, name: header::HeaderName, value: header::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Builds a fresh multipart body. A `Form` is consumed when sent, so a
/// retried upload needs a new one.
pub type FormBuilder<'a> = &'a (dyn Fn() -> Result<Form, ApiError> + Send + Sync);

enum Body<'a> {
    Empty,
    Json(&'a Value),
    Multipart(FormBuilder<'a>),
}

/// Everything needed to send (and re-send) one logical request.
struct Outbound<'a> {
    method: Method,
    path: &'a str,
    body: Body<'a>,
    options: &'a RequestOptions,
}

/// API client for the clinic backend.
/// Clone is cheap - reqwest::Client and the session are reference counted.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    /// Create a new API client with the default request timeout
    pub fn new(base_url: impl Into<String>, session: Arc<Session>) -> Result<Self, ApiError> {
        Self::with_timeout(
            base_url,
            session,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        session: Arc<Session>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ApiError::InvalidRequest("base URL is required".into()));
        }

        // The refresh credential is an HTTP-only cookie set at login.
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(token: Option<&str>) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidRequest("token is not a valid header value".into()))?;
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Decode a successful response. An empty body decodes as JSON `null`.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response, url: &str) -> Result<T, ApiError> {
        let text = response.text().await?;
        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body)
            .map_err(|e| ApiError::Decode(format!("{}: {}", url, e)))
    }

    /// One attempt, no refresh handling.
    async fn send_once<T: DeserializeOwned>(
        &self,
        outbound: &Outbound<'_>,
        token: Option<String>,
    ) -> Result<T, ApiError> {
        let url = self.url(outbound.path);
        let mut headers = outbound.options.headers.clone();
        headers.extend(Self::auth_headers(token.as_deref())?);

        let mut builder = self
            .client
            .request(outbound.method.clone(), &url)
            .headers(headers);
        builder = match outbound.body {
            Body::Empty => builder,
            Body::Json(body) => builder.json(body),
            Body::Multipart(form) => builder.multipart(form()?),
        };

        debug!(method = %outbound.method, url = %url, authenticated = token.is_some(), "Sending request");
        let response = builder.send().await?;
        let response = Self::check_response(response).await?;
        Self::decode(response, &url).await
    }

    /// Get a replacement for `rejected`.
    ///
    /// Refreshes are serialized; if another request already replaced the
    /// rejected token while this one waited, the newer token is reused and
    /// the refresh endpoint is not called again.
    async fn refresh_after(&self, rejected: Option<String>) -> Result<String, ApiError> {
        let _gate = self.session.refresh_gate().await;

        if let Some(current) = self.session.token().await {
            if rejected.as_deref() != Some(current.as_str()) {
                debug!("Token already refreshed by a concurrent request");
                return Ok(current);
            }
        }

        let token = self.refresh_token().await?;
        if let Err(e) = self.session.set_token(token.clone()).await {
            warn!(error = %e, "Failed to persist refreshed token");
        }
        Ok(token)
    }

    /// Call the refresh endpoint directly. Never wrapped in the 401 retry.
    pub async fn refresh_token(&self) -> Result<String, ApiError> {
        let url = self.url(REFRESH_PATH);
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        let refreshed: RefreshResponse = Self::decode(response, &url).await?;
        debug!("Access token refreshed");
        Ok(refreshed.access_token)
    }

    /// Issue an authenticated request and decode the JSON response.
    ///
    /// On a 401 the token is refreshed and the request re-sent once. If that
    /// fails, the session is cleared and `ApiError::Unauthenticated` returned.
    /// All other errors propagate unchanged, with no retry.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        options: Option<RequestOptions>,
    ) -> Result<T, ApiError> {
        let options = options.unwrap_or_default();
        let outbound = Outbound {
            method,
            path,
            body: body.as_ref().map_or(Body::Empty, Body::Json),
            options: &options,
        };
        self.send_authenticated(&outbound).await
    }

    /// POST a multipart form with the same auth and retry handling as
    /// [`request`](Self::request). `form` is called once per attempt.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: FormBuilder<'_>,
    ) -> Result<T, ApiError> {
        let options = RequestOptions::default();
        let outbound = Outbound {
            method: Method::POST,
            path,
            body: Body::Multipart(form),
            options: &options,
        };
        self.send_authenticated(&outbound).await
    }

    async fn send_authenticated<T: DeserializeOwned>(
        &self,
        outbound: &Outbound<'_>,
    ) -> Result<T, ApiError> {
        let token = self.session.token().await;
        let result = with_refresh(
            token,
            MAX_REFRESH_ATTEMPTS,
            |token| self.send_once(outbound, token),
            |rejected| self.refresh_after(rejected),
        )
        .await;

        if let Err(ApiError::Unauthenticated) = result {
            if let Err(e) = self.session.clear_token().await {
                warn!(error = %e, "Failed to clear stored token");
            }
        }
        result
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(Method::GET, path, None, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to encode body: {}", e)))?;
        self.request(Method::POST, path, Some(body), None).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let _: Value = self.request(Method::DELETE, path, None, None).await?;
        Ok(())
    }

    // ===== Authentication =====

    /// Log in with username and password and store the issued access token.
    ///
    /// Sent without a bearer token and outside the refresh retry, so bad
    /// credentials fail fast with `ApiError::InvalidCredentials`.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = serde_json::to_value(LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        })
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let options = RequestOptions::default();
        let outbound = Outbound {
            method: Method::POST,
            path: LOGIN_PATH,
            body: Body::Json(&body),
            options: &options,
        };

        let login: LoginResponse = match self.send_once(&outbound, None).await {
            Err(ApiError::Unauthorized) => return Err(ApiError::InvalidCredentials),
            other => other?,
        };

        if let Err(e) = self.session.set_token(login.access.clone()).await {
            warn!(error = %e, "Failed to persist access token");
        }
        debug!(username = username, "Logged in");
        Ok(login)
    }

    /// Register a new account. Does not log in.
    pub async fn signup(&self, request: &SignupRequest) -> Result<Value, ApiError> {
        self.post(SIGNUP_PATH, request).await
    }

    /// Forget the current token. Safe to call when already logged out.
    pub async fn logout(&self) -> anyhow::Result<()> {
        self.session.clear_token().await
    }
}
