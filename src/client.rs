//! REST client for the TrackGPX backend.
//!
//! Every request reads the bearer token from the [`SessionStore`] right
//! before it is sent. A 401 answer clears the stored token and cached user
//! so the next command starts from a logged-out state.

use crate::config::Config;
use crate::session::{token_preview, SessionStore};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Text used when neither the server nor the transport says anything useful
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Client-side API error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP {status}: {detail}")]
    Server {
        status: u16,
        /// `message` field of the JSON error body, when there is one
        message: Option<String>,
        /// Laravel-style validation errors keyed by field
        errors: BTreeMap<String, Vec<String>>,
        /// What to show when `message` is absent (raw body or status text)
        detail: String,
    },

    #[error("network: {0}")]
    Network(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(String),

    #[error("session: {0}")]
    Session(String),
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: BTreeMap<String, Vec<String>>,
}

impl ApiError {
    /// Build a server error from a status and raw response body
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed.message.filter(|m| !m.trim().is_empty());
        let detail = match &message {
            Some(m) => m.clone(),
            None if !body.trim().is_empty() => body.trim().to_string(),
            None => status
                .canonical_reason()
                .unwrap_or("no response body")
                .to_string(),
        };
        ApiError::Server {
            status: status.as_u16(),
            message,
            errors: parsed.errors,
            detail,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// The backend's own message, if it sent one
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Field validation errors sent by the backend
    pub fn field_errors(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match self {
            ApiError::Server { errors, .. } if !errors.is_empty() => Some(errors),
            _ => None,
        }
    }

    /// Server message, or the given fallback
    pub fn user_message(&self, fallback: &str) -> String {
        self.server_message()
            .map(str::to_string)
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Server message, or the transport description
    pub fn describe(&self) -> String {
        match self.server_message() {
            Some(message) => message.to_string(),
            None => {
                let text = self.to_string();
                if text.trim().is_empty() {
                    UNKNOWN_ERROR.to_string()
                } else {
                    text
                }
            }
        }
    }

    /// Convert into an `anyhow::Error` whose top-level text is user-facing.
    ///
    /// The original `ApiError` stays reachable through `downcast_ref`.
    pub fn into_user_error(self, fallback: &str) -> anyhow::Error {
        let message = self.user_message(fallback);
        anyhow::Error::new(self).context(message)
    }
}

/// Token-bearing JSON client for the backend
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    /// Create a client against `base_url` with the given request timeout
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        session: SessionStore,
    ) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("trackgpx/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_config(config: &Config, session: SessionStore) -> Result<Self, ApiError> {
        Self::new(config.api_url.clone(), config.timeout(), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.http.get(self.url(path));
        self.execute(request, Method::GET, path).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let request = self.http.get(self.url(path)).query(query);
        self.execute(request, Method::GET, path).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.http.post(self.url(path)).json(body);
        self.execute(request, Method::POST, path).await
    }

    /// POST without a body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.http.post(self.url(path));
        self.execute(request, Method::POST, path).await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.http.put(self.url(path)).json(body);
        self.execute(request, Method::PUT, path).await
    }

    pub async fn patch<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.http.patch(self.url(path)).json(body);
        self.execute(request, Method::PATCH, path).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.http.delete(self.url(path));
        self.execute(request, Method::DELETE, path).await
    }

    /// Multipart upload; reqwest sets the multipart content type itself
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let request = self.http.post(self.url(path)).multipart(form);
        self.execute(request, Method::POST, path).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: Method,
        path: &str,
    ) -> Result<T, ApiError> {
        let token = self
            .session
            .token()
            .map_err(|e| ApiError::Session(format!("{:#}", e)))?;

        let request = match &token {
            Some(token) => {
                debug!(
                    "API request: {} {} (bearer {})",
                    method,
                    path,
                    token_preview(token)
                );
                request.bearer_auth(token)
            }
            None => {
                debug!("API request: {} {} (anonymous)", method, path);
                request
            }
        };

        let response = request.send().await.map_err(|e| {
            error!("API transport error: {} {}: {}", method, path, e);
            ApiError::Network(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!("API response: {} {} -> {}", method, path, status.as_u16());

        if !status.is_success() {
            error!(
                "API error: {} {} -> {}: {}",
                method,
                path,
                status.as_u16(),
                body
            );

            if status == StatusCode::UNAUTHORIZED {
                warn!("Unauthorized response, clearing stored session");
                if let Err(e) = self.session.clear_auth() {
                    warn!("Failed to clear session after 401: {:#}", e);
                }
            }

            return Err(ApiError::from_response(status, &body));
        }

        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body).map_err(|e| {
            error!("API decode error: {} {}: {}", method, path, e);
            ApiError::Decode(format!("{} {}: {}", method, path, e))
        })
    }
}
