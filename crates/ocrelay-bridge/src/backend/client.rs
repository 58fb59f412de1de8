//! Backend REST client.
//!
//! Uses reqwest to call the backend's health, session, and message endpoints.
//! The client keeps no idle connections, so every call opens its own.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, Url};
use thiserror::Error;
use tracing::debug;

use ocrelay_core::config::BackendConfig;

use super::types::{
    CreateSessionRequest, Health, MessagePart, MessageResponse, SendMessageRequest, Session,
};

/// Backend client errors.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("backend request failed ({status}): {body}")]
    RequestFailed { status: u16, body: String },

    #[error("invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::Unreachable(e)
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else {
            Self::Http(e)
        }
    }
}

/// Per-operation request timeouts.
#[derive(Debug, Clone, Copy)]
struct Timeouts {
    health: Duration,
    request: Duration,
    message: Duration,
}

/// Stateless wrapper around the backend's REST surface.
#[derive(Debug)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    health_path: String,
    /// Basic-auth credentials; `None` sends no `Authorization` header at all.
    auth: Option<(String, String)>,
    timeouts: Timeouts,
}

impl BackendClient {
    /// Create a new backend client.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        if config.base_url.is_empty() {
            return Err(BackendError::Config("base_url is empty".into()));
        }
        Url::parse(&config.base_url).map_err(|e| {
            BackendError::Config(format!("invalid base_url {:?}: {e}", config.base_url))
        })?;

        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .build()
            .map_err(BackendError::Http)?;

        let auth = config
            .password
            .as_ref()
            .filter(|p| !p.is_empty())
            .map(|p| (config.username.clone(), p.clone()));

        let health_path = if config.health_path.starts_with('/') {
            config.health_path.clone()
        } else {
            format!("/{}", config.health_path)
        };

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            health_path,
            auth,
            timeouts: Timeouts {
                health: Duration::from_secs(config.health_timeout_secs),
                request: Duration::from_secs(config.request_timeout_secs),
                message: Duration::from_secs(config.message_timeout_secs),
            },
        })
    }

    /// Base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests carry basic-auth credentials.
    pub const fn has_auth(&self) -> bool {
        self.auth.is_some()
    }

    /// Build the full URL for a given path.
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Build the message URL for a session, escaping the id as one path segment.
    pub(crate) fn message_url(&self, session_id: &str) -> Result<Url, BackendError> {
        let mut url = Url::parse(&self.url("/session"))
            .map_err(|e| BackendError::Config(format!("invalid base_url: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| BackendError::Config("base_url cannot carry a path".into()))?
            .push(session_id)
            .push("message");
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        url: impl reqwest::IntoUrl,
        timeout: Duration,
    ) -> RequestBuilder {
        let builder = self.http.request(method, url).timeout(timeout);
        match &self.auth {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    /// Check HTTP response status, returning the body as error text for non-success codes.
    async fn check_status(resp: Response) -> Result<Response, BackendError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(BackendError::RequestFailed {
            status: status.as_u16(),
            body,
        })
    }

    /// `GET /health`.
    pub async fn health(&self) -> Result<Health, BackendError> {
        let resp = self
            .request(Method::GET, self.url(&self.health_path), self.timeouts.health)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// `GET /session`, in the order the backend returns them.
    pub async fn list_sessions(&self) -> Result<Vec<Session>, BackendError> {
        let resp = self
            .request(Method::GET, self.url("/session"), self.timeouts.request)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// `POST /session`. Without a title the body is `{}`.
    pub async fn create_session(&self, title: Option<&str>) -> Result<Session, BackendError> {
        let body = CreateSessionRequest { title };
        let resp = self
            .request(Method::POST, self.url("/session"), self.timeouts.request)
            .json(&body)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let session: Session = resp.json().await?;
        debug!(session_id = %session.id, "Created backend session");
        Ok(session)
    }

    /// `POST /session/{id}/message` with a single text part.
    ///
    /// Returns the whole structured reply; see [`MessageResponse::final_text`].
    pub async fn send_message_raw(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<MessageResponse, BackendError> {
        let body = SendMessageRequest {
            parts: vec![MessagePart::text(text)],
        };
        let resp = self
            .request(Method::POST, self.message_url(session_id)?, self.timeouts.message)
            .json(&body)
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// Send `text` to a session and return only the final text result,
    /// which may be empty.
    pub async fn send_message(&self, session_id: &str, text: &str) -> Result<String, BackendError> {
        let reply = self.send_message_raw(session_id, text).await?;
        debug!(session_id, parts = reply.parts.len(), "Received backend reply");
        Ok(reply.final_text())
    }
}
