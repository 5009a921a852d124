//! HTTP client for the browser gate — the external browser-automation
//! service that owns logins, cookies, scrolling and DOM extraction. The
//! pipeline never touches a browser; it talks to the gate's session API and
//! gets structured posts back.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, GateError>;

#[derive(Debug, Error)]
pub enum GateError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("gate error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl GateError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Network(_) => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Network(err) if err.is_timeout())
    }

    /// The gate flags captcha/security-checkpoint pages in its error body.
    pub fn mentions_captcha(&self) -> bool {
        matches!(
            self,
            Self::Api { message, .. }
                if message.to_lowercase().contains("captcha")
                    || message.to_lowercase().contains("security check")
        )
    }
}

/// Login request for one platform session. Cookies take precedence when
/// present; the gate falls back to email/password.
#[derive(Debug, Clone, Serialize)]
pub struct OpenSessionRequest {
    pub platform: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionOpened {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractRequest {
    pub url: String,
    pub max_posts: u32,
}

/// One extracted post, as the gate reports it.
#[derive(Debug, Clone, Deserialize)]
pub struct GatePost {
    pub id: Option<String>,
    pub url: String,
    pub text: String,
    pub author: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtractResponse {
    pub posts: Vec<GatePost>,
}

#[derive(Clone)]
pub struct BrowserGate {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserGate {
    pub fn new(base_url: &str, token: Option<&str>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let mut endpoint = format!("{}{path}", self.base_url);
        if let Some(ref token) = self.token {
            endpoint.push_str(&format!("?token={token}"));
        }
        endpoint
    }

    /// Open a logged-in browser session for a platform.
    pub async fn open_session(&self, request: &OpenSessionRequest) -> Result<SessionOpened> {
        let resp = self
            .client
            .post(self.endpoint("/sessions"))
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }

    /// Extract up to `max_posts` posts from a page, using an open session.
    pub async fn extract_posts(
        &self,
        session_id: &str,
        url: &str,
        max_posts: u32,
    ) -> Result<Vec<GatePost>> {
        let resp = self
            .client
            .post(self.endpoint(&format!("/sessions/{session_id}/extract")))
            .json(&ExtractRequest {
                url: url.to_string(),
                max_posts,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ExtractResponse = resp.json().await?;
        Ok(body.posts)
    }

    /// Release a session's browser and cookies on the gate side.
    pub async fn close_session(&self, session_id: &str) -> Result<()> {
        let resp = self
            .client
            .delete(self.endpoint(&format!("/sessions/{session_id}")))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(GateError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
