//! Facebook group connector. Sessions, login flows and feed extraction run
//! on the browser gate; this adapter maps gate responses into `Post` values
//! and gate failures into the pipeline's error taxonomy.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use leadscout_common::{config::PlatformCredentials, AuthError, FetchError, Post, SourceType};

use crate::gate::{BrowserGate, GateError, GatePost, OpenSessionRequest};
use crate::traits::SourceConnector;

pub struct FacebookConnector {
    gate: BrowserGate,
    credentials: PlatformCredentials,
    timeout_secs: u64,
    session_id: Option<String>,
}

impl FacebookConnector {
    pub fn new(gate: BrowserGate, credentials: PlatformCredentials, timeout_secs: u64) -> Self {
        Self {
            gate,
            credentials,
            timeout_secs,
            session_id: None,
        }
    }
}

#[async_trait]
impl SourceConnector for FacebookConnector {
    fn source_type(&self) -> SourceType {
        SourceType::Facebook
    }

    async fn login(&mut self) -> Result<(), AuthError> {
        if self.session_id.is_some() {
            return Ok(());
        }
        if !self.credentials.is_configured() {
            return Err(AuthError::Credential(
                "no Facebook cookies or email/password configured".into(),
            ));
        }

        let request = OpenSessionRequest {
            platform: SourceType::Facebook.as_str().to_string(),
            cookies: self.credentials.cookies.clone(),
            email: self.credentials.email.clone(),
            password: self.credentials.password.clone(),
        };

        let session = self
            .gate
            .open_session(&request)
            .await
            .map_err(|err| classify_login_error("Facebook", err))?;

        info!(session_id = %session.session_id, "Facebook session opened");
        self.session_id = Some(session.session_id);
        Ok(())
    }

    async fn fetch(&mut self, url: &str, max_posts: u32) -> Result<Vec<Post>, FetchError> {
        let session_id = self.session_id.as_deref().ok_or_else(|| {
            FetchError::Extraction {
                url: url.to_string(),
                message: "no active Facebook session".into(),
            }
        })?;

        let raw = self
            .gate
            .extract_posts(session_id, url, max_posts)
            .await
            .map_err(|err| classify_fetch_error(url, self.timeout_secs, err))?;

        let posts = into_posts(raw, SourceType::Facebook);
        debug!(url, count = posts.len(), "Facebook posts extracted");
        Ok(posts)
    }

    async fn close(&mut self) {
        if let Some(session_id) = self.session_id.take() {
            if let Err(err) = self.gate.close_session(&session_id).await {
                warn!(error = %err, "Failed to close Facebook session");
            }
        }
    }
}

/// Map gate posts into the pipeline's Post type, dropping posts the gate
/// could not extract any text for.
pub(crate) fn into_posts(raw: Vec<GatePost>, source_type: SourceType) -> Vec<Post> {
    raw.into_iter()
        .filter(|p| !p.text.trim().is_empty())
        .map(|p| Post {
            external_id: p.id.filter(|id| !id.is_empty()),
            url: p.url,
            text: p.text,
            author: p.author.filter(|a| !a.is_empty()),
            posted_at: p.posted_at,
            source_type,
        })
        .collect()
}

/// Login failures split two ways: captcha/rate-limit responses are
/// transient (skip this cycle), everything that looks like rejected
/// credentials disables the job until an operator reconfigures it. Gate
/// outages during login count as transient.
pub(crate) fn classify_login_error(platform: &str, err: GateError) -> AuthError {
    if err.mentions_captcha() || err.status() == Some(429) {
        return AuthError::CaptchaOrRateLimit(format!("{platform}: {err}"));
    }
    match err.status() {
        Some(401) | Some(403) => AuthError::Credential(format!("{platform}: {err}")),
        _ => AuthError::CaptchaOrRateLimit(format!("{platform}: {err}")),
    }
}

pub(crate) fn classify_fetch_error(url: &str, timeout_secs: u64, err: GateError) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            seconds: timeout_secs,
        }
    } else {
        FetchError::Extraction {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
