//! Nextdoor neighborhood connector. Same shape as the Facebook adapter;
//! Nextdoor sessions are scoped to the account's neighborhoods, so one
//! session serves every neighborhood source in a cycle.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use leadscout_common::{config::PlatformCredentials, AuthError, FetchError, Post, SourceType};

use crate::facebook::{classify_fetch_error, classify_login_error, into_posts};
use crate::gate::{BrowserGate, OpenSessionRequest};
use crate::traits::SourceConnector;

pub struct NextdoorConnector {
    gate: BrowserGate,
    credentials: PlatformCredentials,
    timeout_secs: u64,
    session_id: Option<String>,
}

impl NextdoorConnector {
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
impl SourceConnector for NextdoorConnector {
    fn source_type(&self) -> SourceType {
        SourceType::Nextdoor
    }

    async fn login(&mut self) -> Result<(), AuthError> {
        if self.session_id.is_some() {
            return Ok(());
        }
        if !self.credentials.is_configured() {
            return Err(AuthError::Credential(
                "no Nextdoor cookies or email/password configured".into(),
            ));
        }

        let request = OpenSessionRequest {
            platform: SourceType::Nextdoor.as_str().to_string(),
            cookies: self.credentials.cookies.clone(),
            email: self.credentials.email.clone(),
            password: self.credentials.password.clone(),
        };

        let session = self
            .gate
            .open_session(&request)
            .await
            .map_err(|err| classify_login_error("Nextdoor", err))?;

        info!(session_id = %session.session_id, "Nextdoor session opened");
        self.session_id = Some(session.session_id);
        Ok(())
    }

    async fn fetch(&mut self, url: &str, max_posts: u32) -> Result<Vec<Post>, FetchError> {
        let session_id = self.session_id.as_deref().ok_or_else(|| {
            FetchError::Extraction {
                url: url.to_string(),
                message: "no active Nextdoor session".into(),
            }
        })?;

        let raw = self
            .gate
            .extract_posts(session_id, url, max_posts)
            .await
            .map_err(|err| classify_fetch_error(url, self.timeout_secs, err))?;

        let posts = into_posts(raw, SourceType::Nextdoor);
        debug!(url, count = posts.len(), "Nextdoor posts extracted");
        Ok(posts)
    }

    async fn close(&mut self) {
        if let Some(session_id) = self.session_id.take() {
            if let Err(err) = self.gate.close_session(&session_id).await {
                warn!(error = %err, "Failed to close Nextdoor session");
            }
        }
    }
}
