// The Source Connector seam. The orchestrator drives one connector per
// source type per cycle: login lazily on first use, reuse the session across
// every source of that type, close at cycle end. Tests swap in a mock that
// returns canned post lists — no browser, no network.

use std::time::Duration;

use async_trait::async_trait;

use leadscout_common::{config::Config, AuthError, FetchError, Post, SourceType};

use crate::facebook::FacebookConnector;
use crate::gate::BrowserGate;
use crate::nextdoor::NextdoorConnector;

#[async_trait]
pub trait SourceConnector: Send {
    fn source_type(&self) -> SourceType;

    /// Establish or validate a platform session. Idempotent — calling again
    /// on an authenticated connector is a no-op.
    async fn login(&mut self) -> Result<(), AuthError>;

    /// Candidate posts for one source URL, newest first, at most
    /// `max_posts`. Bounded timeout, surfaced as `FetchError::Timeout`.
    async fn fetch(&mut self, url: &str, max_posts: u32) -> Result<Vec<Post>, FetchError>;

    /// Release the remote session. Failures are logged, never propagated.
    async fn close(&mut self);
}

/// Builds a fresh connector per scrape cycle. The engine depends on this
/// trait so cycles are testable with canned connectors.
pub trait ConnectorFactory: Send + Sync {
    fn connect(&self, source_type: SourceType) -> Box<dyn SourceConnector>;
}

/// Production factory: connectors backed by the browser gate, credentials
/// from configuration.
pub struct GateConnectorFactory {
    gate: BrowserGate,
    config: Config,
}

impl GateConnectorFactory {
    pub fn from_config(config: &Config) -> Self {
        let gate = BrowserGate::new(
            &config.browser_gate_url,
            config.browser_gate_token.as_deref(),
            Duration::from_secs(config.fetch_timeout_secs),
        );
        Self {
            gate,
            config: config.clone(),
        }
    }
}

impl ConnectorFactory for GateConnectorFactory {
    fn connect(&self, source_type: SourceType) -> Box<dyn SourceConnector> {
        match source_type {
            SourceType::Facebook => Box::new(FacebookConnector::new(
                self.gate.clone(),
                self.config.facebook.clone(),
                self.config.fetch_timeout_secs,
            )),
            SourceType::Nextdoor => Box::new(NextdoorConnector::new(
                self.gate.clone(),
                self.config.nextdoor.clone(),
                self.config.fetch_timeout_secs,
            )),
        }
    }
}
