use std::sync::Arc;

use chrono::Utc;

use leadscout_common::{config::Config, NotificationSetting};
use leadscout_connectors::ConnectorFactory;
use leadscout_store::MatchStore;

use crate::notify::Dispatcher;

/// Everything a job invocation needs, passed in explicitly. No module-level
/// singletons: jobs receive their store handle, connector factory and
/// dispatcher from here.
pub struct EngineContext {
    pub store: Arc<dyn MatchStore>,
    pub connectors: Arc<dyn ConnectorFactory>,
    pub dispatcher: Dispatcher,
    pub config: Config,
}

impl EngineContext {
    /// Seed row for the lazily-created notification settings: a channel
    /// starts enabled exactly when its destination is configured in the
    /// environment.
    pub fn default_notification_settings(&self) -> NotificationSetting {
        NotificationSetting {
            email_enabled: self.config.notification_email.is_some(),
            email_address: self.config.notification_email.clone(),
            slack_enabled: self.config.slack_webhook_url.is_some(),
            slack_webhook: self.config.slack_webhook_url.clone(),
            updated_at: Utc::now(),
        }
    }
}
