use std::sync::Arc;

use tracing::{error, info, warn};

use leadscout_common::{config::Config, Keyword, Match, NotificationSetting, Source};

use super::channel::{LeadMessage, NotifyChannel};
use super::email::EmailChannel;
use super::slack::SlackChannel;

/// Fans a match out to every enabled channel and aggregates the outcome.
/// Channel failures are isolated: one channel failing never prevents the
/// other from being attempted, and nothing is retried within a cycle — an
/// unnotified match is simply picked up again next time.
pub struct Dispatcher {
    email: Arc<dyn NotifyChannel>,
    slack: Arc<dyn NotifyChannel>,
}

impl Dispatcher {
    pub fn new(email: Arc<dyn NotifyChannel>, slack: Arc<dyn NotifyChannel>) -> Self {
        Self { email, slack }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(EmailChannel::new(
                config.sendgrid_api_key.clone(),
                config.sender_email.clone(),
            )),
            Arc::new(SlackChannel::new()),
        )
    }

    /// Attempt delivery through each enabled, configured channel. Returns
    /// true when at least one attempt succeeded — the caller marks the
    /// match notified on true and leaves it pending on false.
    pub async fn dispatch(
        &self,
        m: &Match,
        settings: &NotificationSetting,
        source: &Source,
        keyword: &Keyword,
    ) -> bool {
        let message = LeadMessage::render(m, source, keyword);

        let email_dest = route(settings.email_enabled, settings.email_address.as_deref());
        let slack_dest = route(settings.slack_enabled, settings.slack_webhook.as_deref());

        // Independent I/O with no shared mutable state — run both in parallel.
        let (email_outcome, slack_outcome) = tokio::join!(
            attempt(self.email.as_ref(), &message, email_dest),
            attempt(self.slack.as_ref(), &message, slack_dest),
        );

        email_outcome.unwrap_or(false) || slack_outcome.unwrap_or(false)
    }

    /// Job-level operator alert (credential failure, captcha backoff).
    /// Best effort on every enabled channel; failures are logged and
    /// swallowed so they can never affect the job outcome.
    pub async fn operator_alert(&self, settings: &NotificationSetting, text: &str) {
        for (channel, destination) in [
            (
                self.slack.as_ref(),
                route(settings.slack_enabled, settings.slack_webhook.as_deref()),
            ),
            (
                self.email.as_ref(),
                route(settings.email_enabled, settings.email_address.as_deref()),
            ),
        ] {
            let Some(destination) = destination else {
                continue;
            };
            if let Err(err) = channel.send_operator(text, destination).await {
                warn!(channel = channel.name(), error = %err, "Failed to send operator alert");
            }
        }
    }
}

fn route(enabled: bool, destination: Option<&str>) -> Option<&str> {
    if enabled {
        destination.filter(|d| !d.is_empty())
    } else {
        None
    }
}

/// One channel attempt. `None` means the channel was not attempted (disabled
/// or unconfigured); `Some(false)` is an attempted-and-failed delivery.
async fn attempt(
    channel: &dyn NotifyChannel,
    message: &LeadMessage,
    destination: Option<&str>,
) -> Option<bool> {
    let destination = destination?;
    match channel.send_lead(message, destination).await {
        Ok(()) => {
            info!(
                channel = channel.name(),
                match_id = %message.match_id,
                "Lead notification sent"
            );
            Some(true)
        }
        Err(err) => {
            error!(
                channel = channel.name(),
                match_id = %message.match_id,
                error = %err,
                "Failed to send lead notification"
            );
            Some(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingChannel;
    use chrono::Utc;
    use uuid::Uuid;

    use leadscout_common::SourceType;

    fn make_fixture() -> (Match, Source, Keyword) {
        let source = Source {
            id: Uuid::new_v4(),
            name: "Maple Grove Moms".into(),
            url: "https://facebook.com/groups/g".into(),
            source_type: SourceType::Facebook,
            is_active: true,
            created_at: Utc::now(),
            last_scraped_at: None,
        };
        let keyword = Keyword {
            id: Uuid::new_v4(),
            text: "leak".into(),
            is_active: true,
            created_at: Utc::now(),
        };
        let m = Match {
            id: Uuid::new_v4(),
            source_id: source.id,
            keyword_id: keyword.id,
            external_post_id: Some("p1".into()),
            post_url: "https://facebook.com/groups/g/posts/1".into(),
            post_text: "Pipe leak, need help".into(),
            post_author: None,
            post_date: None,
            matched_text: "leak".into(),
            is_notified: false,
            created_at: Utc::now(),
        };
        (m, source, keyword)
    }

    fn settings(email: bool, slack: bool) -> NotificationSetting {
        NotificationSetting {
            email_enabled: email,
            email_address: email.then(|| "ops@example.com".to_string()),
            slack_enabled: slack,
            slack_webhook: slack.then(|| "https://hooks.slack.com/services/T/B/x".to_string()),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn one_successful_channel_is_enough() {
        let email = Arc::new(RecordingChannel::failing("email"));
        let slack = Arc::new(RecordingChannel::new("slack"));
        let dispatcher = Dispatcher::new(email.clone(), slack.clone());
        let (m, source, keyword) = make_fixture();

        let notified = dispatcher.dispatch(&m, &settings(true, true), &source, &keyword).await;

        assert!(notified);
        // The failing channel was still attempted.
        assert_eq!(email.sent_count(), 1);
        assert_eq!(slack.sent_count(), 1);
    }

    #[tokio::test]
    async fn all_channels_failing_leaves_match_pending() {
        let email = Arc::new(RecordingChannel::failing("email"));
        let slack = Arc::new(RecordingChannel::failing("slack"));
        let dispatcher = Dispatcher::new(email, slack);
        let (m, source, keyword) = make_fixture();

        let notified = dispatcher.dispatch(&m, &settings(true, true), &source, &keyword).await;

        assert!(!notified);
    }

    #[tokio::test]
    async fn no_enabled_channels_means_not_notified() {
        let email = Arc::new(RecordingChannel::new("email"));
        let slack = Arc::new(RecordingChannel::new("slack"));
        let dispatcher = Dispatcher::new(email.clone(), slack.clone());
        let (m, source, keyword) = make_fixture();

        let notified = dispatcher.dispatch(&m, &settings(false, false), &source, &keyword).await;

        assert!(!notified);
        assert_eq!(email.sent_count(), 0);
        assert_eq!(slack.sent_count(), 0);
    }

    #[tokio::test]
    async fn enabled_channel_without_destination_is_not_attempted() {
        let email = Arc::new(RecordingChannel::new("email"));
        let slack = Arc::new(RecordingChannel::new("slack"));
        let dispatcher = Dispatcher::new(email.clone(), slack.clone());
        let (m, source, keyword) = make_fixture();

        let mut s = settings(true, false);
        s.email_address = None;
        let notified = dispatcher.dispatch(&m, &s, &source, &keyword).await;

        assert!(!notified);
        assert_eq!(email.sent_count(), 0);
    }

    #[tokio::test]
    async fn disabled_channel_is_skipped_even_when_configured() {
        let email = Arc::new(RecordingChannel::new("email"));
        let slack = Arc::new(RecordingChannel::new("slack"));
        let dispatcher = Dispatcher::new(email.clone(), slack.clone());
        let (m, source, keyword) = make_fixture();

        let mut s = settings(true, true);
        s.slack_enabled = false;
        let notified = dispatcher.dispatch(&m, &s, &source, &keyword).await;

        assert!(notified);
        assert_eq!(email.sent_count(), 1);
        assert_eq!(slack.sent_count(), 0);
    }
}
