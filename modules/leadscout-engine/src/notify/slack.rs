use async_trait::async_trait;
use serde_json::json;

use leadscout_common::ChannelError;

use super::channel::{LeadMessage, NotifyChannel};

/// Slack incoming-webhook channel. The destination is the webhook URL from
/// the notification settings row.
pub struct SlackChannel {
    http: reqwest::Client,
}

impl SlackChannel {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn post(&self, webhook_url: &str, payload: serde_json::Value) -> Result<(), ChannelError> {
        let resp = self.http.post(webhook_url).json(&payload).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Api {
                channel: "slack",
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

impl Default for SlackChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send_lead(
        &self,
        message: &LeadMessage,
        destination: &str,
    ) -> Result<(), ChannelError> {
        let payload = json!({
            "blocks": [
                {
                    "type": "header",
                    "text": { "type": "plain_text", "text": ":mag: New Lead Alert!" }
                },
                {
                    "type": "section",
                    "fields": [
                        {
                            "type": "mrkdwn",
                            "text": format!(
                                "*Source:*\n{} ({})",
                                message.source_name,
                                message.source_type.display_name()
                            )
                        },
                        {
                            "type": "mrkdwn",
                            "text": format!("*Matched Keyword:*\n{}", message.keyword)
                        }
                    ]
                },
                {
                    "type": "section",
                    "text": {
                        "type": "mrkdwn",
                        "text": format!("*Post Content:*\n```{}```", message.excerpt_marked())
                    }
                },
                {
                    "type": "section",
                    "fields": [
                        { "type": "mrkdwn", "text": format!("*Author:*\n{}", message.author) },
                        { "type": "mrkdwn", "text": format!("*Date:*\n{}", message.post_date) }
                    ]
                },
                {
                    "type": "actions",
                    "elements": [
                        {
                            "type": "button",
                            "text": { "type": "plain_text", "text": "View Original Post" },
                            "url": message.post_url
                        }
                    ]
                }
            ]
        });

        self.post(destination, payload).await
    }

    async fn send_operator(&self, text: &str, destination: &str) -> Result<(), ChannelError> {
        self.post(destination, json!({ "text": format!(":rotating_light: {text}") }))
            .await
    }
}
