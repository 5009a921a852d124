use async_trait::async_trait;
use serde_json::json;

use leadscout_common::ChannelError;

use super::channel::{LeadMessage, NotifyChannel};

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Transactional-email channel over SendGrid. The destination is the
/// recipient address from the notification settings row.
pub struct EmailChannel {
    http: reqwest::Client,
    api_key: Option<String>,
    sender: String,
}

impl EmailChannel {
    pub fn new(api_key: Option<String>, sender: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            sender,
        }
    }

    async fn send_html(
        &self,
        destination: &str,
        subject: &str,
        html: String,
    ) -> Result<(), ChannelError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ChannelError::NotConfigured("email"))?;

        let payload = json!({
            "personalizations": [{ "to": [{ "email": destination }] }],
            "from": { "email": self.sender },
            "subject": subject,
            "content": [{ "type": "text/html", "value": html }]
        });

        let resp = self
            .http
            .post(SENDGRID_SEND_URL)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Api {
                channel: "email",
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl NotifyChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send_lead(
        &self,
        message: &LeadMessage,
        destination: &str,
    ) -> Result<(), ChannelError> {
        let subject = format!("New Lead Alert: {}", message.keyword);
        let html = format!(
            r#"<h1>New Lead Alert</h1>
<p><strong>Source:</strong> {} ({})</p>
<p><strong>Matched Keyword:</strong> {}</p>
<p><strong>Author:</strong> {}</p>
<p><strong>Date:</strong> {}</p>
<h2>Post Content:</h2>
<div style="background-color: #f5f5f5; padding: 15px; border-radius: 5px;">
    <p>{}</p>
</div>
<p><a href="{}">View Original Post</a></p>"#,
            message.source_name,
            message.source_type.display_name(),
            message.keyword,
            message.author,
            message.post_date,
            message.excerpt_marked(),
            message.post_url,
        );

        self.send_html(destination, &subject, html).await
    }

    async fn send_operator(&self, text: &str, destination: &str) -> Result<(), ChannelError> {
        self.send_html(
            destination,
            "Leadscout operator alert",
            format!("<p>{text}</p>"),
        )
        .await
    }
}
