use async_trait::async_trait;

use leadscout_common::{ChannelError, Keyword, Match, Source, SourceType};
use uuid::Uuid;

/// Post excerpt length in notification messages.
const EXCERPT_CHARS: usize = 500;

/// Pluggable notification channel. The dispatcher only depends on this
/// contract, never on provider specifics.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deliver a lead alert to `destination` (webhook URL, email address).
    async fn send_lead(&self, message: &LeadMessage, destination: &str)
        -> Result<(), ChannelError>;

    /// Deliver a plain operator alert (credential failures, captcha
    /// backoff) — visually distinct from lead alerts.
    async fn send_operator(&self, text: &str, destination: &str) -> Result<(), ChannelError>;
}

/// A lead alert rendered once per match, shared by every channel.
#[derive(Debug, Clone)]
pub struct LeadMessage {
    pub match_id: Uuid,
    pub source_name: String,
    pub source_type: SourceType,
    pub keyword: String,
    pub excerpt: String,
    pub truncated: bool,
    pub author: String,
    pub post_date: String,
    pub post_url: String,
}

impl LeadMessage {
    pub fn render(m: &Match, source: &Source, keyword: &Keyword) -> Self {
        let excerpt: String = m.post_text.chars().take(EXCERPT_CHARS).collect();
        let truncated = m.post_text.chars().count() > EXCERPT_CHARS;

        Self {
            match_id: m.id,
            source_name: source.name.clone(),
            source_type: source.source_type,
            keyword: keyword.text.clone(),
            excerpt,
            truncated,
            author: m.post_author.clone().unwrap_or_else(|| "Unknown".into()),
            post_date: m
                .post_date
                .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "Unknown date".into()),
            post_url: m.post_url.clone(),
        }
    }

    /// Excerpt with the truncation marker applied.
    pub fn excerpt_marked(&self) -> String {
        if self.truncated {
            format!("{}...", self.excerpt)
        } else {
            self.excerpt.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_match(post_text: &str, author: Option<&str>) -> Match {
        Match {
            id: Uuid::new_v4(),
            source_id: Uuid::new_v4(),
            keyword_id: Uuid::new_v4(),
            external_post_id: Some("p1".into()),
            post_url: "https://facebook.com/groups/g/posts/1".into(),
            post_text: post_text.to_string(),
            post_author: author.map(String::from),
            post_date: None,
            matched_text: "leak".into(),
            is_notified: false,
            created_at: Utc::now(),
        }
    }

    fn make_source() -> Source {
        Source {
            id: Uuid::new_v4(),
            name: "Maple Grove Moms".into(),
            url: "https://facebook.com/groups/g".into(),
            source_type: SourceType::Facebook,
            is_active: true,
            created_at: Utc::now(),
            last_scraped_at: None,
        }
    }

    fn make_keyword() -> Keyword {
        Keyword {
            id: Uuid::new_v4(),
            text: "leak".into(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn short_posts_are_not_truncated() {
        let msg = LeadMessage::render(&make_match("Pipe leak", None), &make_source(), &make_keyword());
        assert!(!msg.truncated);
        assert_eq!(msg.excerpt_marked(), "Pipe leak");
    }

    #[test]
    fn long_posts_truncate_at_500_chars_with_marker() {
        let text = "x".repeat(600);
        let msg = LeadMessage::render(&make_match(&text, None), &make_source(), &make_keyword());
        assert!(msg.truncated);
        assert_eq!(msg.excerpt.chars().count(), 500);
        assert!(msg.excerpt_marked().ends_with("..."));
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let text = "é".repeat(510);
        let msg = LeadMessage::render(&make_match(&text, None), &make_source(), &make_keyword());
        assert_eq!(msg.excerpt.chars().count(), 500);
    }

    #[test]
    fn missing_author_and_date_get_placeholders() {
        let msg = LeadMessage::render(&make_match("text", None), &make_source(), &make_keyword());
        assert_eq!(msg.author, "Unknown");
        assert_eq!(msg.post_date, "Unknown date");
    }

    #[test]
    fn present_date_is_formatted() {
        let mut m = make_match("text", Some("Jordan"));
        m.post_date = Some(Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).single().unwrap());
        let msg = LeadMessage::render(&m, &make_source(), &make_keyword());
        assert_eq!(msg.author, "Jordan");
        assert_eq!(msg.post_date, "2026-03-01 09:30:00");
    }
}
