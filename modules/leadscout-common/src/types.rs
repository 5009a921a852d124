use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use uuid::Uuid;

/// Platform a source lives on. Each source type gets its own scrape job and
/// its own connector session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Facebook,
    Nextdoor,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Facebook => "facebook",
            Self::Nextdoor => "nextdoor",
        }
    }

    /// Capitalized form for operator-facing messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Facebook => "Facebook",
            Self::Nextdoor => "Nextdoor",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "facebook" => Some(Self::Facebook),
            "nextdoor" => Some(Self::Nextdoor),
            _ => None,
        }
    }

    /// All source types that get a scheduled scrape job.
    pub fn all() -> [SourceType; 2] {
        [Self::Facebook, Self::Nextdoor]
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monitored location: a Facebook group or a Nextdoor neighborhood.
/// Operator-managed via the dashboard; the pipeline only reads it and
/// advances `last_scraped_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub source_type: SourceType,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_scraped_at: Option<DateTime<Utc>>,
}

/// A phrase to watch for in post text. `text` is matched as a
/// case-insensitive substring; no two keywords may share a normalized form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub id: Uuid,
    pub text: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Normalized form used for the keyword uniqueness invariant.
pub fn normalize_keyword(text: &str) -> String {
    text.trim().to_lowercase()
}

/// A candidate post produced by a source connector. Transient — never
/// persisted on its own, only as part of a `Match`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Platform-native post id when the connector could extract one.
    pub external_id: Option<String>,
    pub url: String,
    pub text: String,
    pub author: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub source_type: SourceType,
}

/// A keyword hit persisted by the scrape cycle. Mutated exactly once by the
/// notify cycle (`is_notified` false → true), never deleted by the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: Uuid,
    pub source_id: Uuid,
    pub keyword_id: Uuid,
    pub external_post_id: Option<String>,
    pub post_url: String,
    pub post_text: String,
    pub post_author: Option<String>,
    pub post_date: Option<DateTime<Utc>>,
    pub matched_text: String,
    pub is_notified: bool,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a match. The store assigns id and created_at.
#[derive(Debug, Clone)]
pub struct NewMatch {
    pub source_id: Uuid,
    pub keyword_id: Uuid,
    pub external_post_id: Option<String>,
    pub post_url: String,
    pub post_text: String,
    pub post_author: Option<String>,
    pub post_date: Option<DateTime<Utc>>,
    pub matched_text: String,
}

impl NewMatch {
    pub fn from_post(post: &Post, source_id: Uuid, keyword: &Keyword) -> Self {
        Self {
            source_id,
            keyword_id: keyword.id,
            external_post_id: post
                .external_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .map(String::from),
            post_url: post.url.clone(),
            post_text: post.text.clone(),
            post_author: post.author.clone(),
            post_date: post.posted_at,
            matched_text: keyword.text.clone(),
        }
    }

    /// Dedup key within a source: the platform post id when present,
    /// otherwise a content fingerprint so id-less posts can't accumulate
    /// duplicates across scrape cycles.
    pub fn dedup_key(&self) -> String {
        match &self.external_post_id {
            Some(id) => id.clone(),
            None => content_fingerprint(&self.post_url, &self.matched_text),
        }
    }
}

/// Fingerprint for posts without a platform id: sha256 over url + matched
/// text, newline-separated so the field boundary is unambiguous.
pub fn content_fingerprint(post_url: &str, matched_text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(post_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(matched_text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Singleton notification configuration. Read by the notify cycle, written
/// by the dashboard; created lazily from env defaults when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSetting {
    pub email_enabled: bool,
    pub email_address: Option<String>,
    pub slack_enabled: bool,
    pub slack_webhook: Option<String>,
    pub updated_at: DateTime<Utc>,
}
