// The Match Store seam. All pipeline persistence flows through this trait so
// the scrape and notify cycles can run against an in-memory implementation
// in tests without a running Postgres.
//
// Callers pattern-match on StoreError kinds instead of catching broadly:
// ConstraintViolation on insert is an expected concurrency outcome, not an
// error to surface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use leadscout_common::{
    Keyword, Match, NewMatch, NotificationSetting, Source, SourceType, StoreError,
};

#[async_trait]
pub trait MatchStore: Send + Sync {
    // --- Source / keyword configuration (read path) ---

    /// Active sources of one type, in insertion order.
    async fn active_sources(&self, source_type: SourceType) -> Result<Vec<Source>, StoreError>;

    /// Active keywords in insertion order. This ordering is the matcher's
    /// tie-break: the earliest keyword that hits a post wins.
    async fn active_keywords(&self) -> Result<Vec<Keyword>, StoreError>;

    async fn source(&self, id: Uuid) -> Result<Option<Source>, StoreError>;

    async fn keyword(&self, id: Uuid) -> Result<Option<Keyword>, StoreError>;

    // --- Source / keyword configuration (write path, dashboard + seeding) ---

    async fn insert_source(
        &self,
        name: &str,
        url: &str,
        source_type: SourceType,
    ) -> Result<Source, StoreError>;

    /// Fails with `DuplicateKeyword` when the trimmed, lowercased text
    /// collides with any existing keyword, active or not.
    async fn insert_keyword(&self, text: &str) -> Result<Keyword, StoreError>;

    // --- Matches ---

    /// Look up an equivalent match before inserting. `dedup_key` is the
    /// external post id when present, otherwise the content fingerprint.
    async fn find_existing(
        &self,
        source_id: Uuid,
        dedup_key: &str,
    ) -> Result<Option<Match>, StoreError>;

    /// Insert a new match. `ConstraintViolation` means a concurrent insert
    /// won the race for the same dedup key; callers skip, not fail.
    async fn insert_match(&self, new_match: NewMatch) -> Result<Match, StoreError>;

    /// Matches awaiting notification, oldest first. Delivery order matters
    /// for operator readability, not correctness.
    async fn list_unnotified(&self) -> Result<Vec<Match>, StoreError>;

    /// Idempotent: marking an already-notified match is a no-op.
    async fn mark_notified(&self, match_id: Uuid) -> Result<(), StoreError>;

    /// Unconditionally advance a source's last-scraped timestamp once its
    /// cycle completes, so a persistently failing source still registers
    /// attempts.
    async fn update_last_scraped(
        &self,
        source_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    // --- Notification settings (singleton) ---

    /// Read the settings row, creating it from `defaults` if absent.
    async fn notification_settings(
        &self,
        defaults: &NotificationSetting,
    ) -> Result<NotificationSetting, StoreError>;

    async fn update_notification_settings(
        &self,
        settings: &NotificationSetting,
    ) -> Result<(), StoreError>;
}
