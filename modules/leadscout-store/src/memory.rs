// In-memory Match Store for tests. Same contract as the Postgres
// implementation, state behind a std Mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use leadscout_common::{
    normalize_keyword, Keyword, Match, NewMatch, NotificationSetting, Source, SourceType,
    StoreError,
};

use crate::store::MatchStore;

#[derive(Default)]
struct Inner {
    sources: Vec<Source>,
    keywords: Vec<Keyword>,
    matches: Vec<Match>,
    /// dedup index: (source_id, dedup_key) → match id
    dedup: HashMap<(Uuid, String), Uuid>,
    settings: Option<NotificationSetting>,
}

#[derive(Default)]
pub struct MemoryMatchStore {
    inner: Mutex<Inner>,
}

impl MemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test hook: read a match back by id.
    pub fn get_match(&self, id: Uuid) -> Option<Match> {
        let inner = self.inner.lock().unwrap();
        inner.matches.iter().find(|m| m.id == id).cloned()
    }

    /// Test hook: all persisted matches in insertion order.
    pub fn all_matches(&self) -> Vec<Match> {
        self.inner.lock().unwrap().matches.clone()
    }
}

#[async_trait]
impl MatchStore for MemoryMatchStore {
    async fn active_sources(&self, source_type: SourceType) -> Result<Vec<Source>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .sources
            .iter()
            .filter(|s| s.source_type == source_type && s.is_active)
            .cloned()
            .collect())
    }

    async fn active_keywords(&self) -> Result<Vec<Keyword>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .keywords
            .iter()
            .filter(|k| k.is_active)
            .cloned()
            .collect())
    }

    async fn source(&self, id: Uuid) -> Result<Option<Source>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.sources.iter().find(|s| s.id == id).cloned())
    }

    async fn keyword(&self, id: Uuid) -> Result<Option<Keyword>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.keywords.iter().find(|k| k.id == id).cloned())
    }

    async fn insert_source(
        &self,
        name: &str,
        url: &str,
        source_type: SourceType,
    ) -> Result<Source, StoreError> {
        let source = Source {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: url.to_string(),
            source_type,
            is_active: true,
            created_at: Utc::now(),
            last_scraped_at: None,
        };
        self.inner.lock().unwrap().sources.push(source.clone());
        Ok(source)
    }

    async fn insert_keyword(&self, text: &str) -> Result<Keyword, StoreError> {
        let normalized = normalize_keyword(text);
        let mut inner = self.inner.lock().unwrap();
        if inner
            .keywords
            .iter()
            .any(|k| normalize_keyword(&k.text) == normalized)
        {
            return Err(StoreError::DuplicateKeyword(normalized));
        }
        let keyword = Keyword {
            id: Uuid::new_v4(),
            text: text.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        inner.keywords.push(keyword.clone());
        Ok(keyword)
    }

    async fn find_existing(
        &self,
        source_id: Uuid,
        dedup_key: &str,
    ) -> Result<Option<Match>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let id = inner.dedup.get(&(source_id, dedup_key.to_string()));
        Ok(id.and_then(|id| inner.matches.iter().find(|m| m.id == *id).cloned()))
    }

    async fn insert_match(&self, new_match: NewMatch) -> Result<Match, StoreError> {
        let dedup_key = new_match.dedup_key();
        let mut inner = self.inner.lock().unwrap();
        let key = (new_match.source_id, dedup_key.clone());
        if inner.dedup.contains_key(&key) {
            return Err(StoreError::ConstraintViolation(dedup_key));
        }
        let row = Match {
            id: Uuid::new_v4(),
            source_id: new_match.source_id,
            keyword_id: new_match.keyword_id,
            external_post_id: new_match.external_post_id,
            post_url: new_match.post_url,
            post_text: new_match.post_text,
            post_author: new_match.post_author,
            post_date: new_match.post_date,
            matched_text: new_match.matched_text,
            is_notified: false,
            created_at: Utc::now(),
        };
        inner.dedup.insert(key, row.id);
        inner.matches.push(row.clone());
        Ok(row)
    }

    async fn list_unnotified(&self) -> Result<Vec<Match>, StoreError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .matches
            .iter()
            .filter(|m| !m.is_notified)
            .cloned()
            .collect())
    }

    async fn mark_notified(&self, match_id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(m) = inner.matches.iter_mut().find(|m| m.id == match_id) {
            m.is_notified = true;
        }
        Ok(())
    }

    async fn update_last_scraped(
        &self,
        source_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(s) = inner.sources.iter_mut().find(|s| s.id == source_id) {
            s.last_scraped_at = Some(timestamp);
        }
        Ok(())
    }

    async fn notification_settings(
        &self,
        defaults: &NotificationSetting,
    ) -> Result<NotificationSetting, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(inner
            .settings
            .get_or_insert_with(|| defaults.clone())
            .clone())
    }

    async fn update_notification_settings(
        &self,
        settings: &NotificationSetting,
    ) -> Result<(), StoreError> {
        self.inner.lock().unwrap().settings = Some(settings.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_new_match(source_id: Uuid, external_post_id: Option<&str>) -> NewMatch {
        NewMatch {
            source_id,
            keyword_id: Uuid::new_v4(),
            external_post_id: external_post_id.map(String::from),
            post_url: "https://facebook.com/groups/g/posts/1".into(),
            post_text: "Pipe leak, need help".into(),
            post_author: Some("Jordan".into()),
            post_date: None,
            matched_text: "leak".into(),
        }
    }

    #[tokio::test]
    async fn same_external_post_id_inserts_once() {
        let store = MemoryMatchStore::new();
        let source_id = Uuid::new_v4();

        store
            .insert_match(make_new_match(source_id, Some("p1")))
            .await
            .unwrap();
        let second = store.insert_match(make_new_match(source_id, Some("p1"))).await;

        assert!(matches!(second, Err(StoreError::ConstraintViolation(_))));
        assert_eq!(store.all_matches().len(), 1);
    }

    #[tokio::test]
    async fn same_fingerprint_inserts_once() {
        let store = MemoryMatchStore::new();
        let source_id = Uuid::new_v4();

        store
            .insert_match(make_new_match(source_id, None))
            .await
            .unwrap();
        let second = store.insert_match(make_new_match(source_id, None)).await;

        assert!(matches!(second, Err(StoreError::ConstraintViolation(_))));
        assert_eq!(store.all_matches().len(), 1);
    }

    #[tokio::test]
    async fn same_post_id_under_different_sources_is_not_a_duplicate() {
        let store = MemoryMatchStore::new();

        store
            .insert_match(make_new_match(Uuid::new_v4(), Some("p1")))
            .await
            .unwrap();
        store
            .insert_match(make_new_match(Uuid::new_v4(), Some("p1")))
            .await
            .unwrap();

        assert_eq!(store.all_matches().len(), 2);
    }

    #[tokio::test]
    async fn mark_notified_is_idempotent() {
        let store = MemoryMatchStore::new();
        let m = store
            .insert_match(make_new_match(Uuid::new_v4(), Some("p1")))
            .await
            .unwrap();

        store.mark_notified(m.id).await.unwrap();
        store.mark_notified(m.id).await.unwrap();

        assert!(store.get_match(m.id).unwrap().is_notified);
        assert!(store.list_unnotified().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unnotified_matches_come_back_oldest_first() {
        let store = MemoryMatchStore::new();
        let first = store
            .insert_match(make_new_match(Uuid::new_v4(), Some("p1")))
            .await
            .unwrap();
        let second = store
            .insert_match(make_new_match(Uuid::new_v4(), Some("p2")))
            .await
            .unwrap();

        let pending = store.list_unnotified().await.unwrap();
        assert_eq!(
            pending.iter().map(|m| m.id).collect::<Vec<_>>(),
            vec![first.id, second.id]
        );
    }

    #[tokio::test]
    async fn keyword_uniqueness_is_case_insensitive() {
        let store = MemoryMatchStore::new();
        store.insert_keyword("House Cleaner").await.unwrap();
        let dup = store.insert_keyword("  house cleaner ").await;
        assert!(matches!(dup, Err(StoreError::DuplicateKeyword(_))));
    }

    #[tokio::test]
    async fn settings_created_lazily_from_defaults() {
        let store = MemoryMatchStore::new();
        let defaults = NotificationSetting {
            email_enabled: false,
            email_address: None,
            slack_enabled: true,
            slack_webhook: Some("https://hooks.slack.com/services/T/B/x".into()),
            updated_at: Utc::now(),
        };

        let settings = store.notification_settings(&defaults).await.unwrap();
        assert!(settings.slack_enabled);

        // A later read returns the stored row, not fresh defaults.
        let changed = NotificationSetting {
            slack_enabled: false,
            ..defaults.clone()
        };
        let settings = store.notification_settings(&changed).await.unwrap();
        assert!(settings.slack_enabled);
    }

    #[tokio::test]
    async fn update_last_scraped_advances_timestamp() {
        let store = MemoryMatchStore::new();
        let source = store
            .insert_source("Group A", "https://facebook.com/groups/a", SourceType::Facebook)
            .await
            .unwrap();
        assert!(source.last_scraped_at.is_none());

        let now = Utc::now();
        store.update_last_scraped(source.id, now).await.unwrap();
        let reloaded = store.source(source.id).await.unwrap().unwrap();
        assert_eq!(reloaded.last_scraped_at, Some(now));
    }
}
