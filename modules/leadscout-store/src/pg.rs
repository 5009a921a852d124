use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use leadscout_common::{
    normalize_keyword, Keyword, Match, NewMatch, NotificationSetting, Source, SourceType,
    StoreError,
};

use crate::store::MatchStore;

/// Postgres-backed Match Store. Every mutation is a single statement, so
/// writes are atomic at row granularity — a shutdown mid-cycle can never
/// leave a partial Match behind.
#[derive(Clone)]
pub struct PgMatchStore {
    pool: PgPool,
}

impl PgMatchStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

type SourceRow = (
    Uuid,
    String,
    String,
    String,
    bool,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

type KeywordRow = (Uuid, String, bool, DateTime<Utc>);

type MatchRow = (
    Uuid,
    Uuid,
    Uuid,
    Option<String>,
    String,
    String,
    Option<String>,
    Option<DateTime<Utc>>,
    String,
    bool,
    DateTime<Utc>,
);

fn row_to_source(r: SourceRow) -> Result<Source, StoreError> {
    let source_type = SourceType::parse(&r.3)
        .ok_or_else(|| StoreError::Database(sqlx::Error::Decode(
            format!("unknown source type '{}'", r.3).into(),
        )))?;
    Ok(Source {
        id: r.0,
        name: r.1,
        url: r.2,
        source_type,
        is_active: r.4,
        created_at: r.5,
        last_scraped_at: r.6,
    })
}

fn row_to_keyword(r: KeywordRow) -> Keyword {
    Keyword {
        id: r.0,
        text: r.1,
        is_active: r.2,
        created_at: r.3,
    }
}

fn row_to_match(r: MatchRow) -> Match {
    Match {
        id: r.0,
        source_id: r.1,
        keyword_id: r.2,
        external_post_id: r.3,
        post_url: r.4,
        post_text: r.5,
        post_author: r.6,
        post_date: r.7,
        matched_text: r.8,
        is_notified: r.9,
        created_at: r.10,
    }
}

const MATCH_COLUMNS: &str = "id, source_id, keyword_id, external_post_id, post_url, post_text, \
     post_author, post_date, matched_text, is_notified, created_at";

// ---------------------------------------------------------------------------
// MatchStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl MatchStore for PgMatchStore {
    async fn active_sources(&self, source_type: SourceType) -> Result<Vec<Source>, StoreError> {
        let rows = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT id, name, url, source_type, is_active, created_at, last_scraped_at
            FROM sources
            WHERE source_type = $1 AND is_active
            ORDER BY created_at
            "#,
        )
        .bind(source_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_source).collect()
    }

    async fn active_keywords(&self) -> Result<Vec<Keyword>, StoreError> {
        let rows = sqlx::query_as::<_, KeywordRow>(
            r#"
            SELECT id, text, is_active, created_at
            FROM keywords
            WHERE is_active
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_keyword).collect())
    }

    async fn source(&self, id: Uuid) -> Result<Option<Source>, StoreError> {
        let row = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT id, name, url, source_type, is_active, created_at, last_scraped_at
            FROM sources
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_source).transpose()
    }

    async fn keyword(&self, id: Uuid) -> Result<Option<Keyword>, StoreError> {
        let row = sqlx::query_as::<_, KeywordRow>(
            r#"
            SELECT id, text, is_active, created_at
            FROM keywords
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_keyword))
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

        sqlx::query(
            r#"
            INSERT INTO sources (id, name, url, source_type, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(source.id)
        .bind(&source.name)
        .bind(&source.url)
        .bind(source.source_type.as_str())
        .bind(source.is_active)
        .bind(source.created_at)
        .execute(&self.pool)
        .await?;

        Ok(source)
    }

    async fn insert_keyword(&self, text: &str) -> Result<Keyword, StoreError> {
        let keyword = Keyword {
            id: Uuid::new_v4(),
            text: text.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        let normalized = normalize_keyword(text);

        let result = sqlx::query(
            r#"
            INSERT INTO keywords (id, text, normalized_text, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(keyword.id)
        .bind(&keyword.text)
        .bind(&normalized)
        .bind(keyword.is_active)
        .bind(keyword.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(keyword),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateKeyword(normalized))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn find_existing(
        &self,
        source_id: Uuid,
        dedup_key: &str,
    ) -> Result<Option<Match>, StoreError> {
        let row = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE source_id = $1 AND dedup_key = $2"
        ))
        .bind(source_id)
        .bind(dedup_key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_match))
    }

    async fn insert_match(&self, new_match: NewMatch) -> Result<Match, StoreError> {
        let dedup_key = new_match.dedup_key();
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

        let result = sqlx::query(
            r#"
            INSERT INTO matches (id, source_id, keyword_id, external_post_id, dedup_key,
                                 post_url, post_text, post_author, post_date, matched_text,
                                 is_notified, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(row.id)
        .bind(row.source_id)
        .bind(row.keyword_id)
        .bind(&row.external_post_id)
        .bind(&dedup_key)
        .bind(&row.post_url)
        .bind(&row.post_text)
        .bind(&row.post_author)
        .bind(row.post_date)
        .bind(&row.matched_text)
        .bind(row.is_notified)
        .bind(row.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(row),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::ConstraintViolation(dedup_key))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_unnotified(&self) -> Result<Vec<Match>, StoreError> {
        let rows = sqlx::query_as::<_, MatchRow>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE NOT is_notified ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_match).collect())
    }

    async fn mark_notified(&self, match_id: Uuid) -> Result<(), StoreError> {
        // Setting is_notified on an already-true row is a no-op by
        // construction; the flag never reverts.
        sqlx::query("UPDATE matches SET is_notified = TRUE WHERE id = $1")
            .bind(match_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_last_scraped(
        &self,
        source_id: Uuid,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE sources SET last_scraped_at = $2 WHERE id = $1")
            .bind(source_id)
            .bind(timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn notification_settings(
        &self,
        defaults: &NotificationSetting,
    ) -> Result<NotificationSetting, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notification_settings
                (singleton, email_enabled, email_address, slack_enabled, slack_webhook, updated_at)
            VALUES (TRUE, $1, $2, $3, $4, $5)
            ON CONFLICT (singleton) DO NOTHING
            "#,
        )
        .bind(defaults.email_enabled)
        .bind(&defaults.email_address)
        .bind(defaults.slack_enabled)
        .bind(&defaults.slack_webhook)
        .bind(defaults.updated_at)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, (bool, Option<String>, bool, Option<String>, DateTime<Utc>)>(
            r#"
            SELECT email_enabled, email_address, slack_enabled, slack_webhook, updated_at
            FROM notification_settings
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(NotificationSetting {
            email_enabled: row.0,
            email_address: row.1,
            slack_enabled: row.2,
            slack_webhook: row.3,
            updated_at: row.4,
        })
    }

    async fn update_notification_settings(
        &self,
        settings: &NotificationSetting,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE notification_settings
            SET email_enabled = $1, email_address = $2,
                slack_enabled = $3, slack_webhook = $4, updated_at = $5
            "#,
        )
        .bind(settings.email_enabled)
        .bind(&settings.email_address)
        .bind(settings.slack_enabled)
        .bind(&settings.slack_webhook)
        .bind(settings.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
