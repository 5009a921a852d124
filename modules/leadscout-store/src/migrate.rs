//! Idempotent schema setup, run at binary startup.

use sqlx::PgPool;
use tracing::info;

use leadscout_common::StoreError;

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sources (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        url TEXT NOT NULL,
        source_type TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        last_scraped_at TIMESTAMPTZ
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS keywords (
        id UUID PRIMARY KEY,
        text TEXT NOT NULL,
        normalized_text TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS keywords_normalized_text_idx
        ON keywords (normalized_text)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS matches (
        id UUID PRIMARY KEY,
        source_id UUID NOT NULL REFERENCES sources(id),
        keyword_id UUID NOT NULL REFERENCES keywords(id),
        external_post_id TEXT,
        dedup_key TEXT NOT NULL,
        post_url TEXT NOT NULL,
        post_text TEXT NOT NULL,
        post_author TEXT,
        post_date TIMESTAMPTZ,
        matched_text TEXT NOT NULL,
        is_notified BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS matches_source_dedup_idx
        ON matches (source_id, dedup_key)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS matches_unnotified_idx
        ON matches (created_at)
        WHERE NOT is_notified
    "#,
    // Single-row table: the primary key can only ever hold TRUE.
    r#"
    CREATE TABLE IF NOT EXISTS notification_settings (
        singleton BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (singleton),
        email_enabled BOOLEAN NOT NULL,
        email_address TEXT,
        slack_enabled BOOLEAN NOT NULL,
        slack_webhook TEXT,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
];

pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Schema migration complete");
    Ok(())
}
