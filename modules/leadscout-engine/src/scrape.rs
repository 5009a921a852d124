//! The scrape cycle: one connector session per source type, reused across
//! every active source of that type, with per-source failure isolation.

use std::fmt;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};

use leadscout_common::{matcher, AuthError, Keyword, NewMatch, Source, SourceType, StoreError};
use leadscout_connectors::SourceConnector;

use crate::context::EngineContext;

/// Job-level failure. Per-source and per-match errors never reach this —
/// they are logged and isolated inside the cycle. A credential failure
/// disables the job until an operator re-enables it; a store failure is
/// reported to the trigger caller and the job stays schedulable.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("credential failure: {0}")]
    CredentialFailure(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Stats from one scrape cycle.
#[derive(Debug, Default)]
pub struct ScrapeStats {
    pub sources_scraped: usize,
    pub source_failures: usize,
    pub posts_seen: usize,
    pub matches_created: usize,
    pub duplicates_skipped: usize,
    /// True when the whole cycle was skipped on a transient auth failure.
    pub auth_skipped: bool,
}

impl fmt::Display for ScrapeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "sources_scraped={} source_failures={} posts_seen={} matches_created={} duplicates_skipped={}",
            self.sources_scraped,
            self.source_failures,
            self.posts_seen,
            self.matches_created,
            self.duplicates_skipped,
        )
    }
}

pub async fn run_scrape_cycle(
    ctx: &EngineContext,
    source_type: SourceType,
) -> Result<ScrapeStats, CycleError> {
    let mut stats = ScrapeStats::default();

    let sources = ctx.store.active_sources(source_type).await?;
    if sources.is_empty() {
        info!(source_type = %source_type, "No active sources, nothing to scrape");
        return Ok(stats);
    }

    let keywords = ctx.store.active_keywords().await?;
    if keywords.is_empty() {
        info!(source_type = %source_type, "No active keywords, nothing to match");
        return Ok(stats);
    }

    let mut connector = ctx.connectors.connect(source_type);

    // One login per cycle, lazily before the first source; the session is
    // reused for every source of this type below.
    match connector.login().await {
        Ok(()) => {}
        Err(AuthError::CaptchaOrRateLimit(msg)) => {
            warn!(
                source_type = %source_type,
                error = %msg,
                "Captcha or rate limit at login, skipping this cycle"
            );
            alert_operator(
                ctx,
                &format!("{} scraping hit a captcha or rate limit; cycle skipped: {msg}",
                    source_type.display_name()),
            )
            .await;
            connector.close().await;
            stats.auth_skipped = true;
            return Ok(stats);
        }
        Err(AuthError::Credential(msg)) => {
            error!(
                source_type = %source_type,
                error = %msg,
                "Credential failure, disabling scrape job until reconfigured"
            );
            alert_operator(
                ctx,
                &format!("{} credentials were rejected; scraping disabled until reconfigured: {msg}",
                    source_type.display_name()),
            )
            .await;
            connector.close().await;
            return Err(CycleError::CredentialFailure(msg));
        }
    }

    let result = scrape_sources(ctx, connector.as_mut(), &sources, &keywords, &mut stats).await;
    // The session is released whether the loop finished or a store error
    // cut it short.
    connector.close().await;
    result?;

    info!(source_type = %source_type, %stats, "Scrape cycle complete");
    Ok(stats)
}

async fn scrape_sources(
    ctx: &EngineContext,
    connector: &mut dyn SourceConnector,
    sources: &[Source],
    keywords: &[Keyword],
    stats: &mut ScrapeStats,
) -> Result<(), CycleError> {
    for source in sources {
        match connector
            .fetch(&source.url, ctx.config.max_posts_per_source)
            .await
        {
            Ok(posts) => {
                stats.posts_seen += posts.len();
                for post in &posts {
                    // First keyword in store ordering wins; at most one
                    // match per post per scrape.
                    let Some(keyword) = matcher::first_match(&post.text, keywords) else {
                        continue;
                    };

                    let new_match = NewMatch::from_post(post, source.id, keyword);
                    let dedup_key = new_match.dedup_key();

                    if ctx.store.find_existing(source.id, &dedup_key).await?.is_some() {
                        stats.duplicates_skipped += 1;
                        continue;
                    }

                    match ctx.store.insert_match(new_match).await {
                        Ok(m) => {
                            info!(
                                source = %source.name,
                                keyword = %keyword.text,
                                match_id = %m.id,
                                "New lead match"
                            );
                            stats.matches_created += 1;
                        }
                        // A concurrent insert won the race — expected, not an error.
                        Err(StoreError::ConstraintViolation(_)) => {
                            stats.duplicates_skipped += 1;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                stats.sources_scraped += 1;
            }
            Err(err) => {
                error!(
                    source_id = %source.id,
                    source = %source.name,
                    error = %err,
                    "Source scrape failed, continuing with next source"
                );
                stats.source_failures += 1;
            }
        }

        // The source was attempted — advance its scrape marker regardless
        // of outcome so a persistently failing source still registers.
        ctx.store
            .update_last_scraped(source.id, Utc::now())
            .await?;
    }

    Ok(())
}

/// Best-effort operator alert for job-level auth events.
pub(crate) async fn alert_operator(ctx: &EngineContext, text: &str) {
    match ctx
        .store
        .notification_settings(&ctx.default_notification_settings())
        .await
    {
        Ok(settings) => ctx.dispatcher.operator_alert(&settings, text).await,
        Err(err) => {
            warn!(error = %err, "Could not load notification settings for operator alert");
        }
    }
}
