//! The notify cycle: pull unnotified matches oldest-first, fan each out to
//! the enabled channels, mark notified when at least one delivery lands.

use std::fmt;

use tracing::{info, warn};

use crate::context::EngineContext;
use crate::scrape::CycleError;

/// Stats from one notify cycle.
#[derive(Debug, Default)]
pub struct NotifyStats {
    pub pending: usize,
    pub notified: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl fmt::Display for NotifyStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pending={} notified={} failed={} skipped={}",
            self.pending, self.notified, self.failed, self.skipped,
        )
    }
}

pub async fn run_notify_cycle(ctx: &EngineContext) -> Result<NotifyStats, CycleError> {
    let mut stats = NotifyStats::default();

    let settings = ctx
        .store
        .notification_settings(&ctx.default_notification_settings())
        .await?;

    let pending = ctx.store.list_unnotified().await?;
    stats.pending = pending.len();
    if pending.is_empty() {
        info!("No new matches to notify");
        return Ok(stats);
    }

    info!(count = pending.len(), "Processing new matches for notification");

    for m in pending {
        let source = ctx.store.source(m.source_id).await?;
        let keyword = ctx.store.keyword(m.keyword_id).await?;
        let (Some(source), Some(keyword)) = (source, keyword) else {
            // Dangling reference — skip this match, keep processing.
            warn!(match_id = %m.id, "Match references a missing source or keyword, skipping");
            stats.skipped += 1;
            continue;
        };

        if ctx.dispatcher.dispatch(&m, &settings, &source, &keyword).await {
            ctx.store.mark_notified(m.id).await?;
            stats.notified += 1;
        } else {
            // Stays unnotified; the next cycle picks it up again.
            stats.failed += 1;
        }
    }

    info!(%stats, "Notify cycle complete");
    Ok(stats)
}
