//! Job scheduling with explicit per-job state.
//!
//! Three jobs: one scrape job per source type plus the notify job. Each job
//! carries its own Idle/Running/Disabled flag; a trigger — timer tick or
//! manual "run now" — only starts the body on an Idle job. Overlapping
//! triggers get a Busy answer instead of a queued second run, and the same
//! guard serves both trigger paths.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use leadscout_common::SourceType;

use crate::alert::run_notify_cycle;
use crate::context::EngineContext;
use crate::scrape::{run_scrape_cycle, CycleError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    FacebookScrape,
    NextdoorScrape,
    Notify,
}

impl JobKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FacebookScrape => "facebook-scrape",
            Self::NextdoorScrape => "nextdoor-scrape",
            Self::Notify => "notify",
        }
    }

    pub fn all() -> [JobKind; 3] {
        [Self::FacebookScrape, Self::NextdoorScrape, Self::Notify]
    }

    fn interval(&self, ctx: &EngineContext) -> Duration {
        let minutes = match self {
            Self::FacebookScrape | Self::NextdoorScrape => ctx.config.scrape_interval_minutes,
            Self::Notify => ctx.config.notify_interval_minutes,
        };
        Duration::from_secs(minutes.max(1) * 60)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    /// Credential failure detected; operator re-enable required.
    Disabled,
}

/// What a trigger caller gets back. Busy and Disabled mean the body did not
/// run — reported, not silently dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    Busy,
    Disabled,
}

struct Job {
    state: Mutex<JobState>,
}

pub struct Scheduler {
    ctx: Arc<EngineContext>,
    jobs: HashMap<JobKind, Job>,
}

impl Scheduler {
    pub fn new(ctx: Arc<EngineContext>) -> Self {
        let jobs = JobKind::all()
            .into_iter()
            .map(|kind| {
                (
                    kind,
                    Job {
                        state: Mutex::new(JobState::Idle),
                    },
                )
            })
            .collect();
        Self { ctx, jobs }
    }

    pub fn job_state(&self, kind: JobKind) -> JobState {
        *self.jobs[&kind].state.lock().unwrap()
    }

    /// Operator re-enable after a credential failure. Returns false when the
    /// job was not disabled.
    pub fn enable(&self, kind: JobKind) -> bool {
        let mut state = self.jobs[&kind].state.lock().unwrap();
        if *state == JobState::Disabled {
            *state = JobState::Idle;
            info!(job = kind.name(), "Job re-enabled");
            true
        } else {
            false
        }
    }

    /// Run one job to completion, unless it is already running or disabled.
    /// Timer ticks and manual "run now" both come through here.
    pub async fn trigger(&self, kind: JobKind) -> TriggerOutcome {
        {
            let mut state = self.jobs[&kind].state.lock().unwrap();
            match *state {
                JobState::Running => {
                    warn!(job = kind.name(), "Job already running, ignoring trigger");
                    return TriggerOutcome::Busy;
                }
                JobState::Disabled => {
                    warn!(
                        job = kind.name(),
                        "Job disabled, ignoring trigger (operator re-enable required)"
                    );
                    return TriggerOutcome::Disabled;
                }
                JobState::Idle => *state = JobState::Running,
            }
        }

        info!(job = kind.name(), "Job started");
        let result = self.run_body(kind).await;

        let next = match &result {
            Err(CycleError::CredentialFailure(_)) => JobState::Disabled,
            _ => JobState::Idle,
        };
        if let Err(err) = &result {
            error!(job = kind.name(), error = %err, "Job failed");
        }
        *self.jobs[&kind].state.lock().unwrap() = next;

        TriggerOutcome::Started
    }

    async fn run_body(&self, kind: JobKind) -> Result<(), CycleError> {
        match kind {
            JobKind::FacebookScrape => {
                run_scrape_cycle(&self.ctx, SourceType::Facebook).await?;
            }
            JobKind::NextdoorScrape => {
                run_scrape_cycle(&self.ctx, SourceType::Nextdoor).await?;
            }
            JobKind::Notify => {
                run_notify_cycle(&self.ctx).await?;
            }
        }
        Ok(())
    }

    /// Spawn one timer task per job. Tasks stop when `shutdown` flips; an
    /// in-flight cycle runs to completion first, so connector sessions are
    /// released by the cycle's own close.
    pub fn spawn_timers(
        self: &Arc<Self>,
        shutdown: watch::Receiver<bool>,
    ) -> Vec<JoinHandle<()>> {
        JobKind::all()
            .into_iter()
            .map(|kind| {
                let scheduler = Arc::clone(self);
                let mut shutdown = shutdown.clone();
                let period = kind.interval(&scheduler.ctx);
                tokio::spawn(async move {
                    let mut interval = tokio::time::interval(period);
                    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                    // The first tick completes immediately; consume it so
                    // the first run lands one interval after startup.
                    interval.tick().await;
                    loop {
                        tokio::select! {
                            _ = interval.tick() => {
                                let _ = scheduler.trigger(kind).await;
                            }
                            _ = shutdown.changed() => {
                                info!(job = kind.name(), "Timer stopped");
                                break;
                            }
                        }
                    }
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use leadscout_store::{MatchStore, MemoryMatchStore};

    use crate::testing::{
        test_context, MockAuth, MockConnectorFactory, RecordingChannel,
    };
    use crate::notify::Dispatcher;

    async fn seed_facebook_source(store: &MemoryMatchStore) {
        store
            .insert_source(
                "Group A",
                "https://facebook.com/groups/a",
                leadscout_common::SourceType::Facebook,
            )
            .await
            .unwrap();
        store.insert_keyword("leak").await.unwrap();
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(RecordingChannel::new("email")),
            Arc::new(RecordingChannel::new("slack")),
        )
    }

    #[tokio::test]
    async fn concurrent_trigger_returns_busy_and_skips_the_body() {
        let store = Arc::new(MemoryMatchStore::new());
        seed_facebook_source(&store).await;

        let factory = MockConnectorFactory::new().gated();
        let entered = factory.fetch_entered();
        let gate = factory.fetch_gate();
        let connects = factory.connect_count_handle();
        let ctx = Arc::new(test_context(store, Arc::new(factory), dispatcher()));
        let scheduler = Arc::new(Scheduler::new(ctx));

        // First trigger blocks inside the connector fetch.
        let first = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.trigger(JobKind::FacebookScrape).await })
        };
        entered.notified().await;
        assert_eq!(scheduler.job_state(JobKind::FacebookScrape), JobState::Running);

        // Second trigger while the body is gated: Busy, and no second
        // connector session is ever opened.
        let second = scheduler.trigger(JobKind::FacebookScrape).await;
        assert_eq!(second, TriggerOutcome::Busy);
        assert_eq!(connects.load(std::sync::atomic::Ordering::SeqCst), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), TriggerOutcome::Started);
        assert_eq!(scheduler.job_state(JobKind::FacebookScrape), JobState::Idle);
    }

    #[tokio::test]
    async fn credential_failure_disables_the_job_until_reenabled() {
        let store = Arc::new(MemoryMatchStore::new());
        seed_facebook_source(&store).await;
        store
            .update_notification_settings(&leadscout_common::NotificationSetting {
                email_enabled: false,
                email_address: None,
                slack_enabled: true,
                slack_webhook: Some("https://hooks.slack.com/services/T/B/x".into()),
                updated_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        let slack = Arc::new(RecordingChannel::new("slack"));
        let dispatcher = Dispatcher::new(Arc::new(RecordingChannel::new("email")), slack.clone());
        let factory = MockConnectorFactory::new().with_auth(MockAuth::Credential);
        let ctx = Arc::new(test_context(store, Arc::new(factory), dispatcher));
        let scheduler = Scheduler::new(ctx);

        assert_eq!(
            scheduler.trigger(JobKind::FacebookScrape).await,
            TriggerOutcome::Started
        );
        assert_eq!(scheduler.job_state(JobKind::FacebookScrape), JobState::Disabled);

        // The operator heard about it through a job-level alert, not a lead
        // notification.
        assert_eq!(slack.operator_alerts().len(), 1);
        assert!(slack.operator_alerts()[0].contains("credentials"));
        assert_eq!(slack.sent_count(), 0);

        // Further triggers are rejected until an operator re-enables.
        assert_eq!(
            scheduler.trigger(JobKind::FacebookScrape).await,
            TriggerOutcome::Disabled
        );
        assert!(scheduler.enable(JobKind::FacebookScrape));
        assert_eq!(scheduler.job_state(JobKind::FacebookScrape), JobState::Idle);
    }

    #[tokio::test]
    async fn captcha_skips_the_cycle_but_leaves_the_job_schedulable() {
        let store = Arc::new(MemoryMatchStore::new());
        seed_facebook_source(&store).await;

        let factory = MockConnectorFactory::new().with_auth(MockAuth::CaptchaOrRateLimit);
        let ctx = Arc::new(test_context(store, Arc::new(factory), dispatcher()));
        let scheduler = Scheduler::new(ctx);

        assert_eq!(
            scheduler.trigger(JobKind::FacebookScrape).await,
            TriggerOutcome::Started
        );
        assert_eq!(scheduler.job_state(JobKind::FacebookScrape), JobState::Idle);
        // Next trigger runs again — no Disabled latch for transient failures.
        assert_eq!(
            scheduler.trigger(JobKind::FacebookScrape).await,
            TriggerOutcome::Started
        );
    }

    #[tokio::test]
    async fn a_disabled_scrape_job_does_not_affect_the_notify_job() {
        let store = Arc::new(MemoryMatchStore::new());
        seed_facebook_source(&store).await;

        let factory = MockConnectorFactory::new().with_auth(MockAuth::Credential);
        let ctx = Arc::new(test_context(store, Arc::new(factory), dispatcher()));
        let scheduler = Scheduler::new(ctx);

        scheduler.trigger(JobKind::FacebookScrape).await;
        assert_eq!(scheduler.job_state(JobKind::FacebookScrape), JobState::Disabled);

        assert_eq!(
            scheduler.trigger(JobKind::Notify).await,
            TriggerOutcome::Started
        );
        assert_eq!(scheduler.job_state(JobKind::Notify), JobState::Idle);
    }
}
