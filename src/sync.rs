//! External-meetings sync
//!
//! Triggers the backend import task, then polls its status with jittered
//! exponential backoff until the task finishes or a ceiling is hit:
//! at most `max_polls` status requests and at most `max_elapsed` of wall
//! clock, whichever comes first. Polling pauses while the dashboard is
//! hidden; hidden time still counts toward `max_elapsed`.

use crate::client::CoachApi;
use crate::error::AppResult;
use crate::models::{SyncOutcome, SyncTask, TaskState};
use crate::utils::backoff::BackoffPolicy;
use crate::utils::logging;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep_until, timeout_at, Instant};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub backoff: BackoffPolicy,
    pub max_polls: u32,
    pub max_elapsed: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            backoff: BackoffPolicy::default(),
            max_polls: 40,
            max_elapsed: Duration::from_secs(120),
        }
    }
}

/// How the status polling ended, before any re-fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum PollResult {
    Succeeded { polls: u32 },
    Failed { polls: u32, message: String },
    TimedOut { polls: u32, elapsed: Duration },
    Cancelled { polls: u32 },
}

enum Wait {
    Ready,
    Deadline,
    Cancelled,
}

/// Publishes the time of the last successful sync so other views know to
/// re-fetch.
#[derive(Debug, Clone)]
pub struct SyncNotifier {
    tx: Arc<watch::Sender<Option<DateTime<Utc>>>>,
}

impl SyncNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DateTime<Utc>>> {
        self.tx.subscribe()
    }

    pub fn last_synced(&self) -> Option<DateTime<Utc>> {
        *self.tx.borrow()
    }

    pub fn mark_synced(&self) -> DateTime<Utc> {
        let now = Utc::now();
        self.tx.send_replace(Some(now));
        now
    }
}

impl Default for SyncNotifier {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SyncPoller<A: ?Sized> {
    api: Arc<A>,
    config: PollConfig,
    notifier: SyncNotifier,
    /// `true` while the dashboard is visible.
    visibility: watch::Receiver<bool>,
    shutdown: CancellationToken,
}

impl<A: CoachApi + ?Sized> SyncPoller<A> {
    pub fn new(api: Arc<A>, notifier: SyncNotifier) -> Self {
        let (_tx, visibility) = watch::channel(true);
        Self {
            api,
            config: PollConfig::default(),
            notifier,
            visibility,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: PollConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_visibility(mut self, visibility: watch::Receiver<bool>) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn trigger(&self) -> AppResult<SyncTask> {
        self.api.trigger_external_meetings().await
    }

    /// Trigger, poll, and on success re-fetch the meeting list once.
    pub async fn run_sync(&self) -> AppResult<SyncOutcome> {
        let task = self.trigger().await?;
        let task_id = task.task_id;
        info!("[Sync] polling task {}", task_id);

        let outcome = match self.poll_until_terminal(&task_id).await {
            PollResult::Succeeded { polls } => match self.api.list_meetings().await {
                Ok(refreshed) => {
                    self.notifier.mark_synced();
                    info!("[Sync] task {} finished after {} polls, {} meetings", task_id, polls, refreshed.len());
                    SyncOutcome::Completed { task_id, polls, refreshed }
                }
                Err(e) => {
                    warn!("[Sync] task {} finished but meetings reload failed: {}", task_id, e);
                    SyncOutcome::Failed {
                        task_id,
                        message: format!("Sync finished but meetings could not be reloaded: {}", e.to_safe_string()),
                    }
                }
            },
            PollResult::Failed { message, .. } => {
                warn!("[Sync] task {} failed: {}", task_id, message);
                SyncOutcome::Failed { task_id, message }
            }
            PollResult::TimedOut { polls, elapsed } => {
                warn!("[Sync] task {} still running after {} polls / {:?}", task_id, polls, elapsed);
                SyncOutcome::TimedOut { task_id, polls, elapsed }
            }
            PollResult::Cancelled { polls } => {
                info!("[Sync] polling for task {} cancelled", task_id);
                SyncOutcome::Cancelled { task_id, polls }
            }
        };

        Ok(outcome)
    }

    pub async fn poll_until_terminal(&self, task_id: &str) -> PollResult {
        let started = Instant::now();
        let deadline = started + self.config.max_elapsed;
        let mut rng = StdRng::from_entropy();
        let mut visibility = self.visibility.clone();
        let mut polls = 0u32;

        loop {
            if polls >= self.config.max_polls {
                return PollResult::TimedOut { polls, elapsed: started.elapsed() };
            }

            let delay = self.config.backoff.delay_for(polls, &mut rng);
            let wake_at = std::cmp::min(Instant::now() + delay, deadline);
            tokio::select! {
                _ = sleep_until(wake_at) => {}
                _ = self.shutdown.cancelled() => return PollResult::Cancelled { polls },
            }

            match self.wait_until_visible(&mut visibility, deadline).await {
                Wait::Ready => {}
                Wait::Deadline => return PollResult::TimedOut { polls, elapsed: started.elapsed() },
                Wait::Cancelled => return PollResult::Cancelled { polls },
            }

            if Instant::now() >= deadline {
                return PollResult::TimedOut { polls, elapsed: started.elapsed() };
            }

            polls += 1;
            let status = tokio::select! {
                result = timeout_at(deadline, self.api.task_status(task_id)) => result,
                _ = self.shutdown.cancelled() => return PollResult::Cancelled { polls },
            };

            match status {
                Err(_) => return PollResult::TimedOut { polls, elapsed: started.elapsed() },
                Ok(Ok(status)) => {
                    logging::log_sync_poll(task_id, polls, status.status.as_str());
                    match status.status {
                        TaskState::Success => return PollResult::Succeeded { polls },
                        TaskState::Failure => {
                            return PollResult::Failed { polls, message: status.failure_message() }
                        }
                        _ => {}
                    }
                }
                Ok(Err(e)) if e.is_transient() => {
                    warn!("[Sync] status poll #{} for {} failed, will retry: {}", polls, task_id, e);
                }
                Ok(Err(e)) => {
                    return PollResult::Failed { polls, message: e.to_safe_string() };
                }
            }
        }
    }

    async fn wait_until_visible(&self, visibility: &mut watch::Receiver<bool>, deadline: Instant) -> Wait {
        loop {
            if *visibility.borrow_and_update() {
                return Wait::Ready;
            }

            debug!("[Sync] dashboard hidden, pausing status polling");
            tokio::select! {
                changed = visibility.changed() => {
                    // Sender gone: nobody can hide the dashboard any more.
                    if changed.is_err() {
                        return Wait::Ready;
                    }
                }
                _ = sleep_until(deadline) => return Wait::Deadline,
                _ = self.shutdown.cancelled() => return Wait::Cancelled,
            }
        }
    }
}
