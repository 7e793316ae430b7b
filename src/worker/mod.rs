//! DNS poll worker.
//!
//! Independently drains the task store: lists WAITING tasks oldest first,
//! queries public DNS for each token, and advances task and ownership state
//! through the engine. Resumes purely from persisted state, so the pipeline
//! and any API layer can be offline.

mod checker;

pub use checker::{token_matches, CheckOutcome, HickoryTxtChecker, TxtChecker};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::error_handling::StoreError;
use crate::models::{OwnershipStatus, TaskState, TxtTask};
use crate::storage::ResultStore;
use crate::verify::TxtVerificationEngine;

/// Counters for one worker tick.
#[derive(Debug, Default, Clone, Copy)]
pub struct TickSummary {
    /// Tasks actually checked this tick
    pub polled: usize,
    /// Tasks that transitioned to VERIFIED
    pub verified: usize,
    /// Tasks that transitioned to FAILED
    pub failed: usize,
    /// Tasks skipped because they are still inside the initial grace period
    pub deferred: usize,
    /// Per-task store errors, escalated to the log but not to siblings
    pub errors: usize,
}

/// Background worker polling DNS for outstanding verification tasks.
pub struct PollWorker {
    engine: TxtVerificationEngine,
    results: ResultStore,
    checker: Arc<dyn TxtChecker>,
    poll_interval: Duration,
    initial_wait: Duration,
}

impl PollWorker {
    /// Builds a worker over the shared stores and a checker implementation.
    pub fn new(
        engine: TxtVerificationEngine,
        results: ResultStore,
        checker: Arc<dyn TxtChecker>,
        poll_interval: Duration,
        initial_wait: Duration,
    ) -> Self {
        Self {
            engine,
            results,
            checker,
            poll_interval,
            initial_wait,
        }
    }

    fn in_grace_period(&self, task: &TxtTask, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(task.created_at);
        age.num_seconds() < self.initial_wait.as_secs() as i64
    }

    /// Runs one tick: one DNS check per eligible WAITING task, oldest first.
    ///
    /// A store failure on one task is logged and counted, never allowed to
    /// abort the remaining tasks.
    pub async fn run_once(&self) -> Result<TickSummary, StoreError> {
        let now = Utc::now();
        let tasks = self.engine.store().list_waiting().await?;
        let mut summary = TickSummary::default();

        for task in &tasks {
            if self.in_grace_period(task, now) {
                summary.deferred += 1;
                continue;
            }
            summary.polled += 1;
            match self.process_task(task, now).await {
                Ok(Some(TaskState::Verified)) => summary.verified += 1,
                Ok(Some(TaskState::Failed)) => summary.failed += 1,
                Ok(_) => {}
                Err(e) => {
                    // Fatal for this task only; escalate so lost updates stay visible
                    error!("Task {} store failure: {e}", task.id);
                    summary.errors += 1;
                }
            }
        }
        Ok(summary)
    }

    async fn process_task(
        &self,
        task: &TxtTask,
        now: DateTime<Utc>,
    ) -> Result<Option<TaskState>, StoreError> {
        info!(
            "Polling {} (task {}, attempt {}/{})",
            task.domain,
            task.id,
            task.attempts + 1,
            task.max_attempts
        );

        match self.checker.check(&task.domain, &task.expected_token).await {
            CheckOutcome::Match { raw } => {
                if !self.engine.record_success(task, &raw, now).await? {
                    return Ok(None);
                }
                self.results
                    .update_status(
                        &task.case_id,
                        &task.domain,
                        OwnershipStatus::VerifiedByTxt,
                        &format!(
                            "Domain control verified via DNS TXT at {}",
                            now.to_rfc3339()
                        ),
                    )
                    .await?;
                Ok(Some(TaskState::Verified))
            }
            CheckOutcome::NoMatch { raw, reason } => {
                info!("No token yet for {} ({reason})", task.domain);
                let state = self
                    .engine
                    .record_failure(task, raw.as_deref(), reason, now)
                    .await?;
                if state == TaskState::Failed {
                    self.results
                        .update_status(
                            &task.case_id,
                            &task.domain,
                            OwnershipStatus::Unknown,
                            &format!(
                                "Ownership not confirmed: TXT verification failed \
                                 ({reason}) after {} attempts",
                                task.max_attempts
                            ),
                        )
                        .await?;
                    return Ok(Some(TaskState::Failed));
                }
                Ok(None)
            }
        }
    }

    /// Long-lived loop: one tick per poll interval until cancelled.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(
            "TXT poll worker started (interval {}s, initial wait {}s)",
            self.poll_interval.as_secs(),
            self.initial_wait.as_secs()
        );
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match self.run_once().await {
                        Ok(summary) => info!(
                            "Tick: {} polled, {} verified, {} failed, {} deferred, {} errors",
                            summary.polled,
                            summary.verified,
                            summary.failed,
                            summary.deferred,
                            summary.errors
                        ),
                        // Listing failed; keep the loop alive and retry next tick
                        Err(e) => error!("Worker tick failed: {e}"),
                    }
                }
                _ = cancel.cancelled() => {
                    info!("TXT poll worker stopping");
                    break;
                }
            }
        }
    }

    /// Polls until every task of `case_id` is terminal or the token is
    /// cancelled. Used for inline verification right after a pipeline run;
    /// total exposure is bounded by initial_wait + max_attempts * interval.
    pub async fn drain_case(
        &self,
        case_id: &str,
        cancel: CancellationToken,
    ) -> Result<(), StoreError> {
        if !self.initial_wait.is_zero() {
            info!(
                "Waiting {}s before the first DNS check (case {case_id})",
                self.initial_wait.as_secs()
            );
            tokio::select! {
                _ = tokio::time::sleep(self.initial_wait) => {}
                _ = cancel.cancelled() => return Ok(()),
            }
        }

        loop {
            let open = self
                .engine
                .store()
                .list_by_case(case_id)
                .await?
                .into_iter()
                .filter(|t| !t.state.is_terminal())
                .count();
            if open == 0 {
                info!("All tasks of case {case_id} are terminal");
                return Ok(());
            }

            let summary = self.run_once().await?;
            info!(
                "Case {case_id}: {} open, {} verified this tick, {} failed this tick",
                open, summary.verified, summary.failed
            );

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = cancel.cancelled() => return Ok(()),
            }
        }
    }
}
