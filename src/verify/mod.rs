//! TXT verification engine.
//!
//! Issues challenge tokens, persists tasks, and owns the task state machine:
//! WAITING -> VERIFIED on an observed token, WAITING -> FAILED on attempt
//! exhaustion, nothing else. Recording a check outcome against a terminal
//! task is an explicit no-op here, and the store's guarded UPDATEs enforce
//! the same invariant underneath.

use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::Rng;

use crate::config::{TOKEN_PREFIX, TXT_RECORD_NAME};
use crate::error_handling::{CheckFailure, StoreError};
use crate::models::{TaskState, TxtTask};
use crate::storage::TaskStore;

/// Engine over the durable task store.
#[derive(Clone)]
pub struct TxtVerificationEngine {
    store: TaskStore,
}

/// Generates a fresh verification token: fixed prefix plus 64 bits from a
/// CSPRNG, hex-encoded. Not derived from the domain, so tokens cannot be
/// predicted from public data.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 8];
    rand::rng().fill(&mut bytes[..]);
    format!("{TOKEN_PREFIX}{}", hex::encode(bytes))
}

impl TxtVerificationEngine {
    /// Creates an engine over an initialized store.
    pub fn new(store: TaskStore) -> Self {
        Self { store }
    }

    /// Access to the underlying store, for the poll worker.
    pub fn store(&self) -> &TaskStore {
        &self.store
    }

    /// Mints and persists a WAITING task for `domain`, returning
    /// `(task_id, token)`.
    ///
    /// Deliberately not idempotent per (case, domain): issuing a second task
    /// re-challenges the owner with a fresh token.
    ///
    /// `max_attempts` is clamped to at least 1. A task minted with a bound of
    /// zero would start with `attempts >= max_attempts`: never polled, never
    /// FAILED, WAITING forever.
    pub async fn create_task(
        &self,
        domain: &str,
        case_id: &str,
        max_attempts: u32,
    ) -> Result<(String, String), StoreError> {
        let max_attempts = max_attempts.max(1);
        let task_id = uuid::Uuid::new_v4().to_string();
        let token = generate_token();
        let now = Utc::now();

        let task = TxtTask {
            id: task_id.clone(),
            case_id: case_id.to_string(),
            domain: domain.to_string(),
            txt_name: TXT_RECORD_NAME.to_string(),
            expected_token: token.clone(),
            state: TaskState::Waiting,
            attempts: 0,
            max_attempts,
            last_checked_at: None,
            verified_at: None,
            fail_reason: None,
            dns_raw_result: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create(&task).await?;

        info!("Created TXT verification task {task_id} for {domain} (case {case_id})");
        Ok((task_id, token))
    }

    /// Read-only snapshot of a task. Never mutates state or attempts.
    pub async fn get_status(&self, task_id: &str) -> Result<Option<TxtTask>, StoreError> {
        self.store.get(task_id).await
    }

    /// Human-readable instructions for the claimed owner. Read-only.
    pub async fn instructions(&self, task_id: &str) -> Result<Option<String>, StoreError> {
        let Some(task) = self.store.get(task_id).await? else {
            return Ok(None);
        };

        let mut text = format!(
            "Add the following DNS TXT record for {domain}:\n\
             \n\
               Host/Name: {name}\n\
               Type:      TXT\n\
               Value:     {token}\n\
             \n\
             The record is checked automatically. \
             Attempts so far: {attempts}/{max_attempts}. Status: {status}.",
            domain = task.domain,
            name = task.txt_name,
            token = task.expected_token,
            attempts = task.attempts,
            max_attempts = task.max_attempts,
            status = task.state.as_str(),
        );

        match task.state {
            TaskState::Verified => {
                if let Some(at) = task.verified_at {
                    text.push_str(&format!("\nVerified at: {}", at.to_rfc3339()));
                }
            }
            TaskState::Failed => {
                let reason = task
                    .fail_reason
                    .as_deref()
                    .unwrap_or("maximum attempts exceeded");
                text.push_str(&format!("\nVerification failed: {reason}"));
            }
            TaskState::Waiting => {}
        }

        Ok(Some(text))
    }

    /// Records a successful check: WAITING -> VERIFIED, raw response kept as
    /// evidence. Returns `false` without touching the row when the task is
    /// already terminal.
    pub async fn record_success(
        &self,
        task: &TxtTask,
        dns_raw: &str,
        observed_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        if task.state.is_terminal() {
            warn!(
                "Ignoring check result for terminal task {} ({})",
                task.id,
                task.state.as_str()
            );
            return Ok(false);
        }
        self.store
            .mark_verified(&task.id, dns_raw, observed_at)
            .await?;
        info!("Task {} VERIFIED for {}", task.id, task.domain);
        Ok(true)
    }

    /// Records a failed check attempt with its categorized reason. Returns the
    /// resulting state, or the unchanged terminal state as a no-op.
    pub async fn record_failure(
        &self,
        task: &TxtTask,
        dns_raw: Option<&str>,
        reason: CheckFailure,
        checked_at: DateTime<Utc>,
    ) -> Result<TaskState, StoreError> {
        if task.state.is_terminal() {
            warn!(
                "Ignoring check result for terminal task {} ({})",
                task.id,
                task.state.as_str()
            );
            return Ok(task.state);
        }
        let state = self
            .store
            .record_failed_attempt(&task.id, dns_raw, reason.as_str(), checked_at)
            .await?;
        if state == TaskState::Failed {
            info!(
                "Task {} FAILED for {} after {} attempts",
                task.id, task.domain, task.max_attempts
            );
        }
        Ok(state)
    }
}
