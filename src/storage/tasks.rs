//! Task table access.
//!
//! Every state transition here is a conditional UPDATE guarded by
//! `status = 'WAITING'`: attempts can only grow, and VERIFIED/FAILED rows can
//! never change again. A guarded update that matches zero rows for a task the
//! caller read as WAITING is reported as a conflict, not ignored.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error_handling::StoreError;
use crate::models::{TaskState, TxtTask};

/// Durable storage handle for TXT verification tasks.
#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

fn parse_ts(raw: &str, column: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp in {column}: {raw} ({e})")))
}

fn parse_opt_ts(raw: Option<String>, column: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
    raw.map(|s| parse_ts(&s, column)).transpose()
}

fn task_from_row(row: &SqliteRow) -> Result<TxtTask, StoreError> {
    let status: String = row.get("status");
    let state = TaskState::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown task status: {status}")))?;
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(TxtTask {
        id: row.get("id"),
        case_id: row.get("case_id"),
        domain: row.get("domain"),
        txt_name: row.get("txt_name"),
        expected_token: row.get("expected_token"),
        state,
        attempts: row.get::<i64, _>("attempts") as u32,
        max_attempts: row.get::<i64, _>("max_attempts") as u32,
        last_checked_at: parse_opt_ts(row.get("last_checked_at"), "last_checked_at")?,
        verified_at: parse_opt_ts(row.get("verified_at"), "verified_at")?,
        fail_reason: row.get("fail_reason"),
        dns_raw_result: row.get("dns_raw_result"),
        created_at: parse_ts(&created_at, "created_at")?,
        updated_at: parse_ts(&updated_at, "updated_at")?,
    })
}

impl TaskStore {
    /// Creates a store over an initialized pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persists a freshly minted task.
    pub async fn create(&self, task: &TxtTask) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO txt_verification_tasks
             (id, case_id, domain, txt_name, expected_token, status,
              attempts, max_attempts, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&task.id)
        .bind(&task.case_id)
        .bind(&task.domain)
        .bind(&task.txt_name)
        .bind(&task.expected_token)
        .bind(task.state.as_str())
        .bind(task.attempts as i64)
        .bind(task.max_attempts as i64)
        .bind(task.created_at.to_rfc3339())
        .bind(task.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetches a task by id. Read-only.
    pub async fn get(&self, task_id: &str) -> Result<Option<TxtTask>, StoreError> {
        let row = sqlx::query("SELECT * FROM txt_verification_tasks WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(task_from_row).transpose()
    }

    /// Lists tasks still eligible for polling, oldest first.
    pub async fn list_waiting(&self) -> Result<Vec<TxtTask>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM txt_verification_tasks
             WHERE status = 'WAITING' AND attempts < max_attempts
             ORDER BY created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    /// Lists all tasks of a case, oldest first.
    pub async fn list_by_case(&self, case_id: &str) -> Result<Vec<TxtTask>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM txt_verification_tasks WHERE case_id = ? ORDER BY created_at ASC",
        )
        .bind(case_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    /// Transitions WAITING -> VERIFIED, storing the raw DNS response as
    /// evidence. Errors with [`StoreError::Conflict`] if the row was no longer
    /// WAITING.
    pub async fn mark_verified(
        &self,
        task_id: &str,
        dns_raw: &str,
        verified_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let stamp = verified_at.to_rfc3339();
        let result = sqlx::query(
            "UPDATE txt_verification_tasks
             SET status = 'VERIFIED',
                 dns_raw_result = ?,
                 verified_at = ?,
                 last_checked_at = ?,
                 updated_at = ?
             WHERE id = ? AND status = 'WAITING'",
        )
        .bind(dns_raw)
        .bind(&stamp)
        .bind(&stamp)
        .bind(&stamp)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                task_id: task_id.to_string(),
            });
        }
        Ok(())
    }

    /// Records one failed poll attempt in a single guarded UPDATE: increments
    /// the attempt counter, stamps the check time, keeps the raw response when
    /// one exists, and flips the task to FAILED when the bound is reached.
    ///
    /// Returns the state the task ended up in.
    pub async fn record_failed_attempt(
        &self,
        task_id: &str,
        dns_raw: Option<&str>,
        reason: &str,
        checked_at: DateTime<Utc>,
    ) -> Result<TaskState, StoreError> {
        let stamp = checked_at.to_rfc3339();
        let result = sqlx::query(
            "UPDATE txt_verification_tasks
             SET attempts = attempts + 1,
                 last_checked_at = ?,
                 dns_raw_result = COALESCE(?, dns_raw_result),
                 fail_reason = ?,
                 status = CASE WHEN attempts + 1 >= max_attempts
                               THEN 'FAILED' ELSE status END,
                 updated_at = ?
             WHERE id = ? AND status = 'WAITING'",
        )
        .bind(&stamp)
        .bind(dns_raw)
        .bind(reason)
        .bind(&stamp)
        .bind(task_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict {
                task_id: task_id.to_string(),
            });
        }

        let task = self.get(task_id).await?.ok_or_else(|| {
            StoreError::Corrupt(format!("task {task_id} vanished mid-transition"))
        })?;
        Ok(task.state)
    }
}
