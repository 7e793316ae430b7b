//! Ownership-result table access, keyed by (case, domain).

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::error_handling::StoreError;
use crate::models::{DomainOwnershipResult, OwnershipStatus};

/// Durable storage handle for per-(case, domain) ownership conclusions.
#[derive(Clone)]
pub struct ResultStore {
    pool: SqlitePool,
}

fn result_from_row(row: &SqliteRow) -> Result<DomainOwnershipResult, StoreError> {
    let status: String = row.get("ownership_status");
    let status = OwnershipStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("unknown ownership status: {status}")))?;
    let updated_at: String = row.get("updated_at");
    let updated_at = DateTime::parse_from_rfc3339(&updated_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad updated_at: {updated_at} ({e})")))?;

    Ok(DomainOwnershipResult {
        case_id: row.get("case_id"),
        domain: row.get("domain"),
        status,
        reason: row.get("ownership_reason"),
        txt_task_id: row.get("txt_task_id"),
        updated_at,
    })
}

impl ResultStore {
    /// Creates a store over an initialized pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces the conclusion for a (case, domain) pair.
    pub async fn upsert(
        &self,
        case_id: &str,
        domain: &str,
        status: OwnershipStatus,
        reason: &str,
        txt_task_id: Option<&str>,
        lookup_raw: Option<&str>,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO domain_results
             (case_id, domain, ownership_status, ownership_reason, txt_task_id,
              lookup_raw, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(case_id, domain) DO UPDATE SET
                 ownership_status = excluded.ownership_status,
                 ownership_reason = excluded.ownership_reason,
                 txt_task_id = excluded.txt_task_id,
                 lookup_raw = COALESCE(excluded.lookup_raw, lookup_raw),
                 updated_at = excluded.updated_at",
        )
        .bind(case_id)
        .bind(domain)
        .bind(status.as_str())
        .bind(reason)
        .bind(txt_task_id)
        .bind(lookup_raw)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Updates status and reason for a (case, domain) pair. Used by the poll
    /// worker when a task reaches a terminal state.
    ///
    /// Inserts the row when the pipeline never wrote one (worker running
    /// against tasks minted elsewhere), so the transition is never dropped.
    /// An existing row keeps its `txt_task_id` and `lookup_raw`.
    pub async fn update_status(
        &self,
        case_id: &str,
        domain: &str,
        status: OwnershipStatus,
        reason: &str,
    ) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO domain_results
             (case_id, domain, ownership_status, ownership_reason, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(case_id, domain) DO UPDATE SET
                 ownership_status = excluded.ownership_status,
                 ownership_reason = excluded.ownership_reason,
                 updated_at = excluded.updated_at",
        )
        .bind(case_id)
        .bind(domain)
        .bind(status.as_str())
        .bind(reason)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetches the conclusion for a (case, domain) pair.
    pub async fn get(
        &self,
        case_id: &str,
        domain: &str,
    ) -> Result<Option<DomainOwnershipResult>, StoreError> {
        let row = sqlx::query("SELECT * FROM domain_results WHERE case_id = ? AND domain = ?")
            .bind(case_id)
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(result_from_row).transpose()
    }

    /// Lists all conclusions of a case.
    pub async fn list_by_case(
        &self,
        case_id: &str,
    ) -> Result<Vec<DomainOwnershipResult>, StoreError> {
        let rows = sqlx::query("SELECT * FROM domain_results WHERE case_id = ? ORDER BY domain")
            .bind(case_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(result_from_row).collect()
    }
}
