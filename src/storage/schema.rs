//! Idempotent schema setup.
//!
//! The store must self-initialize wherever it is opened first (pipeline,
//! worker, or status command), so the DDL is applied on every startup with
//! CREATE IF NOT EXISTS instead of a migrations directory.

use sqlx::SqlitePool;

use crate::error_handling::StoreError;

const DDL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS txt_verification_tasks (
        id TEXT PRIMARY KEY,
        case_id TEXT NOT NULL,
        domain TEXT NOT NULL,
        txt_name TEXT NOT NULL,
        expected_token TEXT NOT NULL,
        status TEXT NOT NULL,
        attempts INTEGER NOT NULL DEFAULT 0,
        max_attempts INTEGER NOT NULL DEFAULT 1,
        last_checked_at TEXT,
        verified_at TEXT,
        fail_reason TEXT,
        dns_raw_result TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_txt_status ON txt_verification_tasks(status)",
    "CREATE INDEX IF NOT EXISTS idx_txt_domain ON txt_verification_tasks(domain)",
    "CREATE INDEX IF NOT EXISTS idx_txt_case_id ON txt_verification_tasks(case_id)",
    "CREATE TABLE IF NOT EXISTS domain_results (
        case_id TEXT NOT NULL,
        domain TEXT NOT NULL,
        ownership_status TEXT NOT NULL,
        ownership_reason TEXT NOT NULL,
        txt_task_id TEXT,
        lookup_raw TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (case_id, domain)
    )",
    "CREATE INDEX IF NOT EXISTS idx_domain_txt_task_id ON domain_results(txt_task_id)",
    "CREATE TABLE IF NOT EXISTS runs (
        run_id TEXT PRIMARY KEY,
        version TEXT NOT NULL,
        start_time_ms INTEGER NOT NULL,
        end_time_ms INTEGER,
        total_domains INTEGER,
        resolved INTEGER,
        unresolved INTEGER,
        pending_txt INTEGER,
        elapsed_seconds REAL
    )",
];

/// Applies the schema. Safe to call on every startup.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    for statement in DDL {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
