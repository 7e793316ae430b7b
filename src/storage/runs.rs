//! Run accounting: metadata recorded at start, statistics recorded at end.

use sqlx::SqlitePool;

use crate::error_handling::StoreError;

/// Metadata for a pipeline run, recorded at start.
pub struct RunMetadata<'a> {
    /// Run / case id
    pub run_id: &'a str,
    /// Run start, epoch milliseconds
    pub start_time_ms: i64,
    /// Crate version that produced the run
    pub version: &'a str,
    /// Domains in the batch, after dedup
    pub total_domains: i32,
}

/// Statistics for a completed pipeline run, recorded at end.
pub struct RunStats<'a> {
    /// Run / case id
    pub run_id: &'a str,
    /// Domains resolved by any stage
    pub resolved: i32,
    /// Domains no stage resolved
    pub unresolved: i32,
    /// Domains left awaiting TXT verification
    pub pending_txt: i32,
    /// Wall-clock duration
    pub elapsed_seconds: f64,
}

/// Inserts or updates run metadata in the runs table.
pub async fn insert_run_metadata(
    pool: &SqlitePool,
    meta: &RunMetadata<'_>,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT INTO runs (run_id, version, start_time_ms, total_domains)
         VALUES (?, ?, ?, ?)
         ON CONFLICT(run_id) DO UPDATE SET
             version = excluded.version,
             start_time_ms = excluded.start_time_ms,
             total_domains = excluded.total_domains",
    )
    .bind(meta.run_id)
    .bind(meta.version)
    .bind(meta.start_time_ms)
    .bind(meta.total_domains)
    .execute(pool)
    .await?;
    Ok(())
}

/// Updates run statistics when a run completes.
pub async fn update_run_stats(pool: &SqlitePool, stats: &RunStats<'_>) -> Result<(), StoreError> {
    let end_time_ms = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        "UPDATE runs
         SET end_time_ms = ?, resolved = ?, unresolved = ?, pending_txt = ?,
             elapsed_seconds = ?
         WHERE run_id = ?",
    )
    .bind(end_time_ms)
    .bind(stats.resolved)
    .bind(stats.unresolved)
    .bind(stats.pending_txt)
    .bind(stats.elapsed_seconds)
    .bind(stats.run_id)
    .execute(pool)
    .await?;
    Ok(())
}
