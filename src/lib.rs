//! domain_custody library: domain-ownership verification for due diligence
//!
//! For each domain in a batch this library determines the controlling party
//! through an escalating cascade of lookup sources (RDAP registries first,
//! public WHOIS mirrors second), and when registry data is absent or
//! privacy-redacted it obtains proof of present control: a unique token the
//! claimed owner must publish in a DNS TXT record, confirmed independently
//! against public DNS by a background poll worker.
//!
//! # Example
//!
//! ```no_run
//! use domain_custody::{run_pipeline, Config};
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     file: std::path::PathBuf::from("domains.txt"),
//!     ..Default::default()
//! };
//!
//! let report = run_pipeline(config, CancellationToken::new()).await?;
//! println!(
//!     "{} domains: {} resolved, {} unresolved, {} pending TXT",
//!     report.total_domains,
//!     report.resolved_total(),
//!     report.unresolved.len(),
//!     report.ownership.pending_txt
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your
//! application or ensure you're calling library functions within an async
//! context.

#![warn(missing_docs)]

pub mod config;
pub mod error_handling;
pub mod extract;
pub mod initialization;
pub mod lookup;
pub mod models;
pub mod ownership;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod verify;
pub mod worker;

// Re-export public API
pub use config::{Config, LogFormat, LogLevel};
pub use report::RunReport;
pub use run::run_pipeline;
pub use storage::{init_db_pool_with_path, init_schema, ResultStore, TaskStore};
pub use verify::TxtVerificationEngine;
pub use worker::{HickoryTxtChecker, PollWorker};

// Internal run module (contains the main pipeline orchestration)
mod run {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::{Context, Result};
    use chrono::Utc;
    use log::{info, warn};
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio_util::sync::CancellationToken;

    use crate::config::Config;
    use crate::initialization::init_client;
    use crate::lookup::{LookupSource, RegistryLookup, ScrapeLookup};
    use crate::models::{DomainRecord, OwnershipStatus};
    use crate::ownership::assess;
    use crate::pipeline::{RunArtifacts, StageController};
    use crate::report::RunReport;
    use crate::storage::{
        init_db_pool_with_path, init_schema, insert_run_metadata, update_run_stats, ResultStore,
        RunMetadata, RunStats, TaskStore,
    };
    use crate::verify::TxtVerificationEngine;
    use crate::worker::{HickoryTxtChecker, PollWorker};

    /// Reads the domain list: one domain per line, `#` comments and blank
    /// lines skipped, duplicates dropped keeping first occurrence.
    async fn read_domains(path: &std::path::Path) -> Result<Vec<String>> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        let mut lines = BufReader::new(file).lines();

        let mut seen = std::collections::HashSet::new();
        let mut domains = Vec::new();
        while let Some(line) = lines.next_line().await? {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let domain = trimmed.to_lowercase();
            if seen.insert(domain.clone()) {
                domains.push(domain);
            }
        }
        Ok(domains)
    }

    /// Runs the full resolution pipeline over the configured domain list.
    ///
    /// Resolves every domain through the staged sources, assesses ownership,
    /// mints TXT verification tasks for incomplete or privacy-redacted
    /// records, and persists everything to the configured SQLite store. With
    /// `verify_inline` the case's tasks are drained against public DNS before
    /// returning.
    ///
    /// Cancellation via `cancel` yields a partial but fully-accounted report.
    ///
    /// # Errors
    ///
    /// Returns an error if the input file cannot be read, the store cannot be
    /// initialized, or run accounting cannot be persisted. Per-domain lookup
    /// faults never fail the run.
    pub async fn run_pipeline(config: Config, cancel: CancellationToken) -> Result<RunReport> {
        let domains = read_domains(&config.file).await?;
        info!("Total domains in file: {}", domains.len());

        let start_time_epoch = Utc::now().timestamp_millis();
        let run_id = config
            .case_id
            .clone()
            .unwrap_or_else(|| format!("run_{start_time_epoch}"));
        info!("Starting run: {run_id}");

        let pool = init_db_pool_with_path(&config.db_path)
            .await
            .context("Failed to initialize database pool")?;
        init_schema(&pool)
            .await
            .context("Failed to initialize database schema")?;

        insert_run_metadata(
            &pool,
            &RunMetadata {
                run_id: &run_id,
                start_time_ms: start_time_epoch,
                version: env!("CARGO_PKG_VERSION"),
                total_domains: domains.len() as i32,
            },
        )
        .await
        .context("Failed to insert run metadata")?;

        let artifacts = match RunArtifacts::create(&config.data_dir, &run_id) {
            Ok(artifacts) => Some(artifacts),
            // Artifacts are audit aids; a read-only data dir does not stop the run
            Err(e) => {
                warn!("Could not create artifact directories: {e}");
                None
            }
        };

        let client = init_client(config.timeout_seconds)
            .context("Failed to initialize HTTP client")?;
        let sources: Vec<Arc<dyn LookupSource>> = vec![
            Arc::new(RegistryLookup::new(
                client.clone(),
                config.whois_api_key.clone(),
            )),
            Arc::new(ScrapeLookup::new(
                client,
                None,
                artifacts.as_ref().map(|a| a.evidence.clone()),
            )),
        ];

        let start_time = std::time::Instant::now();
        let controller = StageController::new(sources, artifacts.clone(), cancel.child_token());
        let outcome = controller.resolve(&domains).await;

        let tasks = TaskStore::new(pool.clone());
        let results = ResultStore::new(pool.clone());
        let engine = TxtVerificationEngine::new(tasks);

        let mut report = RunReport::new(&run_id, domains.len(), &outcome.resolved);
        report.cancelled = outcome.cancelled;

        for record in &outcome.resolved {
            let assessment = assess(&record.fields);
            let lookup_raw = serde_json::to_string(record).ok();
            match assessment.status {
                OwnershipStatus::Ok => {
                    results
                        .upsert(
                            &run_id,
                            &record.domain,
                            OwnershipStatus::Ok,
                            &assessment.reason,
                            None,
                            lookup_raw.as_deref(),
                        )
                        .await
                        .context("Failed to persist ownership result")?;
                }
                _ => {
                    let (task_id, _token) = engine
                        .create_task(&record.domain, &run_id, config.max_attempts)
                        .await
                        .context("Failed to create TXT verification task")?;
                    results
                        .upsert(
                            &run_id,
                            &record.domain,
                            OwnershipStatus::PendingTxt,
                            &assessment.reason,
                            Some(&task_id),
                            lookup_raw.as_deref(),
                        )
                        .await
                        .context("Failed to persist ownership result")?;
                    if let Some(text) = engine.instructions(&task_id).await? {
                        info!("{text}");
                    }
                }
            }
            report.ownership.record(assessment.status);
        }

        for domain in &outcome.unresolved {
            let (task_id, _token) = engine
                .create_task(domain, &run_id, config.max_attempts)
                .await
                .context("Failed to create TXT verification task")?;
            results
                .upsert(
                    &run_id,
                    domain,
                    OwnershipStatus::PendingTxt,
                    "No stage resolved this domain. TXT verification requested.",
                    Some(&task_id),
                    None,
                )
                .await
                .context("Failed to persist ownership result")?;
            report.ownership.record(OwnershipStatus::PendingTxt);
        }
        report.unresolved = outcome.unresolved;

        write_resolved_records(artifacts.as_ref(), &outcome.resolved);

        if config.verify_inline && !cancel.is_cancelled() {
            info!("Draining TXT verification tasks of case {run_id} inline");
            let worker = PollWorker::new(
                engine.clone(),
                results.clone(),
                Arc::new(HickoryTxtChecker::new()),
                Duration::from_secs(config.poll_interval_secs),
                Duration::from_secs(config.initial_wait_secs),
            );
            worker
                .drain_case(&run_id, cancel.child_token())
                .await
                .context("Inline TXT verification failed")?;

            // The drain moved tasks to terminal states; recount from the store
            let mut ownership = crate::report::OwnershipCounts::default();
            for result in results.list_by_case(&run_id).await? {
                ownership.record(result.status);
            }
            report.ownership = ownership;
        }

        report.elapsed_seconds = start_time.elapsed().as_secs();

        update_run_stats(
            &pool,
            &RunStats {
                run_id: &run_id,
                resolved: report.resolved_total() as i32,
                unresolved: report.unresolved.len() as i32,
                pending_txt: report.ownership.pending_txt as i32,
                elapsed_seconds: start_time.elapsed().as_secs_f64(),
            },
        )
        .await
        .context("Failed to update run statistics")?;

        if let Err(e) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&pool)
            .await
        {
            warn!("Failed to checkpoint WAL file (this is non-critical): {e}");
        }

        if let Some(artifacts) = &artifacts {
            report.write_artifacts(&artifacts.results);
        }
        info!("\n{}", report.render_text());

        Ok(report)
    }

    /// Best-effort dump of all resolved records into the results area.
    fn write_resolved_records(artifacts: Option<&RunArtifacts>, resolved: &[DomainRecord]) {
        let Some(artifacts) = artifacts else {
            return;
        };
        let path = artifacts.results.join("resolved_records.json");
        let write = serde_json::to_vec_pretty(resolved)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(&path, bytes));
        if let Err(e) = write {
            warn!("Could not write {}: {e}", path.display());
        }
    }
}
