//! Resolution pipeline: ordered lookup stages over a domain list.
//!
//! Each stage runs every still-unresolved domain through one lookup source,
//! strictly sequentially with the source's flat inter-request delay. A domain
//! leaves the pipeline as soon as a stage returns enough signal; failures are
//! handed to the next stage. Exhausting all stages marks the domain
//! unresolved, and the run still completes with a full accounting.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::lookup::LookupSource;
use crate::models::{DomainRecord, LookupFields};

/// Tolerance policy for noisy public WHOIS data: a record is resolved when
/// ANY of registrar, creation date, or nameservers is present. Partial
/// evidence is accepted deliberately.
pub fn resolved_enough(fields: &LookupFields) -> bool {
    fields.registrar.is_some() || fields.creation_date.is_some() || !fields.nameservers.is_empty()
}

/// Per-run artifact directories under `<data_dir>/<run_id>/`.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    /// Per-stage JSON snapshots
    pub intermediate: PathBuf,
    /// Raw scrape page text, DNS responses
    pub evidence: PathBuf,
    /// Final report artifacts
    pub results: PathBuf,
}

impl RunArtifacts {
    /// Creates the artifact tree for a run. Directories are created eagerly so
    /// later best-effort writes only have to deal with file errors.
    pub fn create(data_dir: &Path, run_id: &str) -> std::io::Result<Self> {
        let root = data_dir.join(run_id);
        let artifacts = Self {
            intermediate: root.join("intermediate"),
            evidence: root.join("evidence"),
            results: root.join("results"),
        };
        for dir in [
            &artifacts.intermediate,
            &artifacts.evidence,
            &artifacts.results,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(artifacts)
    }
}

/// Result of running all stages over a domain list.
#[derive(Debug, Default)]
pub struct StageOutcome {
    /// Resolved records, with provenance and resolving stage.
    pub resolved: Vec<DomainRecord>,
    /// Domains no stage could resolve, in input order.
    pub unresolved: Vec<String>,
    /// True when the run was cancelled before all stages finished. The counts
    /// above still account for every domain seen so far.
    pub cancelled: bool,
}

/// Snapshot of one stage, written to the intermediate area.
#[derive(Serialize)]
struct StageSnapshot<'a> {
    stage: usize,
    source_id: &'a str,
    resolved: &'a [DomainRecord],
    failed: &'a [String],
}

/// Runs lookup sources in priority order over a domain list.
pub struct StageController {
    sources: Vec<Arc<dyn LookupSource>>,
    artifacts: Option<RunArtifacts>,
    cancel: CancellationToken,
}

impl StageController {
    /// Builds a controller over ordered sources. Snapshots are written when an
    /// artifact tree is given.
    pub fn new(
        sources: Vec<Arc<dyn LookupSource>>,
        artifacts: Option<RunArtifacts>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sources,
            artifacts,
            cancel,
        }
    }

    /// Resolves `domains` through every stage in order.
    ///
    /// Deterministic in input-list order within each stage. A resolved domain
    /// is never re-attempted at a later stage; a domain's fault degrades only
    /// that domain. Cancellation is honored between domains and yields a
    /// partial but fully-accounted outcome.
    pub async fn resolve(&self, domains: &[String]) -> StageOutcome {
        let mut outcome = StageOutcome::default();
        let mut pending: Vec<String> = domains.to_vec();

        for (index, source) in self.sources.iter().enumerate() {
            let stage = index + 1;
            if pending.is_empty() {
                break;
            }
            info!(
                "Stage {stage} ({}): {} domain(s) to resolve",
                source.id(),
                pending.len()
            );

            let mut stage_resolved: Vec<DomainRecord> = Vec::new();
            let mut stage_failed: Vec<String> = Vec::new();
            let mut first = true;

            for domain in &pending {
                if self.cancel.is_cancelled() {
                    info!("Run cancelled during stage {stage}");
                    outcome.cancelled = true;
                    stage_failed.extend(
                        pending
                            .iter()
                            .skip(stage_resolved.len() + stage_failed.len())
                            .cloned(),
                    );
                    break;
                }
                if !first {
                    tokio::time::sleep(source.delay()).await;
                }
                first = false;

                match source.lookup(domain).await {
                    Ok(hit) if resolved_enough(&hit.fields) => {
                        info!("Resolved {domain} at stage {stage} via {}", source.id());
                        stage_resolved.push(DomainRecord {
                            domain: domain.clone(),
                            fields: hit.fields,
                            source_id: source.id().to_string(),
                            source_url: hit.source_url,
                            resolving_stage: stage,
                            resolved_at: Utc::now(),
                        });
                    }
                    Ok(_) => {
                        info!("Stage {stage} returned too little signal for {domain}");
                        stage_failed.push(domain.clone());
                    }
                    Err(e) => {
                        warn!("Stage {stage} failed for {domain}: {e:#}");
                        stage_failed.push(domain.clone());
                    }
                }
            }

            self.write_snapshot(stage, source.id(), &stage_resolved, &stage_failed);
            info!(
                "Stage {stage} done: {} resolved, {} passed on",
                stage_resolved.len(),
                stage_failed.len()
            );

            outcome.resolved.extend(stage_resolved);
            pending = stage_failed;
            if outcome.cancelled {
                break;
            }
        }

        outcome.unresolved = pending;
        outcome
    }

    /// Best-effort JSON snapshot of one stage. Losing a snapshot never fails
    /// the run.
    fn write_snapshot(
        &self,
        stage: usize,
        source_id: &str,
        resolved: &[DomainRecord],
        failed: &[String],
    ) {
        let Some(artifacts) = &self.artifacts else {
            return;
        };
        let snapshot = StageSnapshot {
            stage,
            source_id,
            resolved,
            failed,
        };
        let path = artifacts
            .intermediate
            .join(format!("stage{stage}_{source_id}_results.json"));
        let write = serde_json::to_vec_pretty(&snapshot)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(&path, bytes));
        if let Err(e) = write {
            warn!("Could not write stage snapshot {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_resolved_enough_is_any_of_three() {
        assert!(!resolved_enough(&LookupFields::default()));
        assert!(resolved_enough(&LookupFields {
            registrar: Some("Example Registrar Ltd.".into()),
            ..Default::default()
        }));
        assert!(resolved_enough(&LookupFields {
            creation_date: Some(Utc.with_ymd_and_hms(2015, 6, 24, 0, 0, 0).unwrap()),
            ..Default::default()
        }));
        assert!(resolved_enough(&LookupFields {
            nameservers: vec!["ns1.example.net".into()],
            ..Default::default()
        }));
    }

    #[test]
    fn test_registrant_alone_is_not_resolved() {
        // A registrant without registrar, date, or nameservers reads like a
        // parsing artifact; keep escalating
        assert!(!resolved_enough(&LookupFields {
            registrant_org: Some("Jansen Holding B.V.".into()),
            ..Default::default()
        }));
    }
}
