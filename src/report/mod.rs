//! Run accounting and report artifacts.
//!
//! A run always produces a full accounting: counts per resolution source,
//! unresolved domains, and ownership-status counts. Never a single pass/fail
//! flag.

use std::collections::BTreeMap;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use crate::models::{DomainRecord, OwnershipStatus};

/// Ownership-status counts over one run.
#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct OwnershipCounts {
    /// Registrant information present and usable
    pub ok: usize,
    /// TXT verification task minted and still open
    pub pending_txt: usize,
    /// Control proven via the published token
    pub verified_by_txt: usize,
    /// Not confirmed
    pub unknown: usize,
}

impl OwnershipCounts {
    /// Increments the counter matching `status`.
    pub fn record(&mut self, status: OwnershipStatus) {
        match status {
            OwnershipStatus::Ok => self.ok += 1,
            OwnershipStatus::PendingTxt => self.pending_txt += 1,
            OwnershipStatus::VerifiedByTxt => self.verified_by_txt += 1,
            OwnershipStatus::Unknown => self.unknown += 1,
        }
    }
}

/// Full accounting of one pipeline run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Run / case id
    pub run_id: String,
    /// Domains seen, after dedup
    pub total_domains: usize,
    /// Resolved count per source id, e.g. {"registry": 70, "scrape": 3}
    pub resolved_by_source: BTreeMap<String, usize>,
    /// Domains no stage could resolve
    pub unresolved: Vec<String>,
    /// Ownership conclusions at the end of the run
    pub ownership: OwnershipCounts,
    /// True when the run was cancelled before completion
    pub cancelled: bool,
    /// Wall-clock duration
    pub elapsed_seconds: u64,
}

impl RunReport {
    /// Builds the resolution side of the report from stage output.
    pub fn new(run_id: &str, total_domains: usize, resolved: &[DomainRecord]) -> Self {
        let mut resolved_by_source = BTreeMap::new();
        for record in resolved {
            *resolved_by_source
                .entry(record.source_id.clone())
                .or_insert(0) += 1;
        }
        Self {
            run_id: run_id.to_string(),
            total_domains,
            resolved_by_source,
            unresolved: Vec::new(),
            ownership: OwnershipCounts::default(),
            cancelled: false,
            elapsed_seconds: 0,
        }
    }

    /// Total domains resolved by any stage.
    pub fn resolved_total(&self) -> usize {
        self.resolved_by_source.values().sum()
    }

    /// Human-readable rendering, also written as `FINAL_REPORT.txt`.
    pub fn render_text(&self) -> String {
        let mut lines = vec![
            format!("Run {}", self.run_id),
            format!("Domains:    {}", self.total_domains),
            format!("Resolved:   {}", self.resolved_total()),
        ];
        for (source, count) in &self.resolved_by_source {
            lines.push(format!("  via {source}: {count}"));
        }
        lines.push(format!("Unresolved: {}", self.unresolved.len()));
        for domain in &self.unresolved {
            lines.push(format!("  {domain}"));
        }
        lines.push(format!(
            "Ownership:  {} OK, {} PENDING_TXT, {} VERIFIED_BY_TXT, {} UNKNOWN",
            self.ownership.ok,
            self.ownership.pending_txt,
            self.ownership.verified_by_txt,
            self.ownership.unknown
        ));
        if self.cancelled {
            lines.push("Run was cancelled before completion.".to_string());
        }
        lines.push(format!("Elapsed:    {}s", self.elapsed_seconds));
        lines.join("\n")
    }

    /// Writes `FINAL_REPORT.txt` and `FINAL_REPORT.json` into the results
    /// area. Best effort; artifacts are audit aids, not correctness.
    pub fn write_artifacts(&self, results_dir: &Path) {
        let text_path = results_dir.join("FINAL_REPORT.txt");
        if let Err(e) = std::fs::write(&text_path, self.render_text()) {
            warn!("Could not write {}: {e}", text_path.display());
        }

        let json_path = results_dir.join("FINAL_REPORT.json");
        let write = serde_json::to_vec_pretty(self)
            .map_err(std::io::Error::other)
            .and_then(|bytes| std::fs::write(&json_path, bytes));
        match write {
            Ok(()) => info!("Report artifacts written to {}", results_dir.display()),
            Err(e) => warn!("Could not write {}: {e}", json_path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LookupFields;
    use chrono::Utc;

    fn record(domain: &str, source_id: &str) -> DomainRecord {
        DomainRecord {
            domain: domain.to_string(),
            fields: LookupFields::default(),
            source_id: source_id.to_string(),
            source_url: format!("https://example.invalid/{domain}"),
            resolving_stage: 1,
            resolved_at: Utc::now(),
        }
    }

    #[test]
    fn test_counts_per_source_and_total() {
        let resolved = vec![
            record("a.com", "registry"),
            record("b.com", "registry"),
            record("c.com", "scrape"),
        ];
        let report = RunReport::new("run_1", 4, &resolved);
        assert_eq!(report.resolved_by_source["registry"], 2);
        assert_eq!(report.resolved_by_source["scrape"], 1);
        assert_eq!(report.resolved_total(), 3);
    }

    #[test]
    fn test_render_includes_every_bucket() {
        let mut report = RunReport::new("run_1", 2, &[record("a.com", "registry")]);
        report.unresolved = vec!["b.com".to_string()];
        report.ownership.record(OwnershipStatus::Ok);
        report.ownership.record(OwnershipStatus::PendingTxt);

        let text = report.render_text();
        assert!(text.contains("via registry: 1"));
        assert!(text.contains("Unresolved: 1"));
        assert!(text.contains("1 OK, 1 PENDING_TXT"));
    }
}
