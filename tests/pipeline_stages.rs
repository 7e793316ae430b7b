// Stage controller over stub lookup sources: handoff between stages,
// monotonic resolution, and exact accounting.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use domain_custody::lookup::{LookupSource, SourceHit};
use domain_custody::models::LookupFields;
use domain_custody::pipeline::{RunArtifacts, StageController};
use domain_custody::report::RunReport;

/// Source that resolves the listed domains and fails every other one.
/// Remembers which domains it was asked about.
struct StubSource {
    id: &'static str,
    resolves: HashSet<String>,
    seen: Mutex<Vec<String>>,
}

impl StubSource {
    fn new(id: &'static str, resolves: &[&str]) -> Self {
        Self {
            id,
            resolves: resolves.iter().map(|d| d.to_string()).collect(),
            seen: Mutex::new(Vec::new()),
        }
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LookupSource for StubSource {
    fn id(&self) -> &'static str {
        self.id
    }

    fn delay(&self) -> Duration {
        Duration::ZERO
    }

    async fn lookup(&self, domain: &str) -> anyhow::Result<SourceHit> {
        self.seen.lock().unwrap().push(domain.to_string());
        if self.resolves.contains(domain) {
            Ok(SourceHit {
                fields: LookupFields {
                    registrar: Some("Example Registrar Ltd.".to_string()),
                    ..Default::default()
                },
                source_url: format!("https://{}.invalid/{domain}", self.id),
            })
        } else {
            anyhow::bail!("unavailable")
        }
    }
}

fn domains(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("domain{i}.example")).collect()
}

#[tokio::test]
async fn test_all_registry_failures_proceed_to_scrape_stage() {
    let batch = domains(75);
    let registry = std::sync::Arc::new(StubSource::new("registry", &[]));
    let all: Vec<&str> = batch.iter().map(String::as_str).collect();
    let scrape = std::sync::Arc::new(StubSource::new("scrape", &all));

    let controller = StageController::new(
        vec![registry.clone(), scrape.clone()],
        None,
        CancellationToken::new(),
    );
    let outcome = controller.resolve(&batch).await;

    assert_eq!(registry.seen().len(), 75);
    assert_eq!(scrape.seen().len(), 75);
    assert_eq!(outcome.resolved.len(), 75);
    assert!(outcome.unresolved.is_empty());
    assert!(outcome.resolved.iter().all(|r| r.resolving_stage == 2));

    // The accounting's resolved count equals exactly what the stages resolved
    let report = RunReport::new("run_test", batch.len(), &outcome.resolved);
    assert_eq!(report.resolved_total(), 75);
    assert_eq!(report.resolved_by_source["scrape"], 75);
    assert!(report.resolved_by_source.get("registry").is_none());
}

#[tokio::test]
async fn test_resolution_is_monotonic_across_stages() {
    let batch = domains(4);
    let registry = std::sync::Arc::new(StubSource::new(
        "registry",
        &["domain0.example", "domain2.example"],
    ));
    let scrape = std::sync::Arc::new(StubSource::new("scrape", &["domain1.example"]));

    let controller = StageController::new(
        vec![registry.clone(), scrape.clone()],
        None,
        CancellationToken::new(),
    );
    let outcome = controller.resolve(&batch).await;

    // Stage 2 only ever sees stage 1's failures
    assert_eq!(scrape.seen(), vec!["domain1.example", "domain3.example"]);

    assert_eq!(outcome.resolved.len(), 3);
    assert_eq!(outcome.unresolved, vec!["domain3.example"]);

    let stage_of = |domain: &str| {
        outcome
            .resolved
            .iter()
            .find(|r| r.domain == domain)
            .map(|r| r.resolving_stage)
    };
    assert_eq!(stage_of("domain0.example"), Some(1));
    assert_eq!(stage_of("domain2.example"), Some(1));
    assert_eq!(stage_of("domain1.example"), Some(2));
}

#[tokio::test]
async fn test_stage_order_follows_input_order() {
    let batch = domains(5);
    let registry = std::sync::Arc::new(StubSource::new("registry", &[]));
    let controller =
        StageController::new(vec![registry.clone()], None, CancellationToken::new());
    let outcome = controller.resolve(&batch).await;

    assert_eq!(registry.seen(), batch);
    assert_eq!(outcome.unresolved, batch);
}

#[tokio::test]
async fn test_exhausting_all_stages_marks_unresolved() {
    let batch = domains(2);
    let controller = StageController::new(
        vec![
            std::sync::Arc::new(StubSource::new("registry", &[])),
            std::sync::Arc::new(StubSource::new("scrape", &[])),
        ],
        None,
        CancellationToken::new(),
    );
    let outcome = controller.resolve(&batch).await;

    assert!(outcome.resolved.is_empty());
    assert_eq!(outcome.unresolved, batch);
    assert!(!outcome.cancelled);
}

#[tokio::test]
async fn test_stage_snapshots_and_report_artifacts_are_written() {
    let data_dir = tempfile::tempdir().unwrap();
    let artifacts = RunArtifacts::create(data_dir.path(), "run_1700000000000").unwrap();

    // The run id is the directory name as-is, no extra prefix
    assert!(data_dir.path().join("run_1700000000000").is_dir());
    assert!(!data_dir.path().join("run_run_1700000000000").exists());

    let batch = domains(2);
    let registry = std::sync::Arc::new(StubSource::new("registry", &["domain0.example"]));
    let controller = StageController::new(
        vec![registry],
        Some(artifacts.clone()),
        CancellationToken::new(),
    );
    let outcome = controller.resolve(&batch).await;

    let snapshot_path = artifacts
        .intermediate
        .join("stage1_registry_results.json");
    let snapshot: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&snapshot_path).unwrap()).unwrap();
    assert_eq!(snapshot["stage"], 1);
    assert_eq!(snapshot["resolved"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["failed"], serde_json::json!(["domain1.example"]));

    let mut report = RunReport::new("run_1700000000000", batch.len(), &outcome.resolved);
    report.unresolved = outcome.unresolved;
    report.write_artifacts(&artifacts.results);

    let text = std::fs::read_to_string(artifacts.results.join("FINAL_REPORT.txt")).unwrap();
    assert!(text.contains("via registry: 1"));
    let json: serde_json::Value = serde_json::from_slice(
        &std::fs::read(artifacts.results.join("FINAL_REPORT.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(json["total_domains"], 2);
    assert_eq!(json["unresolved"], serde_json::json!(["domain1.example"]));
}

#[tokio::test]
async fn test_cancellation_yields_full_accounting() {
    let batch = domains(3);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let registry = std::sync::Arc::new(StubSource::new(
        "registry",
        &["domain0.example", "domain1.example", "domain2.example"],
    ));
    let controller = StageController::new(vec![registry.clone()], None, cancel);
    let outcome = controller.resolve(&batch).await;

    assert!(outcome.cancelled);
    assert!(registry.seen().is_empty());
    // Every domain is accounted for even though nothing ran
    assert_eq!(outcome.resolved.len() + outcome.unresolved.len(), 3);
}
