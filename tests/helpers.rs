// Shared test helpers: in-memory database setup and scripted collaborators.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::SqlitePool;

use domain_custody::error_handling::CheckFailure;
use domain_custody::init_schema;
use domain_custody::worker::{CheckOutcome, TxtChecker};

/// Creates a test database pool with the schema applied.
/// Uses an in-memory database for fast test execution.
#[allow(dead_code)] // Used by other test files
pub async fn create_test_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create test database pool");
    init_schema(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

/// Checker that answers every query with the same outcome.
#[allow(dead_code)] // Used by other test files
pub struct FixedChecker {
    pub outcome: CheckOutcome,
}

#[async_trait]
impl TxtChecker for FixedChecker {
    async fn check(&self, _domain: &str, _expected_token: &str) -> CheckOutcome {
        self.outcome.clone()
    }
}

/// Checker with per-domain scripted outcomes; unknown domains get NO_ANSWER.
/// Counts queries per domain so tests can assert a task stopped being polled.
#[allow(dead_code)] // Used by other test files
pub struct ScriptedChecker {
    outcomes: HashMap<String, CheckOutcome>,
    calls: Mutex<HashMap<String, usize>>,
}

#[allow(dead_code)] // Used by other test files
impl ScriptedChecker {
    pub fn new(outcomes: HashMap<String, CheckOutcome>) -> Self {
        Self {
            outcomes,
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls_for(&self, domain: &str) -> usize {
        *self.calls.lock().unwrap().get(domain).unwrap_or(&0)
    }
}

#[async_trait]
impl TxtChecker for ScriptedChecker {
    async fn check(&self, domain: &str, _expected_token: &str) -> CheckOutcome {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(domain.to_string())
            .or_insert(0) += 1;
        self.outcomes
            .get(domain)
            .cloned()
            .unwrap_or(CheckOutcome::NoMatch {
                raw: None,
                reason: CheckFailure::NoAnswer,
            })
    }
}
