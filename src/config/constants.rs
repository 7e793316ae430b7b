//! Configuration constants.
//!
//! Central location for timeouts, delays, and protocol constants used
//! throughout the crate.

use std::time::Duration;

/// Default SQLite database path for tasks and ownership results.
pub const DB_PATH: &str = "./domain_custody.db";

/// Default base directory for per-run artifacts (snapshots, evidence, reports).
pub const DATA_DIR: &str = "./data";

/// Fixed prefix for verification tokens. The suffix is 16 hex chars (64 bits)
/// from a cryptographically secure source.
pub const TOKEN_PREFIX: &str = "momen-verify-";

/// Challenge record name. Fixed to the zone apex in the current design.
pub const TXT_RECORD_NAME: &str = "@";

/// Flat inter-request delay between registry lookups against the same source.
pub const REGISTRY_LOOKUP_DELAY: Duration = Duration::from_secs(2);

/// Flat inter-request delay between scrape requests. Scrape mirrors are
/// stricter about rate limits than RDAP endpoints.
pub const SCRAPE_LOOKUP_DELAY: Duration = Duration::from_secs(3);

/// Per-request timeout for registry and scrape HTTP calls.
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Timeout for a single TXT query during verification polling.
pub const DNS_TIMEOUT_SECS: u64 = 5;

/// Default maximum number of verification poll attempts per task.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 60;

/// Default interval between verification poll attempts.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default grace period before the first DNS check of a task. Owners need
/// time to edit DNS, and fresh records need time to propagate.
pub const DEFAULT_INITIAL_WAIT_SECS: u64 = 300;

/// User-Agent sent on registry and scrape requests.
pub const USER_AGENT: &str = concat!("domain_custody/", env!("CARGO_PKG_VERSION"));
