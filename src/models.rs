//! Core data model: lookup fields, resolved domain records, verification
//! tasks, and ownership results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured registration facts returned by every lookup source and by the
/// text extractors. All sources merge into this one shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupFields {
    /// Registrar name
    pub registrar: Option<String>,
    /// Registry operator (e.g. "Verisign", "SIDN")
    pub registry: Option<String>,
    /// Registrant organization
    pub registrant_org: Option<String>,
    /// Registrant personal name, as published
    pub registrant_name: Option<String>,
    /// Domain creation date
    pub creation_date: Option<DateTime<Utc>>,
    /// Domain expiry date
    pub expiry_date: Option<DateTime<Utc>>,
    /// Nameservers, in the order the source listed them
    pub nameservers: Vec<String>,
    /// Raw status strings (e.g. "clientTransferProhibited")
    pub raw_status: Vec<String>,
}

impl LookupFields {
    /// True when the record carries no signal at all.
    pub fn is_empty(&self) -> bool {
        self.registrar.is_none()
            && self.registry.is_none()
            && self.registrant_org.is_none()
            && self.registrant_name.is_none()
            && self.creation_date.is_none()
            && self.expiry_date.is_none()
            && self.nameservers.is_empty()
            && self.raw_status.is_empty()
    }
}

/// A domain resolved by some stage of the pipeline, with provenance.
///
/// Lifecycle: pending -> resolved-by-stage-N. Later stages never overwrite an
/// already-resolved record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainRecord {
    /// The domain, unique within a run
    pub domain: String,
    /// Resolved registration facts (possibly partial)
    pub fields: LookupFields,
    /// Identifier of the source that resolved this domain
    pub source_id: String,
    /// URL the facts were obtained from
    pub source_url: String,
    /// 1-based index of the resolving stage
    pub resolving_stage: usize,
    /// When the record was resolved
    pub resolved_at: DateTime<Utc>,
}

/// State of a TXT verification task. `Verified` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Token issued, waiting for the owner to publish it
    Waiting,
    /// Token observed in public DNS (terminal)
    Verified,
    /// Max attempts exhausted without a match (terminal)
    Failed,
}

impl TaskState {
    /// Stable string form used in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Waiting => "WAITING",
            TaskState::Verified => "VERIFIED",
            TaskState::Failed => "FAILED",
        }
    }

    /// Parses the stored string form.
    pub fn parse(s: &str) -> Option<TaskState> {
        match s {
            "WAITING" => Some(TaskState::Waiting),
            "VERIFIED" => Some(TaskState::Verified),
            "FAILED" => Some(TaskState::Failed),
            _ => None,
        }
    }

    /// True for states that admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Verified | TaskState::Failed)
    }
}

/// A persisted TXT ownership-verification task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxtTask {
    /// Task id (UUID v4)
    pub id: String,
    /// Case/run this task belongs to
    pub case_id: String,
    /// Domain under verification
    pub domain: String,
    /// Challenge record name (zone apex, "@")
    pub txt_name: String,
    /// The token the owner must publish
    pub expected_token: String,
    /// Current state
    pub state: TaskState,
    /// Poll attempts made so far; monotonically increasing
    pub attempts: u32,
    /// Attempt bound; reaching it transitions the task to FAILED
    pub max_attempts: u32,
    /// Last time the worker checked DNS for this task
    pub last_checked_at: Option<DateTime<Utc>>,
    /// When the token was observed, for VERIFIED tasks
    pub verified_at: Option<DateTime<Utc>>,
    /// Categorized reason of the last failed attempt
    pub fail_reason: Option<String>,
    /// Raw DNS response of the last check, kept as evidence
    pub dns_raw_result: Option<String>,
    /// Creation time; the worker drains oldest-created-first
    pub created_at: DateTime<Utc>,
    /// Server-stamped last update time
    pub updated_at: DateTime<Utc>,
}

/// Ownership status of a (case, domain) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnershipStatus {
    /// Registrant information is present and not privacy-masked
    Ok,
    /// A TXT verification task was minted and is still open
    PendingTxt,
    /// Control proven via the published token
    VerifiedByTxt,
    /// Ownership could not be confirmed
    Unknown,
}

impl OwnershipStatus {
    /// Stable string form used in the store.
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnershipStatus::Ok => "OK",
            OwnershipStatus::PendingTxt => "PENDING_TXT",
            OwnershipStatus::VerifiedByTxt => "VERIFIED_BY_TXT",
            OwnershipStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parses the stored string form.
    pub fn parse(s: &str) -> Option<OwnershipStatus> {
        match s {
            "OK" => Some(OwnershipStatus::Ok),
            "PENDING_TXT" => Some(OwnershipStatus::PendingTxt),
            "VERIFIED_BY_TXT" => Some(OwnershipStatus::VerifiedByTxt),
            "UNKNOWN" => Some(OwnershipStatus::Unknown),
            _ => None,
        }
    }
}

/// Per-(case, domain) ownership conclusion. References a task; does not own it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainOwnershipResult {
    /// Case/run id
    pub case_id: String,
    /// Domain
    pub domain: String,
    /// Current conclusion
    pub status: OwnershipStatus,
    /// Human-readable justification
    pub reason: String,
    /// The verification task backing a PENDING_TXT/VERIFIED_BY_TXT status
    pub txt_task_id: Option<String>,
    /// Server-stamped last update time
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_state_round_trip() {
        for state in [TaskState::Waiting, TaskState::Verified, TaskState::Failed] {
            assert_eq!(TaskState::parse(state.as_str()), Some(state));
        }
        assert_eq!(TaskState::parse("RUNNING"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!TaskState::Waiting.is_terminal());
        assert!(TaskState::Verified.is_terminal());
        assert!(TaskState::Failed.is_terminal());
    }

    #[test]
    fn test_ownership_status_round_trip() {
        for status in [
            OwnershipStatus::Ok,
            OwnershipStatus::PendingTxt,
            OwnershipStatus::VerifiedByTxt,
            OwnershipStatus::Unknown,
        ] {
            assert_eq!(OwnershipStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_lookup_fields_is_empty() {
        assert!(LookupFields::default().is_empty());
        let fields = LookupFields {
            registrar: Some("Example Registrar Ltd.".into()),
            ..Default::default()
        };
        assert!(!fields.is_empty());
    }
}
