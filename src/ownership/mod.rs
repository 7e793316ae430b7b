//! Ownership assessment.
//!
//! Pure policy: decides whether a resolved (possibly partial) record already
//! proves who controls the domain, or whether active TXT verification is
//! needed. Minting the verification task is the pipeline's job, not this
//! module's; `assess` has no side effects.

use crate::models::{LookupFields, OwnershipStatus};

/// Strings that mark a registrant value as a privacy service rather than an
/// actual owner. Matched case-insensitively as substrings.
pub const PRIVACY_KEYWORDS: &[&str] = &[
    "REDACTED FOR PRIVACY",
    "Contact Privacy",
    "WhoisGuard",
    "Privacy Protect",
    "REDACTED",
    "Privacy Service",
    "Domains By Proxy",
    "Private Registration",
    "Protected",
];

/// Outcome of assessing a resolved record.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    /// `Ok` when the registrant is usable as-is, `PendingTxt` otherwise.
    pub status: OwnershipStatus,
    /// Human-readable justification, citing the registrant when present.
    pub reason: String,
}

fn is_privacy_masked(value: &str) -> bool {
    let upper = value.to_uppercase();
    PRIVACY_KEYWORDS
        .iter()
        .any(|keyword| upper.contains(&keyword.to_uppercase()))
}

/// Returns the registrant value that proves ownership, if one exists.
///
/// Ownership is complete iff a non-empty registrant organization or personal
/// name exists AND it does not contain any privacy-service keyword. The
/// organization is preferred; the personal name is the fallback.
fn usable_registrant(fields: &LookupFields) -> Option<&str> {
    for candidate in [&fields.registrant_org, &fields.registrant_name] {
        if let Some(value) = candidate.as_deref() {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if is_privacy_masked(value) {
                return None;
            }
            return Some(value);
        }
    }
    None
}

/// Maps a resolved record to OK or PENDING_TXT.
pub fn assess(fields: &LookupFields) -> Assessment {
    match usable_registrant(fields) {
        Some(registrant) => Assessment {
            status: OwnershipStatus::Ok,
            reason: format!("Registrant information available: {registrant}"),
        },
        None => Assessment {
            status: OwnershipStatus::PendingTxt,
            reason: "Ownership information incomplete or privacy-protected. \
                     TXT verification requested."
                .to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_org(org: &str) -> LookupFields {
        LookupFields {
            registrant_org: Some(org.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_clear_registrant_is_ok() {
        let assessment = assess(&with_org("Example Registrar Ltd."));
        assert_eq!(assessment.status, OwnershipStatus::Ok);
        assert!(assessment.reason.contains("Example Registrar Ltd."));
    }

    #[test]
    fn test_privacy_masked_org_needs_txt() {
        let assessment = assess(&with_org("REDACTED FOR PRIVACY"));
        assert_eq!(assessment.status, OwnershipStatus::PendingTxt);
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_substring() {
        assert_eq!(
            assess(&with_org("Data shielded by whoisguard, inc")).status,
            OwnershipStatus::PendingTxt
        );
    }

    #[test]
    fn test_registrant_name_is_fallback() {
        let fields = LookupFields {
            registrant_name: Some("J. Jansen".to_string()),
            ..Default::default()
        };
        let assessment = assess(&fields);
        assert_eq!(assessment.status, OwnershipStatus::Ok);
        assert!(assessment.reason.contains("J. Jansen"));
    }

    #[test]
    fn test_no_registrant_needs_txt() {
        let fields = LookupFields {
            registrar: Some("Example Registrar Ltd.".to_string()),
            ..Default::default()
        };
        // A registrar alone resolves the record but does not prove ownership
        assert_eq!(assess(&fields).status, OwnershipStatus::PendingTxt);
    }

    #[test]
    fn test_whitespace_registrant_is_not_usable() {
        assert_eq!(assess(&with_org("   ")).status, OwnershipStatus::PendingTxt);
    }
}
