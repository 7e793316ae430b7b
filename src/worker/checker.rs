//! TXT record checking against a fixed public resolver.
//!
//! Queries go to Cloudflare (1.1.1.1) rather than whatever resolver the host
//! is configured with: answers must be consistent, auditable, and not subject
//! to local/ISP resolver hijacking.

use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::TokioAsyncResolver;
use log::debug;

use crate::config::DNS_TIMEOUT_SECS;
use crate::error_handling::CheckFailure;

/// Outcome of one TXT check for one task.
#[derive(Debug, Clone)]
pub enum CheckOutcome {
    /// The expected token was observed. `raw` is the full response, one
    /// quoted record per line, kept as evidence.
    Match {
        /// Raw response text.
        raw: String,
    },
    /// The token was not observed.
    NoMatch {
        /// Raw response text, when a response was received at all.
        raw: Option<String>,
        /// Categorized reason.
        reason: CheckFailure,
    },
}

/// One TXT check. Seam for the poll worker; tests inject stub responses.
#[async_trait]
pub trait TxtChecker: Send + Sync {
    /// Queries TXT records for `domain` and looks for `expected_token`.
    async fn check(&self, domain: &str, expected_token: &str) -> CheckOutcome;
}

/// True when `value`, after trimming and stripping TXT quoting, contains the
/// token as a substring. Substring rather than equality: owners routinely
/// publish the token alongside other verification strings in one record.
pub fn token_matches(value: &str, token: &str) -> bool {
    value.trim().trim_matches('"').contains(token)
}

/// Production checker: hickory resolver pinned to Cloudflare.
pub struct HickoryTxtChecker {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl HickoryTxtChecker {
    /// Builds the checker with the fixed public resolver and the standard
    /// query timeout.
    pub fn new() -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_secs(DNS_TIMEOUT_SECS);
        opts.attempts = 2;
        // Domains arrive fully qualified; never append search suffixes
        opts.ndots = 0;

        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::cloudflare(), opts),
            timeout: Duration::from_secs(DNS_TIMEOUT_SECS),
        }
    }
}

impl Default for HickoryTxtChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TxtChecker for HickoryTxtChecker {
    async fn check(&self, domain: &str, expected_token: &str) -> CheckOutcome {
        debug!("Checking TXT records of {domain} for {expected_token}");

        let lookup = match tokio::time::timeout(self.timeout, self.resolver.txt_lookup(domain))
            .await
        {
            Err(_) => {
                return CheckOutcome::NoMatch {
                    raw: None,
                    reason: CheckFailure::Timeout,
                }
            }
            Ok(Err(e)) => {
                let reason = match e.kind() {
                    ResolveErrorKind::NoRecordsFound { .. } => CheckFailure::NoAnswer,
                    ResolveErrorKind::Timeout => CheckFailure::Timeout,
                    _ => CheckFailure::ResolverUnavailable,
                };
                return CheckOutcome::NoMatch { raw: None, reason };
            }
            Ok(Ok(lookup)) => lookup,
        };

        // A record longer than 255 bytes arrives split into chunks; join them
        // back before matching.
        let values: Vec<String> = lookup
            .iter()
            .map(|txt| {
                txt.iter()
                    .map(|chunk| String::from_utf8_lossy(chunk.as_ref()))
                    .collect::<String>()
            })
            .collect();

        if values.is_empty() {
            return CheckOutcome::NoMatch {
                raw: Some(String::new()),
                reason: CheckFailure::NoAnswer,
            };
        }

        let raw = values
            .iter()
            .map(|v| format!("\"{v}\""))
            .collect::<Vec<_>>()
            .join("\n");

        if values.iter().any(|v| token_matches(v, expected_token)) {
            CheckOutcome::Match { raw }
        } else {
            CheckOutcome::NoMatch {
                raw: Some(raw),
                reason: CheckFailure::TokenNotFound,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_matches_plain_value() {
        assert!(token_matches(
            "momen-verify-abc123",
            "momen-verify-abc123"
        ));
    }

    #[test]
    fn test_token_matches_quoted_value() {
        // dig-style output quotes TXT values
        assert!(token_matches(
            "\"momen-verify-abc123\"",
            "momen-verify-abc123"
        ));
    }

    #[test]
    fn test_token_matches_as_substring() {
        assert!(token_matches(
            "v=spf1 -all momen-verify-abc123",
            "momen-verify-abc123"
        ));
    }

    #[test]
    fn test_token_rejects_other_records() {
        assert!(!token_matches(
            "\"google-site-verification=xyz\"",
            "momen-verify-abc123"
        ));
    }
}
