//! Error type definitions.
//!
//! This module defines the error types used throughout the application, plus
//! the categorized per-attempt failure reasons recorded by the poll worker.

use log::SetLoggerError;
use reqwest::Error as ReqwestError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error initializing the HTTP client.
    #[error("HTTP client initialization error: {0}")]
    HttpClientError(#[from] ReqwestError),
}

/// Error types for the durable task/result store.
///
/// `Conflict` and `Corrupt` are fatal for the one affected task and must be
/// escalated by callers, never swallowed, so duplicate or lost updates stay
/// visible.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// A transition update matched zero rows for a task that was read as
    /// WAITING. Another writer got there first.
    #[error("Concurrent write conflict on task {task_id}")]
    Conflict {
        /// Id of the task whose transition was lost.
        task_id: String,
    },

    /// A persisted row could not be decoded back into its model.
    #[error("Corrupt store row: {0}")]
    Corrupt(String),
}

/// Categorized reasons a single verification poll attempt can fail.
///
/// Persisted verbatim into the task's `fail_reason` column so the last
/// observed condition survives restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum CheckFailure {
    /// The TXT query returned an empty answer section.
    NoAnswer,
    /// TXT records exist for the domain, but none contains the token.
    TokenNotFound,
    /// The TXT query itself timed out.
    Timeout,
    /// The resolver could not run the query at all.
    ResolverUnavailable,
}

impl CheckFailure {
    /// Stable string form used in the store and in status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckFailure::NoAnswer => "NO_ANSWER",
            CheckFailure::TokenNotFound => "TOKEN_NOT_FOUND",
            CheckFailure::Timeout => "TIMEOUT",
            CheckFailure::ResolverUnavailable => "RESOLVER_UNAVAILABLE",
        }
    }
}

impl std::fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_check_failure_as_str() {
        assert_eq!(CheckFailure::NoAnswer.as_str(), "NO_ANSWER");
        assert_eq!(CheckFailure::TokenNotFound.as_str(), "TOKEN_NOT_FOUND");
        assert_eq!(CheckFailure::Timeout.as_str(), "TIMEOUT");
        assert_eq!(
            CheckFailure::ResolverUnavailable.as_str(),
            "RESOLVER_UNAVAILABLE"
        );
    }

    #[test]
    fn test_all_check_failures_have_stable_strings() {
        // The string forms are persisted; every variant must have a non-empty,
        // SCREAMING_SNAKE representation.
        for reason in CheckFailure::iter() {
            let s = reason.as_str();
            assert!(!s.is_empty());
            assert_eq!(s, s.to_uppercase());
        }
    }

    #[test]
    fn test_store_conflict_display_names_task() {
        let err = StoreError::Conflict {
            task_id: "abc-123".into(),
        };
        assert!(err.to_string().contains("abc-123"));
    }
}
