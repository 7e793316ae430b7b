//! Text extraction: turns raw lookup/scrape text into structured fields.
//!
//! The primary extractor is pluggable (the production deployment points it at
//! a hosted extraction service); [`RegexExtractor`] is the built-in secondary
//! that the pipeline falls back to when the primary returns an empty record.
//! Extraction never fails the pipeline: an empty [`LookupFields`] is the
//! worst outcome.

mod dates;
mod regex;

pub(crate) use dates::parse_date_string;
pub use regex::RegexExtractor;

use async_trait::async_trait;

use crate::models::LookupFields;

/// Converts free-form WHOIS/registrar page text into structured fields.
///
/// Implementations must not error: return `LookupFields::default()` when
/// nothing can be extracted.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Short identifier used in provenance and logs.
    fn id(&self) -> &'static str;

    /// Extracts registration facts from `raw_text` for `domain`.
    async fn extract(&self, raw_text: &str, domain: &str, source_url: &str) -> LookupFields;
}
