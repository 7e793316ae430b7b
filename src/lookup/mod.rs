//! Lookup sources: where registration facts come from.
//!
//! Each source is one stage of the resolution pipeline. A source either
//! returns a hit (structured fields plus the URL they came from) or fails for
//! that one domain; a failed domain is handed to the next stage, never
//! retried within the same stage.

mod registry;
mod scrape;

pub use registry::RegistryLookup;
pub use scrape::{ScrapeLookup, ScrapeStrategy, SidnStrategy, WhoIsStrategy};

use std::time::Duration;

use async_trait::async_trait;

use crate::models::LookupFields;

/// Result of a successful lookup: the fields plus their provenance.
#[derive(Debug, Clone)]
pub struct SourceHit {
    /// Extracted registration facts. May be partial; the pipeline decides
    /// whether they are enough.
    pub fields: LookupFields,
    /// URL the facts were obtained from.
    pub source_url: String,
}

/// One ordered lookup source in the pipeline.
#[async_trait]
pub trait LookupSource: Send + Sync {
    /// Short identifier, recorded as provenance on resolved records.
    fn id(&self) -> &'static str;

    /// Flat delay inserted between consecutive requests to this source.
    fn delay(&self) -> Duration;

    /// Looks up one domain. An `Err` marks the domain failed for this stage
    /// only; the error is logged and the domain moves to the next stage.
    async fn lookup(&self, domain: &str) -> anyhow::Result<SourceHit>;
}

/// Lowercased last label of the domain, with a leading dot (".com").
pub(crate) fn tld_of(domain: &str) -> Option<String> {
    let label = domain.trim_end_matches('.').rsplit('.').next()?;
    if label.is_empty() || label.len() == domain.len() {
        return None;
    }
    Some(format!(".{}", label.to_lowercase()))
}
