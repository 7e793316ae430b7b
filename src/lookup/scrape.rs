//! Scrape lookup source: public WHOIS mirror pages reduced to text.
//!
//! Stage-two source for domains the registry stage could not resolve. One
//! shared HTTP session serves the whole stage; the fetched page text is kept
//! as evidence in the run's evidence area.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use log::{debug, warn};
use scraper::{Html, Selector};

use crate::config::SCRAPE_LOOKUP_DELAY;
use crate::extract::{RegexExtractor, TextExtractor};
use crate::lookup::{tld_of, LookupSource, SourceHit};

/// Picks the mirror page for a domain. Strategies are keyed by TLD; the
/// default covers everything without a dedicated registry page.
pub trait ScrapeStrategy: Send + Sync {
    /// Short identifier used in evidence file names and logs.
    fn id(&self) -> &'static str;

    /// URL of the lookup page for `domain`.
    fn url_for(&self, domain: &str) -> String;
}

/// Default strategy: the who.is WHOIS mirror.
pub struct WhoIsStrategy;

impl ScrapeStrategy for WhoIsStrategy {
    fn id(&self) -> &'static str {
        "who_is"
    }

    fn url_for(&self, domain: &str) -> String {
        format!("https://who.is/whois/{domain}")
    }
}

/// Strategy for `.nl`: the registry's own lookup page at SIDN.
pub struct SidnStrategy;

impl ScrapeStrategy for SidnStrategy {
    fn id(&self) -> &'static str {
        "sidn"
    }

    fn url_for(&self, domain: &str) -> String {
        format!("https://www.sidn.nl/en/whois?q={domain}")
    }
}

/// Stage-two source over a per-TLD strategy table.
pub struct ScrapeLookup {
    client: reqwest::Client,
    strategies: Vec<(&'static str, Arc<dyn ScrapeStrategy>)>,
    default_strategy: Arc<dyn ScrapeStrategy>,
    primary_extractor: Option<Arc<dyn TextExtractor>>,
    fallback_extractor: RegexExtractor,
    evidence_dir: Option<PathBuf>,
}

impl ScrapeLookup {
    /// Builds the source with the standard strategy table (`who.is` default,
    /// SIDN for `.nl`). Page text is written under `evidence_dir` when given.
    pub fn new(
        client: reqwest::Client,
        primary_extractor: Option<Arc<dyn TextExtractor>>,
        evidence_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            client,
            strategies: vec![(".nl", Arc::new(SidnStrategy))],
            default_strategy: Arc::new(WhoIsStrategy),
            primary_extractor,
            fallback_extractor: RegexExtractor::new(),
            evidence_dir,
        }
    }

    fn strategy_for(&self, domain: &str) -> Arc<dyn ScrapeStrategy> {
        let Some(tld) = tld_of(domain) else {
            return Arc::clone(&self.default_strategy);
        };
        self.strategies
            .iter()
            .find(|(t, _)| *t == tld)
            .map(|(_, s)| Arc::clone(s))
            .unwrap_or_else(|| Arc::clone(&self.default_strategy))
    }

    async fn persist_evidence(&self, domain: &str, strategy_id: &str, text: &str) {
        let Some(dir) = &self.evidence_dir else {
            return;
        };
        let path = dir.join(format!("{domain}_{strategy_id}.txt"));
        // Evidence is best effort; losing it never fails the lookup
        if let Err(e) = tokio::fs::write(&path, text).await {
            warn!("Could not write evidence for {domain} to {}: {e}", path.display());
        }
    }
}

/// Reduces an HTML document to its visible text, one line per text node.
/// Script and style content is skipped.
fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let skip_script = Selector::parse("script, style").expect("fixed selector");
    let skipped: Vec<_> = document
        .select(&skip_script)
        .flat_map(|el| el.text())
        .collect();

    document
        .root_element()
        .text()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !skipped.contains(line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl LookupSource for ScrapeLookup {
    fn id(&self) -> &'static str {
        "scrape"
    }

    fn delay(&self) -> Duration {
        SCRAPE_LOOKUP_DELAY
    }

    async fn lookup(&self, domain: &str) -> anyhow::Result<SourceHit> {
        let strategy = self.strategy_for(domain);
        let url = strategy.url_for(domain);
        debug!("Scrape lookup for {domain} via {} ({url})", strategy.id());

        let html = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("scrape request to {url}"))?
            .error_for_status()
            .with_context(|| format!("scrape status for {domain}"))?
            .text()
            .await
            .with_context(|| format!("scrape body for {domain}"))?;

        let text = html_to_text(&html);
        self.persist_evidence(domain, strategy.id(), &text).await;

        let mut fields = match &self.primary_extractor {
            Some(extractor) => extractor.extract(&text, domain, &url).await,
            None => Default::default(),
        };
        if fields.is_empty() {
            fields = self.fallback_extractor.extract(&text, domain, &url).await;
        }
        if fields.is_empty() {
            anyhow::bail!("no fields extracted from {url}")
        }

        Ok(SourceHit {
            fields,
            source_url: url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_table_routes_by_tld() {
        let source = ScrapeLookup::new(reqwest::Client::new(), None, None);
        assert_eq!(source.strategy_for("voorbeeld.nl").id(), "sidn");
        assert_eq!(source.strategy_for("example.com").id(), "who_is");
        assert_eq!(source.strategy_for("example.org").id(), "who_is");
    }

    #[test]
    fn test_html_to_text_strips_markup_and_scripts() {
        let html = "<html><head><script>var x = 1;</script></head>\
                    <body><h1>Whois Record</h1>\
                    <p>Registrar: Example Registrar Ltd.</p></body></html>";
        let text = html_to_text(html);
        assert!(text.contains("Registrar: Example Registrar Ltd."));
        assert!(!text.contains("var x"));
    }
}
