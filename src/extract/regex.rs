//! Regex-based fallback extractor.
//!
//! Pattern set covers the labels seen on public WHOIS mirrors and registry
//! lookup pages (including the Dutch labels SIDN uses). Values are trimmed
//! and capped; anything ambiguous is dropped rather than guessed.

use async_trait::async_trait;
use regex::Regex;

use crate::extract::{parse_date_string, TextExtractor};
use crate::models::LookupFields;

/// Longest value accepted for a single extracted field. WHOIS disclaimers can
/// run to paragraphs; a registrant name cannot.
const MAX_FIELD_LEN: usize = 100;

/// Secondary extractor built on fixed label patterns.
pub struct RegexExtractor {
    registrar: Vec<Regex>,
    registrant: Vec<Regex>,
    creation: Vec<Regex>,
    expiry: Vec<Regex>,
    nameserver: Regex,
}

impl RegexExtractor {
    /// Compiles the pattern set. Patterns are fixed, so compilation cannot
    /// fail at runtime.
    pub fn new() -> Self {
        let compile = |patterns: &[&str]| -> Vec<Regex> {
            patterns
                .iter()
                .map(|p| Regex::new(p).expect("fixed extractor pattern"))
                .collect()
        };

        Self {
            registrar: compile(&[r"(?im)^\s*Registrar(?: Name)?:\s*(.+)$", r"(?im)^\s*Beheerder:\s*(.+)$"]),
            registrant: compile(&[
                r"(?im)^\s*Registrant Organi[sz]ation:\s*(.+)$",
                r"(?im)^\s*Registrant:\s*(.+)$",
                r"(?im)^\s*(?:Domain )?[Hh]older:\s*(.+)$",
                r"(?im)^\s*Organi[sz]ation:\s*(.+)$",
            ]),
            creation: compile(&[
                r"(?im)^\s*Creation Date:\s*(\S+)",
                r"(?im)^\s*Created On:\s*(\S+)",
                r"(?im)^\s*(?:Date )?[Rr]egistered(?: On|:)?\s*:?\s*(\S+)",
                r"(?im)^\s*Aangemaakt:\s*(\S+)",
                r"(?m)Created\s+(\d{1,2}/\d{1,2}/\d{4})",
            ]),
            expiry: compile(&[
                r"(?im)^\s*(?:Registry )?Expir(?:y|ation) Date:\s*(\S+)",
                r"(?im)^\s*Renewal date:\s*(\S+)",
            ]),
            nameserver: Regex::new(r"(?im)^\s*(?:Name ?[Ss]erver[s]?:?)\s*([A-Za-z0-9._-]+\.[A-Za-z]{2,})\s*$")
                .expect("fixed extractor pattern"),
        }
    }

    fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
        for re in patterns {
            if let Some(caps) = re.captures(text) {
                let value = caps.get(1)?.as_str().trim();
                if !value.is_empty() {
                    let mut value = value.to_string();
                    value.truncate(MAX_FIELD_LEN);
                    return Some(value);
                }
            }
        }
        None
    }
}

impl Default for RegexExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextExtractor for RegexExtractor {
    fn id(&self) -> &'static str {
        "regex"
    }

    async fn extract(&self, raw_text: &str, _domain: &str, _source_url: &str) -> LookupFields {
        let nameservers: Vec<String> = self
            .nameserver
            .captures_iter(raw_text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim().to_lowercase()))
            .collect();

        LookupFields {
            registrar: Self::first_capture(&self.registrar, raw_text),
            registry: None,
            registrant_org: Self::first_capture(&self.registrant, raw_text),
            registrant_name: None,
            creation_date: Self::first_capture(&self.creation, raw_text)
                .and_then(|s| parse_date_string(&s)),
            expiry_date: Self::first_capture(&self.expiry, raw_text)
                .and_then(|s| parse_date_string(&s)),
            nameservers,
            raw_status: Vec::new(),
        }
    }
}
