//! Registry lookup source: official RDAP endpoints with a WHOIS API fallback.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::Value;

use crate::config::REGISTRY_LOOKUP_DELAY;
use crate::lookup::{tld_of, LookupSource, SourceHit};
use crate::models::LookupFields;

/// Official RDAP endpoints per supported TLD. `{}` is replaced by the domain.
const RDAP_ENDPOINTS: &[(&str, &str)] = &[
    (".com", "https://rdap.verisign.com/com/v1/domain/{}"),
    (".net", "https://rdap.verisign.com/net/v1/domain/{}"),
    (".org", "https://rdap.publicinterestregistry.org/rdap/domain/{}"),
    (".nl", "https://rdap.sidn.nl/domain/{}"),
];

/// Fallback WHOIS API, used only when an API key is configured.
const WHOIS_API: &str = "https://api.api-ninjas.com/v1/whois?domain={}";

/// Stage-one source: RDAP for supported TLDs, WHOIS API as fallback.
pub struct RegistryLookup {
    client: reqwest::Client,
    whois_api_key: Option<String>,
}

impl RegistryLookup {
    /// Builds the source over a shared HTTP client. The WHOIS fallback stays
    /// disabled when no key is given.
    pub fn new(client: reqwest::Client, whois_api_key: Option<String>) -> Self {
        Self {
            client,
            whois_api_key,
        }
    }

    fn rdap_url(domain: &str) -> Option<String> {
        let tld = tld_of(domain)?;
        RDAP_ENDPOINTS
            .iter()
            .find(|(t, _)| *t == tld)
            .map(|(_, template)| template.replace("{}", domain))
    }

    async fn rdap_lookup(&self, domain: &str, url: &str) -> anyhow::Result<SourceHit> {
        debug!("RDAP lookup for {domain}: {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("RDAP request to {url}"))?
            .error_for_status()
            .with_context(|| format!("RDAP status for {domain}"))?;
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("RDAP body for {domain}"))?;

        Ok(SourceHit {
            fields: parse_rdap_response(&body, url),
            source_url: url.to_string(),
        })
    }

    async fn whois_api_lookup(&self, domain: &str, key: &str) -> anyhow::Result<SourceHit> {
        let url = WHOIS_API.replace("{}", domain);
        debug!("WHOIS API lookup for {domain}");
        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", key)
            .send()
            .await
            .with_context(|| format!("WHOIS API request for {domain}"))?
            .error_for_status()
            .with_context(|| format!("WHOIS API status for {domain}"))?;
        let body: Value = response
            .json()
            .await
            .with_context(|| format!("WHOIS API body for {domain}"))?;

        Ok(SourceHit {
            fields: parse_whois_response(&body),
            source_url: url,
        })
    }
}

#[async_trait]
impl LookupSource for RegistryLookup {
    fn id(&self) -> &'static str {
        "registry"
    }

    fn delay(&self) -> Duration {
        REGISTRY_LOOKUP_DELAY
    }

    async fn lookup(&self, domain: &str) -> anyhow::Result<SourceHit> {
        if let Some(url) = Self::rdap_url(domain) {
            match self.rdap_lookup(domain, &url).await {
                Ok(hit) => return Ok(hit),
                Err(e) => warn!("RDAP lookup failed for {domain}: {e:#}"),
            }
        } else {
            debug!("No RDAP endpoint for the TLD of {domain}");
        }

        if let Some(key) = self.whois_api_key.as_deref() {
            return self.whois_api_lookup(domain, key).await;
        }
        anyhow::bail!("no registry source answered for {domain}")
    }
}

fn parse_rdap_date(value: Option<&str>) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Walks a jCard property list and returns the text value of the first
/// property named `name`. jCard entries are `[name, params, type, value]`.
fn vcard_value<'a>(entity: &'a Value, name: &str) -> Option<&'a str> {
    entity
        .get("vcardArray")?
        .as_array()?
        .get(1)?
        .as_array()?
        .iter()
        .filter_map(Value::as_array)
        .find(|item| item.first().and_then(Value::as_str) == Some(name))?
        .get(3)?
        .as_str()
}

fn entity_has_role(entity: &Value, role: &str) -> bool {
    entity
        .get("roles")
        .and_then(Value::as_array)
        .map(|roles| roles.iter().filter_map(Value::as_str).any(|r| r == role))
        .unwrap_or(false)
}

/// Maps an RDAP JSON document into [`LookupFields`]. Tolerates missing or
/// malformed sub-objects field by field.
pub fn parse_rdap_response(body: &Value, source_url: &str) -> LookupFields {
    let mut fields = LookupFields::default();

    if let Some(events) = body.get("events").and_then(Value::as_array) {
        for event in events {
            let action = event.get("eventAction").and_then(Value::as_str);
            let date = event.get("eventDate").and_then(Value::as_str);
            match action {
                Some("registration") => fields.creation_date = parse_rdap_date(date),
                Some("expiration") => fields.expiry_date = parse_rdap_date(date),
                _ => {}
            }
        }
    }

    fields.raw_status = string_array(body.get("status"));

    if let Some(nameservers) = body.get("nameservers").and_then(Value::as_array) {
        fields.nameservers = nameservers
            .iter()
            .filter_map(|ns| ns.get("ldhName").and_then(Value::as_str))
            .map(|name| name.to_lowercase())
            .collect();
    }

    if let Some(entities) = body.get("entities").and_then(Value::as_array) {
        for entity in entities {
            if entity_has_role(entity, "registrar") && fields.registrar.is_none() {
                fields.registrar = vcard_value(entity, "fn").map(str::to_string);
            }
            if entity_has_role(entity, "registrant") {
                if fields.registrant_org.is_none() {
                    fields.registrant_org = vcard_value(entity, "org").map(str::to_string);
                }
                if fields.registrant_name.is_none() {
                    fields.registrant_name = vcard_value(entity, "fn").map(str::to_string);
                }
            }
        }
    }

    // The endpoint itself identifies the registry operator
    fields.registry = if source_url.contains("verisign") {
        Some("Verisign".to_string())
    } else if source_url.contains("publicinterestregistry") {
        Some("Public Interest Registry".to_string())
    } else if source_url.contains("sidn.nl") {
        Some("SIDN".to_string())
    } else {
        None
    };

    fields
}

/// Maps a WHOIS API JSON document into [`LookupFields`].
pub fn parse_whois_response(body: &Value) -> LookupFields {
    let get_str = |key: &str| {
        body.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    LookupFields {
        registrar: get_str("registrar"),
        registry: None,
        registrant_org: get_str("registrant_organization"),
        registrant_name: get_str("registrant_name"),
        creation_date: parse_rdap_date(body.get("creation_date").and_then(Value::as_str)),
        expiry_date: parse_rdap_date(body.get("expiration_date").and_then(Value::as_str)),
        nameservers: string_array(body.get("name_servers")),
        raw_status: get_str("domain_status").into_iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rdap_url_per_tld() {
        assert_eq!(
            RegistryLookup::rdap_url("example.com").as_deref(),
            Some("https://rdap.verisign.com/com/v1/domain/example.com")
        );
        assert_eq!(
            RegistryLookup::rdap_url("voorbeeld.nl").as_deref(),
            Some("https://rdap.sidn.nl/domain/voorbeeld.nl")
        );
        assert_eq!(RegistryLookup::rdap_url("example.dev"), None);
    }

    #[test]
    fn test_parse_rdap_response() {
        let body = json!({
            "events": [
                {"eventAction": "registration", "eventDate": "2015-06-24T10:00:00Z"},
                {"eventAction": "expiration", "eventDate": "2030-06-24T10:00:00Z"},
                {"eventAction": "last changed", "eventDate": "2024-01-01T00:00:00Z"}
            ],
            "status": ["client transfer prohibited"],
            "nameservers": [
                {"ldhName": "NS1.EXAMPLE.NET"},
                {"ldhName": "ns2.example.net"}
            ],
            "entities": [
                {
                    "roles": ["registrar"],
                    "vcardArray": ["vcard", [
                        ["version", {}, "text", "4.0"],
                        ["fn", {}, "text", "Example Registrar Ltd."]
                    ]]
                },
                {
                    "roles": ["registrant"],
                    "vcardArray": ["vcard", [
                        ["fn", {}, "text", "J. Jansen"],
                        ["org", {}, "text", "Jansen Holding B.V."]
                    ]]
                }
            ]
        });

        let fields =
            parse_rdap_response(&body, "https://rdap.verisign.com/com/v1/domain/example.com");
        assert_eq!(fields.registrar.as_deref(), Some("Example Registrar Ltd."));
        assert_eq!(fields.registry.as_deref(), Some("Verisign"));
        assert_eq!(fields.registrant_org.as_deref(), Some("Jansen Holding B.V."));
        assert_eq!(fields.registrant_name.as_deref(), Some("J. Jansen"));
        assert!(fields.creation_date.is_some());
        assert!(fields.expiry_date.is_some());
        assert_eq!(fields.nameservers, vec!["ns1.example.net", "ns2.example.net"]);
        assert_eq!(fields.raw_status, vec!["client transfer prohibited"]);
    }

    #[test]
    fn test_parse_rdap_response_tolerates_sparse_document() {
        let fields = parse_rdap_response(&json!({}), "https://rdap.sidn.nl/domain/voorbeeld.nl");
        assert_eq!(fields.registry.as_deref(), Some("SIDN"));
        assert!(fields.registrar.is_none());
        assert!(fields.nameservers.is_empty());
    }

    #[test]
    fn test_parse_whois_response() {
        let body = json!({
            "registrar": "Example Registrar Ltd.",
            "registrant_organization": "Jansen Holding B.V.",
            "creation_date": "2015-06-24T10:00:00Z",
            "expiration_date": "2030-06-24T10:00:00Z",
            "name_servers": ["ns1.example.net"],
            "domain_status": "ok"
        });

        let fields = parse_whois_response(&body);
        assert_eq!(fields.registrar.as_deref(), Some("Example Registrar Ltd."));
        assert_eq!(fields.registrant_org.as_deref(), Some("Jansen Holding B.V."));
        assert!(fields.creation_date.is_some());
        assert_eq!(fields.raw_status, vec!["ok"]);
    }
}
