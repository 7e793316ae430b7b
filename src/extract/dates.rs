//! Lenient date parsing for registration data.

use chrono::{DateTime, Utc};

/// Attempts to parse a date string in the formats public WHOIS data shows up
/// in. Returns `None` rather than guessing when no format matches.
pub(crate) fn parse_date_string(date_str: &str) -> Option<DateTime<Utc>> {
    let date_str = date_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = [
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d",
        "%d-%b-%Y",
        "%d/%m/%Y",
        "%m/%d/%Y",
    ];

    for format in &formats {
        if let Ok(naive_dt) = chrono::NaiveDateTime::parse_from_str(date_str, format) {
            return Some(naive_dt.and_utc());
        }
        if let Ok(naive_date) = chrono::NaiveDate::parse_from_str(date_str, format) {
            return Some(naive_date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;

    #[test]
    fn test_parses_rfc3339() {
        let dt = parse_date_string("2015-06-24T00:00:00Z").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2015, 6, 24));
    }

    #[test]
    fn test_parses_bare_date() {
        let dt = parse_date_string("2015-06-24").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2015, 6, 24));
    }

    #[test]
    fn test_parses_whois_mirror_slash_date() {
        // who.is renders "Created 06/24/2015"
        let dt = parse_date_string("06/24/2015").unwrap();
        assert_eq!(dt.year(), 2015);
    }

    #[test]
    fn test_rejects_noise() {
        assert!(parse_date_string("not a date").is_none());
        assert!(parse_date_string("").is_none());
    }
}
