//! PII redaction (spec §4.13): email -> `[EMAIL]`, phone -> `[PHONE]`,
//! IPv4 -> `[IP]`, URL query strings -> `[PARAMS]`.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"[[:word:].+-]+@[[:word:]-]+\.[[:word:].-]+").unwrap());

/// Matches common phone formats: optional leading `+`, groups of digits
/// separated by spaces, dots, or dashes, at least 7 digits total.
static PHONE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d\-. ]{6,}\d").unwrap());

static IPV4: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|1?\d?\d)\.){3}(?:25[0-5]|2[0-4]\d|1?\d?\d)\b").unwrap());

/// `scheme://host/path?query` -> query string collapsed; leaves the path
/// before `?` untouched.
static URL_QUERY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\?[^\s]+").unwrap());

/// Applies every redaction pass, in a fixed order (email and IPv4 before
/// phone, since a bare numeric IPv4 octet run could otherwise be
/// misread as a phone number fragment once partially redacted).
pub fn redact(line: &str) -> String {
    let line = EMAIL.replace_all(line, "[EMAIL]");
    let line = IPV4.replace_all(&line, "[IP]");
    let line = URL_QUERY.replace_all(&line, "[PARAMS]");
    let line = PHONE.replace_all(&line, "[PHONE]");
    line.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_email() {
        assert_eq!(redact("contact user@example.com now"), "contact [EMAIL] now");
    }

    #[test]
    fn redacts_phone() {
        assert_eq!(redact("call 555-123-4567 today"), "call [PHONE] today");
    }

    #[test]
    fn redacts_ipv4() {
        assert_eq!(redact("from 192.168.1.10 blocked"), "from [IP] blocked");
    }

    #[test]
    fn redacts_url_query_params() {
        assert_eq!(redact("GET /api/login?token=abc123&user=me"), "GET /api/login[PARAMS]");
    }

    #[test]
    fn leaves_clean_text_untouched() {
        assert_eq!(redact("pipeline started normally"), "pipeline started normally");
    }
}
