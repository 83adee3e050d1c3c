//! Contact details found in arbitrary website HTML.

use std::collections::BTreeSet;

use lazy_static::lazy_static;
use regex::Regex;

/// Addresses containing these are placeholders or asset references, not contacts.
pub const PLACEHOLDER_MARKERS: [&str; 4] = ["example.com", "sentry", "schema.org", "w3.org"];

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap();
    static ref PHONE_RE: Regex =
        Regex::new(r"(?:\+91[\-\s]?)?[6789]\d{9}|0265[\-\s]?\d{6,8}").unwrap();
}

pub fn is_placeholder(email: &str) -> bool {
    let email = email.to_lowercase();
    PLACEHOLDER_MARKERS.iter().any(|m| email.contains(m))
}

/// Unique emails in the page, sorted, placeholders left out.
pub fn extract_emails(html: &str) -> BTreeSet<String> {
    EMAIL_RE
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .filter(|email| !is_placeholder(email))
        .collect()
}

pub fn extract_phones(html: &str) -> BTreeSet<String> {
    PHONE_RE
        .find_iter(html)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// `None` when empty.
pub fn join(values: &BTreeSet<String>) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().map(String::as_str).collect::<Vec<_>>().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_emails_are_dropped() {
        let html = r#"
            <a href="mailto:info@smiledental.in">info@smiledental.in</a>
            <p>Write to info@smiledental.in or appointments@smiledental.in</p>
            <script>dsn = "abc123@o1.ingest.sentry.io"; mail = "you@Example.com"</script>
        "#;
        let emails = extract_emails(html);
        assert_eq!(
            join(&emails).as_deref(),
            Some("appointments@smiledental.in, info@smiledental.in")
        );
        assert_eq!(emails.len(), 2);
    }

    #[test]
    fn no_emails() {
        assert_eq!(join(&extract_emails("<p>Call us</p>")), None);
    }

    #[test]
    fn phone_patterns() {
        let phones = extract_phones("Call +91 9876543210, 0265-2345678 or 12345");
        assert_eq!(
            phones.into_iter().collect::<Vec<_>>(),
            vec!["+91 9876543210", "0265-2345678"]
        );
    }
}
