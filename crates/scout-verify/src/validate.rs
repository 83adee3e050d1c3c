use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap();
}

pub const MAX_EMAIL_LEN: usize = 254;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("Email is too short")]
    TooShort,
    #[error("Email is too long (max 254 characters)")]
    TooLong,
    #[error("Email must contain exactly one @ symbol")]
    AtCount,
    #[error("Invalid email format")]
    Invalid,
    #[error("Invalid email structure")]
    Structure,
    #[error("Domain must contain at least one dot")]
    DomainDot,
}

/// Client side format check, run before anything reaches the backend.
pub fn validate_email_format(email: &str) -> Result<(), FormatError> {
    let len = email.chars().count();
    if len < 3 {
        return Err(FormatError::TooShort);
    }
    if len > MAX_EMAIL_LEN {
        return Err(FormatError::TooLong);
    }
    if email.matches('@').count() != 1 {
        return Err(FormatError::AtCount);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(FormatError::Invalid);
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            if domain.contains('.') {
                Ok(())
            } else {
                Err(FormatError::DomainDot)
            }
        }
        _ => Err(FormatError::Structure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_regular_addresses() {
        assert_eq!(validate_email_format("info@smiledental.in"), Ok(()));
        assert_eq!(validate_email_format("first.last+tag@mail.co.uk"), Ok(()));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert_eq!(validate_email_format("a@"), Err(FormatError::TooShort));
        assert_eq!(validate_email_format("info.smiledental.in"), Err(FormatError::AtCount));
        assert_eq!(validate_email_format("a@b@c.com"), Err(FormatError::AtCount));
        assert_eq!(validate_email_format("info@smiledental"), Err(FormatError::Invalid));
        assert_eq!(validate_email_format("info@smiledental.c"), Err(FormatError::Invalid));
        assert_eq!(validate_email_format("in fo@smiledental.in"), Err(FormatError::Invalid));
        assert_eq!(validate_email_format("@smiledental.in"), Err(FormatError::Invalid));
    }

    #[test]
    fn rejects_overlong_addresses() {
        let email = format!("{}@example.org", "a".repeat(250));
        assert_eq!(validate_email_format(&email), Err(FormatError::TooLong));
        let email = format!("{}@example.org", "a".repeat(242));
        assert_eq!(email.len(), 254);
        assert_eq!(validate_email_format(&email), Ok(()));
    }

    #[test]
    fn messages_are_human_readable() {
        assert_eq!(
            FormatError::AtCount.to_string(),
            "Email must contain exactly one @ symbol"
        );
    }
}
