use std::fmt;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VerificationStatus {
    Valid,
    Invalid,
    Risky,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Valid => "Valid",
            Self::Invalid => "Invalid",
            Self::Risky => "Risky",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialProfile {
    #[serde(default)]
    pub has_profile: bool,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDetails {
    #[serde(default)]
    pub is_disposable: bool,
    #[serde(default)]
    pub is_role: bool,
    #[serde(default)]
    pub mx_records: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_profile: Option<SocialProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typo_detected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub was_capitalized: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_email: Option<String>,
    /// Anything else the backend reports
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub email: String,
    #[serde(default)]
    pub status: VerificationStatus,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub details: VerificationDetails,
}

impl VerificationResult {
    /// Canned answer used when the backend can't be reached.
    pub fn demo(email: &str) -> Self {
        Self {
            email: email.to_string(),
            status: VerificationStatus::Valid,
            score: 0.98,
            reason: "Verified (Demo Mode)".into(),
            details: VerificationDetails {
                is_disposable: false,
                is_role: false,
                mx_records: vec![
                    "mail.google.com".into(),
                    "alt1.gmail-smtp-in.l.google.com".into(),
                ],
                smtp_check: Some("Verified".into()),
                social_profile: Some(SocialProfile {
                    has_profile: true,
                    url: Some(
                        "https://www.gravatar.com/avatar/00000000000000000000000000000000?d=mp&f=y"
                            .into(),
                    ),
                }),
                ..Default::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub email: String,
    #[serde(default)]
    pub status: VerificationStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub details: Option<VerificationDetails>,
}

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%d/%m/%Y %H:%M:%S"];

/// RFC 3339, or a timezone-less date time taken as UTC. Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let timestamp = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => {
            let parsed = parse_timestamp(&raw);
            if parsed.is_none() {
                log::debug!("Unreadable history timestamp: {raw}");
            }
            parsed
        }
        _ => None,
    };
    Ok(timestamp)
}

#[derive(Debug, Serialize)]
pub(crate) struct VerifyRequest<'a> {
    pub emails: &'a [String],
    pub source: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct VerifyResponse {
    #[serde(default)]
    pub results: Vec<VerificationResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: String,
}
