mod bulk;
mod cache;
mod client;
mod config;
mod cooldown;
mod error;
mod model;
mod validate;
mod verifier;

pub use bulk::{verify_sheet, EmailSheet, Summary, RESULT_COLUMNS};
pub use cache::ResultCache;
pub use client::VerifierClient;
pub use config::VerifyConfig;
pub use cooldown::Cooldown;
pub use error::{Result, VerifyError};
pub use model::{parse_timestamp, HistoryEntry, SocialProfile, VerificationDetails, VerificationResult, VerificationStatus};
pub use validate::{validate_email_format, FormatError, MAX_EMAIL_LEN};
pub use verifier::{Verdict, Verifier};
