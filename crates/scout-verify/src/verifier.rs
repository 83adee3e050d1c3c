use std::time::Duration;

use crate::cache::ResultCache;
use crate::client::VerifierClient;
use crate::config::VerifyConfig;
use crate::cooldown::Cooldown;
use crate::error::{Result, VerifyError};
use crate::model::{HistoryEntry, VerificationResult};
use crate::validate::{validate_email_format, FormatError};

const BATCH_PAUSE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Malformed(FormatError),
    Cached(VerificationResult),
    Verified(VerificationResult),
    /// No backend token, canned answer
    Demo(VerificationResult),
    /// Remaining wait before the next remote verification
    RateLimited(Duration),
}

impl Verdict {
    pub fn result(&self) -> Option<&VerificationResult> {
        match self {
            Self::Cached(r) | Self::Verified(r) | Self::Demo(r) => Some(r),
            Self::Malformed(_) | Self::RateLimited(_) => None,
        }
    }
}

pub struct Verifier {
    client: VerifierClient,
    cache: ResultCache,
    cooldown: Cooldown,
}

impl Verifier {
    pub fn new(config: VerifyConfig) -> Result<Self> {
        let cache = ResultCache::new(config.cache_ttl());
        let cooldown = Cooldown::new(config.min_interval());
        Ok(Self {
            client: VerifierClient::new(config)?,
            cache,
            cooldown,
        })
    }

    pub fn client(&self) -> &VerifierClient {
        &self.client
    }

    pub async fn verify_one(&mut self, email: &str) -> Result<Verdict> {
        let email = email.trim();
        if let Err(e) = validate_email_format(email) {
            return Ok(Verdict::Malformed(e));
        }

        if let Some(cached) = self.cache.get(email) {
            log::debug!("Cached result for {email}");
            return Ok(Verdict::Cached(cached.clone()));
        }

        if let Err(wait) = self.cooldown.check() {
            return Ok(Verdict::RateLimited(wait));
        }

        let token = match self.client.token().await {
            Some(token) => token,
            None if self.client.config().demo_fallback => {
                log::warn!("Verification backend unavailable, answering in demo mode");
                return Ok(Verdict::Demo(VerificationResult::demo(email)));
            }
            None => return Err(VerifyError::Unauthorized),
        };

        let emails = [email.to_string()];
        let result = self
            .client
            .verify(&token, &emails, "Single")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| VerifyError::Api {
                status: 200,
                message: format!("No result returned for {email}"),
            })?;

        self.cache.insert(email, result.clone());
        self.cooldown.record();
        Ok(Verdict::Verified(result))
    }

    /// Verifies in batches, a failed batch is logged and left out of the results.
    pub async fn verify_many(&mut self, emails: &[String], source: &str) -> Vec<VerificationResult> {
        let batch_size = self.client.config().batch_size.max(1);
        let total = emails.len();
        let mut results = Vec::with_capacity(total);

        for (i, batch) in emails.chunks(batch_size).enumerate() {
            if i > 0 {
                tokio::time::sleep(BATCH_PAUSE).await;
            }

            match self.client.token().await {
                Some(token) => match self.client.verify(&token, batch, source).await {
                    Ok(batch_results) => {
                        results.extend(batch_results);
                        self.cooldown.record();
                    }
                    Err(e) => log::error!("Batch {} failed: {e}", i + 1),
                },
                None if self.client.config().demo_fallback => {
                    log::warn!("Verification backend unavailable, answering in demo mode");
                    results.extend(batch.iter().map(|email| VerificationResult::demo(email)));
                }
                None => log::error!("Batch {} skipped: no auth token", i + 1),
            }

            log::info!("Processed {}/{total}", (i * batch_size + batch.len()).min(total));
        }

        results
    }

    /// Past verifications, empty when the backend can't be reached.
    pub async fn history(&self) -> Vec<HistoryEntry> {
        let token = match self.client.token().await {
            Some(token) => token,
            None => return vec![],
        };
        match self.client.history(&token).await {
            Ok(history) => history,
            Err(e) => {
                log::error!("Couldn't fetch history: {e}");
                vec![]
            }
        }
    }
}
