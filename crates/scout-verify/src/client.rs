use std::sync::Mutex;

use reqwest::StatusCode;

use crate::config::VerifyConfig;
use crate::error::{Result, VerifyError};
use crate::model::{HistoryEntry, TokenResponse, VerificationResult, VerifyRequest, VerifyResponse};

/// HTTP client of the verification backend, holding on to the issued token.
#[derive(Debug)]
pub struct VerifierClient {
    http: reqwest::Client,
    config: VerifyConfig,
    token: Mutex<Option<String>>,
}

impl VerifierClient {
    pub fn new(config: VerifyConfig) -> Result<Self> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    fn cached_token(&self) -> Option<String> {
        self.token.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.lock().unwrap_or_else(|e| e.into_inner()) = token;
    }

    /// Requests a development token from the backend.
    pub async fn fetch_token(&self) -> Result<String> {
        let resp = self
            .http
            .post(self.url("/auth/dev-token"))
            .timeout(self.config.token_timeout())
            .send()
            .await?;
        let status = resp.status();
        if status != StatusCode::OK {
            let message = resp.text().await.unwrap_or_default();
            return Err(VerifyError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json::<TokenResponse>().await?.token)
    }

    /// The current token, fetched on first use. `None` when the backend can't issue one.
    pub async fn token(&self) -> Option<String> {
        if let Some(token) = self.cached_token() {
            return Some(token);
        }
        match self.fetch_token().await {
            Ok(token) => {
                self.set_token(Some(token.clone()));
                Some(token)
            }
            Err(e) => {
                log::debug!("No auth token: {e}");
                None
            }
        }
    }

    pub async fn verify(&self, token: &str, emails: &[String], source: &str) -> Result<Vec<VerificationResult>> {
        let resp = self
            .http
            .post(self.url("/verify-email"))
            .bearer_auth(token)
            .json(&VerifyRequest { emails, source })
            .timeout(self.config.verify_timeout())
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => Ok(resp.json::<VerifyResponse>().await?.results),
            StatusCode::FORBIDDEN => {
                self.set_token(None);
                Err(VerifyError::Unauthorized)
            }
            status => {
                let message = resp.text().await.unwrap_or_default();
                Err(VerifyError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    pub async fn history(&self, token: &str) -> Result<Vec<HistoryEntry>> {
        let resp = self
            .http
            .get(self.url("/email-verifications"))
            .bearer_auth(token)
            .timeout(self.config.history_timeout())
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => Ok(resp.json().await?),
            StatusCode::FORBIDDEN => {
                self.set_token(None);
                Err(VerifyError::Unauthorized)
            }
            status => {
                let message = resp.text().await.unwrap_or_default();
                Err(VerifyError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
