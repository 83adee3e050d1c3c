use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Seconds, kept short so an absent backend falls back to demo mode quickly
    #[serde(default = "default_token_timeout")]
    pub token_timeout: f32,

    #[serde(default = "default_verify_timeout")]
    pub verify_timeout: f32,

    #[serde(default = "default_history_timeout")]
    pub history_timeout: f32,

    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: f32,

    /// Seconds between two single verifications
    #[serde(default = "default_min_interval")]
    pub min_interval: f32,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Answer with canned results when no token can be obtained
    #[serde(default = "default_demo_fallback")]
    pub demo_fallback: bool,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_timeout: default_token_timeout(),
            verify_timeout: default_verify_timeout(),
            history_timeout: default_history_timeout(),
            cache_ttl: default_cache_ttl(),
            min_interval: default_min_interval(),
            batch_size: default_batch_size(),
            demo_fallback: default_demo_fallback(),
        }
    }
}

/// Non-finite values fall back to `default`.
fn secs(s: f32, default: f32) -> Duration {
    Duration::try_from_secs_f32(s.max(0.0)).unwrap_or_else(|_| Duration::from_secs_f32(default))
}

impl VerifyConfig {
    pub fn token_timeout(&self) -> Duration {
        secs(self.token_timeout, default_token_timeout())
    }

    pub fn verify_timeout(&self) -> Duration {
        secs(self.verify_timeout, default_verify_timeout())
    }

    pub fn history_timeout(&self) -> Duration {
        secs(self.history_timeout, default_history_timeout())
    }

    pub fn cache_ttl(&self) -> Duration {
        secs(self.cache_ttl, default_cache_ttl())
    }

    pub fn min_interval(&self) -> Duration {
        secs(self.min_interval, default_min_interval())
    }
}

fn default_base_url() -> String {
    "http://localhost:3000".into()
}

fn default_token_timeout() -> f32 {
    2.0
}

fn default_verify_timeout() -> f32 {
    30.0
}

fn default_history_timeout() -> f32 {
    10.0
}

fn default_cache_ttl() -> f32 {
    300.0
}

fn default_min_interval() -> f32 {
    2.0
}

fn default_batch_size() -> usize {
    10
}

fn default_demo_fallback() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_with_defaults() {
        let conf: VerifyConfig =
            serde_json::from_str(r#"{"baseUrl": "http://verify.test", "batchSize": 25}"#).unwrap();
        assert_eq!(conf.base_url, "http://verify.test");
        assert_eq!(conf.batch_size, 25);
        assert_eq!(conf.cache_ttl(), Duration::from_secs(300));
        assert!(conf.demo_fallback);
    }

    #[test]
    fn non_finite_durations_fall_back() {
        let conf = VerifyConfig {
            cache_ttl: f32::INFINITY,
            min_interval: f32::NAN,
            verify_timeout: -3.0,
            ..Default::default()
        };
        assert_eq!(conf.cache_ttl(), Duration::from_secs(300));
        assert_eq!(conf.min_interval(), Duration::ZERO);
        assert_eq!(conf.verify_timeout(), Duration::ZERO);
    }
}
