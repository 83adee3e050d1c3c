use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::model::VerificationResult;

/// Recent single verifications, keyed by lowercased address.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    entries: HashMap<String, (VerificationResult, Instant)>,
}

fn key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, email: &str) -> Option<&VerificationResult> {
        self.entries
            .get(&key(email))
            .filter(|(_, at)| at.elapsed() < self.ttl)
            .map(|(result, _)| result)
    }

    pub fn insert(&mut self, email: &str, result: VerificationResult) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.entries.retain(|_, (_, at)| now.duration_since(*at) < ttl);
        self.entries.insert(key(email), (result, now));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(email: &str) -> VerificationResult {
        VerificationResult {
            email: email.into(),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let mut cache = ResultCache::new(Duration::from_secs(300));
        cache.insert("Info@SmileDental.in ", result("info@smiledental.in"));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(
            cache.get(" info@smiledental.IN").map(|r| r.email.as_str()),
            Some("info@smiledental.in")
        );

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get("info@smiledental.in").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stale_entries_are_evicted_on_insert() {
        let mut cache = ResultCache::new(Duration::from_secs(300));
        cache.insert("a@b.co", result("a@b.co"));
        tokio::time::advance(Duration::from_secs(301)).await;
        cache.insert("c@d.co", result("c@d.co"));
        assert_eq!(cache.len(), 1);
    }
}
