use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::writer::CsvWriterConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapsConfig {
    #[serde(default = "default_query")]
    pub query: String,

    #[serde(default = "default_expand_queries")]
    pub expand_queries: bool,

    #[serde(default = "default_progress_file")]
    pub progress_file: Option<PathBuf>,

    /// Stdout when absent
    #[serde(default)]
    pub output_file: Option<PathBuf>,

    #[serde(default)]
    pub csv: CsvWriterConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default = "default_consent_keywords")]
    pub consent_keywords: Vec<String>,

    /// Interface language passed as `hl`
    #[serde(default)]
    pub language: Option<String>,

    /// Milliseconds to let a search page settle before harvesting
    #[serde(default = "default_search_settle")]
    pub search_settle: u64,

    /// Milliseconds to wait for the place name to show up
    #[serde(default = "default_detail_timeout")]
    pub detail_timeout: u64,

    /// Milliseconds to let a place page settle once its name is there
    #[serde(default = "default_detail_settle")]
    pub detail_settle: u64,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            query: default_query(),
            expand_queries: default_expand_queries(),
            progress_file: default_progress_file(),
            output_file: None,
            csv: CsvWriterConfig::default(),
            feed: FeedConfig::default(),
            consent_keywords: default_consent_keywords(),
            language: None,
            search_settle: default_search_settle(),
            detail_timeout: default_detail_timeout(),
            detail_settle: default_detail_settle(),
        }
    }
}

fn default_query() -> String {
    "Dental clinics in Gotri, Vadodara".into()
}

fn default_expand_queries() -> bool {
    true
}

fn default_progress_file() -> Option<PathBuf> {
    Some(PathBuf::from("scraper_progress.txt"))
}

fn default_consent_keywords() -> Vec<String> {
    [
        // en
        "accept all",
        "reject all",
        "i agree",
        "accept",
        // de
        "alle akzeptieren",
        "alle ablehnen",
        "akzeptieren",
        // fr
        "tout accepter",
        "tout refuser",
        "j'accepte",
        // es
        "aceptar todo",
        "rechazar todo",
        "acepto",
        // it
        "accetta tutto",
        "rifiuta tutto",
        // pt
        "aceitar tudo",
        "rejeitar tudo",
        // nl
        "alles accepteren",
        "alles afwijzen",
        // pl
        "zaakceptuj wszystko",
        "odrzuć wszystko",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_search_settle() -> u64 {
    3000
}

fn default_detail_timeout() -> u64 {
    6000
}

fn default_detail_settle() -> u64 {
    1200
}

/// Scrolling of the results feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedConfig {
    #[serde(default = "default_max_scrolls")]
    pub max_scrolls: usize,

    /// Consecutive rounds without new links before giving up
    #[serde(default = "default_stable_rounds")]
    pub stable_rounds: usize,

    #[serde(default = "default_settle")]
    pub settle: u64,

    #[serde(default = "default_recheck")]
    pub recheck: u64,

    /// Pixels scrolled back up to trigger lazy loading
    #[serde(default = "default_wiggle_offset")]
    pub wiggle_offset: u32,

    #[serde(default = "default_wiggle_pause")]
    pub wiggle_pause: u64,

    #[serde(default = "default_max_links")]
    pub max_links: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            max_scrolls: default_max_scrolls(),
            stable_rounds: default_stable_rounds(),
            settle: default_settle(),
            recheck: default_recheck(),
            wiggle_offset: default_wiggle_offset(),
            wiggle_pause: default_wiggle_pause(),
            max_links: default_max_links(),
        }
    }
}

impl FeedConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle)
    }

    pub fn recheck(&self) -> Duration {
        Duration::from_millis(self.recheck)
    }

    pub fn wiggle_pause(&self) -> Duration {
        Duration::from_millis(self.wiggle_pause)
    }
}

fn default_max_scrolls() -> usize {
    400
}

fn default_stable_rounds() -> usize {
    5
}

fn default_settle() -> u64 {
    300
}

fn default_recheck() -> u64 {
    800
}

fn default_wiggle_offset() -> u32 {
    1500
}

fn default_wiggle_pause() -> u64 {
    500
}

fn default_max_links() -> usize {
    600
}
