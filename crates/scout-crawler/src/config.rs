use std::cmp;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlerConfig {
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,

    #[serde(default = "default_throttle")]
    pub throttle: Throttle,

    #[serde(default = "default_download_delay")]
    pub download_delay: f32,

    #[serde(default = "default_randomize_download_delay")]
    pub randomize_download_delay: bool,

    #[serde(default = "default_download_timeout")]
    pub download_timeout: f32,

    #[serde(default = "default_page_buffer")]
    pub page_buffer: usize,

    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    #[serde(default = "default_on_dl_error")]
    pub on_dl_error: OnError,

    #[serde(default = "default_on_scrap_error")]
    pub on_scrap_error: OnError,

    #[serde(default = "default_handle_sigint")]
    pub handle_sigint: bool,

    #[serde(default)]
    pub browser: BrowserConfig,

    #[serde(default)]
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agents: default_user_agents(),
            throttle: default_throttle(),
            download_delay: default_download_delay(),
            randomize_download_delay: default_randomize_download_delay(),
            download_timeout: default_download_timeout(),
            page_buffer: default_page_buffer(),
            num_workers: default_num_workers(),
            on_dl_error: default_on_dl_error(),
            on_scrap_error: default_on_scrap_error(),
            handle_sigint: default_handle_sigint(),
            browser: BrowserConfig::default(),
            screenshot_dir: None,
        }
    }
}

impl CrawlerConfig {
    /// The pause applied before each download, jittered when randomization is on.
    pub fn delay_with(&self, factor: f32) -> Duration {
        let base = self.download_delay.max(0.0);
        let secs = if self.randomize_download_delay {
            base * factor.clamp(0.5, 1.5)
        } else {
            base
        };
        Duration::try_from_secs_f32(secs)
            .unwrap_or_else(|_| Duration::from_secs_f32(default_download_delay()))
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::try_from_secs_f32(self.download_timeout.max(0.1))
            .unwrap_or_else(|_| Duration::from_secs_f32(default_download_timeout()))
    }
}

fn default_user_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_throttle() -> Throttle {
    Throttle::default()
}

fn default_download_delay() -> f32 {
    0.5
}

fn default_randomize_download_delay() -> bool {
    true
}

fn default_download_timeout() -> f32 {
    30.0
}

fn default_page_buffer() -> usize {
    10_000
}

fn default_num_workers() -> usize {
    cmp::max(1, num_cpus::get().saturating_sub(2))
}

fn default_on_dl_error() -> OnError {
    OnError::SkipAndLog
}

fn default_on_scrap_error() -> OnError {
    OnError::SkipAndLog
}

fn default_handle_sigint() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OnError {
    Fail,
    SkipAndLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Throttle {
    /// The maximum number of concurrent requests
    Concurrent(NonZeroUsize),
    /// The number of requests per second
    PerSecond(NonZeroUsize),
}

impl Default for Throttle {
    fn default() -> Self {
        Self::Concurrent(NonZeroUsize::new(12).unwrap())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowserConfig {
    #[serde(default = "default_headless")]
    pub headless: bool,

    #[serde(default)]
    pub sandbox: bool,

    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,

    /// Seconds a tab waits on navigation and selectors by default
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout: u64,

    /// Seconds the browser may stay idle before it is torn down
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            sandbox: false,
            window_width: default_window_width(),
            window_height: default_window_height(),
            navigation_timeout: default_navigation_timeout(),
            idle_timeout: default_idle_timeout(),
        }
    }
}

fn default_headless() -> bool {
    true
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

fn default_navigation_timeout() -> u64 {
    90
}

fn default_idle_timeout() -> u64 {
    120
}
