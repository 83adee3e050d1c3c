mod browser;
mod config;
mod crawler;
mod limiter;
mod spider;

pub use browser::{run_methods, screenshot_name, BrowserPage, BrowserPool, ChromePage, PageMethod, PageRoutine, Rendered};
pub use config::{BrowserConfig, CrawlerConfig, OnError, Throttle};
pub use crawler::{crawl, CrawlStats};
pub use limiter::{RateLimitedExt, RateLimiter};
pub use spider::{CountedTx, Fetch, Output, Request, Response, Spider};

pub use anyhow;
