mod config;
mod consent;
mod contact;
mod detail;
mod feed;
mod links;
mod listing;
mod pipeline;
mod progress;
mod query;
mod spider;
mod writer;

use std::sync::Arc;

use anyhow::anyhow;
use scout_crawler::{crawl, CrawlStats, CrawlerConfig};

pub use config::{FeedConfig, MapsConfig};
pub use consent::{dismiss_consent, pick_button};
pub use contact::{extract_emails, extract_phones, is_placeholder};
pub use detail::{extract_listing, unwrap_redirect};
pub use feed::{harvest, Harvest, MapsPage, ResultsPanel, SearchRoutine};
pub use links::{clean_link, LinkDeduper};
pub use listing::Listing;
pub use pipeline::ListingPipeline;
pub use progress::Progress;
pub use query::{expand_queries, search_url};
pub use spider::{MapsSpider, Step};
pub use writer::{spawn_writer, CsvTerminator, CsvWriter, CsvWriterConfig, WriteReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeReport {
    pub queries: usize,
    pub places: usize,
    pub written: usize,
    pub dropped: usize,
    pub stats: CrawlStats,
}

/// Searches every query variation and writes the listings found as CSV.
pub async fn scrape(crawler_conf: &CrawlerConfig, maps_conf: &MapsConfig) -> anyhow::Result<ScrapeReport> {
    let queries = if maps_conf.expand_queries {
        expand_queries(&maps_conf.query)
    } else {
        vec![maps_conf.query.trim().to_string()]
    };
    log::info!("Scraping {} queries for '{}'", queries.len(), maps_conf.query);

    let (tx_listing, writer) = spawn_writer(maps_conf.output_file.as_deref(), &maps_conf.csv)?;
    let spider = Arc::new(MapsSpider::new(
        queries.clone(),
        maps_conf.clone(),
        crawler_conf.screenshot_dir.clone(),
    ));

    let crawled = crawl(crawler_conf, spider.clone(), tx_listing).await;

    // The writer flushes whatever was scraped, even when the crawl was cut short
    let written = writer
        .join()
        .map_err(|_| anyhow!("CSV writer panicked"))??;
    let stats = crawled?;

    Ok(ScrapeReport {
        queries: queries.len(),
        places: spider.places(),
        written: written.written,
        dropped: written.dropped,
        stats,
    })
}
