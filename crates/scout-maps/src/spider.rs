use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use scout_crawler::{Output, PageMethod, Request, Response, Spider};
use serde_json::Value;

use crate::config::MapsConfig;
use crate::contact::{extract_emails, extract_phones, join};
use crate::detail::extract_listing;
use crate::feed::SearchRoutine;
use crate::links::LinkDeduper;
use crate::listing::Listing;
use crate::progress::Progress;
use crate::query::search_url;

#[derive(Debug, Clone)]
pub enum Step {
    /// A results page, its captures hold the harvested place links
    Search { query: String },
    Place,
    /// The listing's own website, searched for contact details
    Website(Box<Listing>),
}

pub struct MapsSpider {
    queries: Vec<String>,
    config: MapsConfig,
    debug_dir: Option<PathBuf>,
    links: LinkDeduper,
}

impl MapsSpider {
    pub fn new(queries: Vec<String>, config: MapsConfig, debug_dir: Option<PathBuf>) -> Self {
        Self {
            queries,
            config,
            debug_dir,
            links: LinkDeduper::default(),
        }
    }

    /// Unique place links handed out so far.
    pub fn places(&self) -> usize {
        self.links.len()
    }

    fn search_request(&self, index: usize, query: &str) -> Request<Step> {
        let routine = SearchRoutine {
            progress: Progress {
                index: index + 1,
                total: self.queries.len(),
                query: query.to_string(),
            },
            progress_file: self.config.progress_file.clone(),
            consent_keywords: self.config.consent_keywords.clone(),
            feed: self.config.feed.clone(),
            debug_dir: self.debug_dir.clone(),
        };
        Request::browser(
            search_url(query, self.config.language.as_deref()),
            Step::Search {
                query: query.to_string(),
            },
            vec![
                PageMethod::WaitForTimeout(Duration::from_millis(self.config.search_settle)),
                PageMethod::Run(Arc::new(routine)),
            ],
        )
    }

    fn place_request(&self, link: String) -> Request<Step> {
        Request::browser(
            link,
            Step::Place,
            vec![
                PageMethod::wait_for_selector("h1", Duration::from_millis(self.config.detail_timeout)),
                PageMethod::WaitForTimeout(Duration::from_millis(self.config.detail_settle)),
            ],
        )
    }

    fn parse_search(
        &self,
        query: &str,
        captures: Vec<Value>,
        out: &mut Output<Step, Listing>,
    ) -> anyhow::Result<()> {
        let links: Vec<String> = match captures.into_iter().next() {
            Some(links) => serde_json::from_value(links)?,
            None => bail!("No place links captured for '{query}'"),
        };

        let found = links.len();
        let mut new = 0;
        for link in links {
            if let Some(link) = self.links.accept(&link) {
                out.follow(self.place_request(link));
                new += 1;
            }
        }
        log::info!("'{query}': {found} places, {new} new");
        Ok(())
    }

    fn parse_place(&self, url: &str, body: &str, out: &mut Output<Step, Listing>) -> anyhow::Result<()> {
        let listing = extract_listing(body, url)?;
        if listing.business_name.is_none() {
            log::warn!("No name found for {url}");
        }

        match listing.website_url.clone() {
            Some(website) => {
                log::info!("Visiting website of {}: {website}", listing.label());
                out.follow(Request::http(website, Step::Website(Box::new(listing))).dont_filter());
            }
            None => {
                log::warn!("No website found for {} - {url}", listing.label());
                out.emit(listing);
            }
        }
        Ok(())
    }

    fn parse_website(&self, url: &str, body: &str, mut listing: Listing, out: &mut Output<Step, Listing>) {
        listing.email = join(&extract_emails(body));
        match &listing.email {
            Some(email) => log::info!("Email(s) found for {}: {email}", listing.label()),
            None => log::warn!("No email found on website: {url}"),
        }

        if listing.phone_number.is_none() {
            listing.phone_number = join(&extract_phones(body));
        }
        out.emit(listing);
    }
}

impl Spider for MapsSpider {
    type Step = Step;
    type Item = Listing;

    fn start_requests(&self) -> Vec<Request<Step>> {
        log::info!("Running {} search variations", self.queries.len());
        self.queries
            .iter()
            .enumerate()
            .map(|(index, query)| self.search_request(index, query))
            .collect()
    }

    fn parse(&self, response: Response<Step>, out: &mut Output<Step, Listing>) -> anyhow::Result<()> {
        let Response {
            url,
            body,
            captures,
            step,
            ..
        } = response;
        match step {
            Step::Search { query } => self.parse_search(&query, captures, out),
            Step::Place => self.parse_place(&url, &body, out),
            Step::Website(listing) => {
                self.parse_website(&url, &body, *listing, out);
                Ok(())
            }
        }
    }

    fn on_failure(&self, request: Request<Step>, error: &anyhow::Error, out: &mut Output<Step, Listing>) {
        match request.step {
            Step::Website(mut listing) => {
                log::error!("Failed to visit website {}: {error}", request.url);
                listing.email = None;
                out.emit(*listing);
            }
            Step::Place => log::warn!("Skipping place {}: {error}", request.url),
            Step::Search { query } => log::warn!("Skipping search '{query}': {error}"),
        }
    }
}
