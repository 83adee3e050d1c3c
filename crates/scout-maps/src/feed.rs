//! Harvesting of the infinitely scrolled results feed.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use scout_crawler::{screenshot_name, BrowserPage, PageRoutine};
use serde_json::Value;

use crate::config::FeedConfig;
use crate::consent::dismiss_consent;
use crate::progress::Progress;

const FEED: &str = "(document.querySelector('div[role=\"feed\"]') || Array.from(document.querySelectorAll('div[aria-label]')).find(d => (d.getAttribute('aria-label') || '').includes('Results')))";

/// The scrollable list of search results.
pub trait ResultsPanel {
    fn has_feed(&self) -> Result<bool>;

    fn scroll_to_bottom(&self) -> Result<()>;

    /// Scrolls to `offset` pixels above the bottom.
    fn scroll_above_bottom(&self, offset: u32) -> Result<()>;

    /// Every place link currently in the page.
    fn place_links(&self) -> Result<Vec<String>>;

    fn pause(&self, duration: Duration);
}

/// Results panel of a rendered Maps search page.
pub struct MapsPage<'a>(pub &'a dyn BrowserPage);

impl ResultsPanel for MapsPage<'_> {
    fn has_feed(&self) -> Result<bool> {
        Ok(self.0.evaluate(&format!("!!{FEED}"))?.as_bool().unwrap_or(false))
    }

    fn scroll_to_bottom(&self) -> Result<()> {
        self.0.evaluate(&format!(
            "(() => {{ const f = {FEED}; if (f) {{ f.scrollTop = f.scrollHeight; }} return !!f; }})()"
        ))?;
        Ok(())
    }

    fn scroll_above_bottom(&self, offset: u32) -> Result<()> {
        self.0.evaluate(&format!(
            "(() => {{ const f = {FEED}; if (f) {{ f.scrollTop = f.scrollHeight - {offset}; }} return !!f; }})()"
        ))?;
        Ok(())
    }

    fn place_links(&self) -> Result<Vec<String>> {
        let links = self.0.evaluate(
            "Array.from(document.querySelectorAll('a')).map(a => a.href).filter(h => h && h.includes('/maps/place/'))",
        )?;
        match links {
            Value::Null => Ok(vec![]),
            links => Ok(serde_json::from_value(links)?),
        }
    }

    fn pause(&self, duration: Duration) {
        self.0.pause(duration)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Harvest {
    /// In discovery order
    pub links: Vec<String>,
    pub feed_found: bool,
    pub scrolls: usize,
}

#[derive(Default)]
struct LinkSet {
    links: Vec<String>,
    seen: HashSet<String>,
}

impl LinkSet {
    fn collect(&mut self, panel: &dyn ResultsPanel) -> Result<usize> {
        for link in panel.place_links()? {
            if self.seen.insert(link.clone()) {
                self.links.push(link);
            }
        }
        Ok(self.links.len())
    }
}

/// Scrolls the feed until it stops yielding new links.
pub fn harvest(panel: &dyn ResultsPanel, conf: &FeedConfig) -> Result<Harvest> {
    let mut links = LinkSet::default();
    links.collect(panel)?;

    if !panel.has_feed()? {
        return Ok(Harvest {
            links: links.links,
            feed_found: false,
            scrolls: 0,
        });
    }

    let mut scrolls = 0;
    let mut stuck = 0;
    while scrolls < conf.max_scrolls && links.links.len() < conf.max_links {
        scrolls += 1;
        let before = links.links.len();

        panel.scroll_to_bottom()?;
        panel.pause(conf.settle());
        if links.collect(panel)? > before {
            stuck = 0;
            continue;
        }

        panel.pause(conf.recheck());
        if links.collect(panel)? > before {
            stuck = 0;
            continue;
        }

        stuck += 1;
        if stuck > 1 {
            panel.scroll_above_bottom(conf.wiggle_offset)?;
            panel.pause(conf.wiggle_pause());
            panel.scroll_to_bottom()?;
            panel.pause(conf.wiggle_pause());
            links.collect(panel)?;
        }
        if stuck >= conf.stable_rounds {
            log::debug!("Feed exhausted after {scrolls} scrolls");
            break;
        }
    }

    links.collect(panel)?;
    let mut links = links.links;
    links.truncate(conf.max_links);
    Ok(Harvest {
        links,
        feed_found: true,
        scrolls,
    })
}

/// Runs on a loaded search page: dismisses consent, then harvests the feed.
#[derive(Debug)]
pub struct SearchRoutine {
    pub progress: Progress,
    pub progress_file: Option<PathBuf>,
    pub consent_keywords: Vec<String>,
    pub feed: FeedConfig,
    pub debug_dir: Option<PathBuf>,
}

impl PageRoutine for SearchRoutine {
    fn run(&self, page: &dyn BrowserPage) -> Result<Option<Value>> {
        if let Some(path) = &self.progress_file {
            self.progress.write(path);
        }

        match dismiss_consent(page, &self.consent_keywords) {
            Ok(true) => {
                if let Err(e) = page.wait_for_selector("div[role=\"feed\"]", Duration::from_secs(10)) {
                    log::debug!("Feed not shown after consent: {e}");
                }
            }
            Ok(false) => {}
            Err(e) => log::warn!("Couldn't check consent dialog: {e}"),
        }

        let harvest = harvest(&MapsPage(page), &self.feed)?;
        if harvest.feed_found {
            log::info!(
                "Scrolling complete for '{}': {} places after {} scrolls",
                self.progress.query,
                harvest.links.len(),
                harvest.scrolls
            );
        } else {
            log::warn!(
                "No results feed for '{}', keeping {} visible places",
                self.progress.query,
                harvest.links.len()
            );
            if let Some(dir) = &self.debug_dir {
                debug_screenshot(page, dir);
            }
        }

        Ok(Some(Value::from(harvest.links)))
    }
}

fn debug_screenshot(page: &dyn BrowserPage, dir: &Path) {
    let path = dir.join(screenshot_name(&page.url()));
    match page.screenshot(&path) {
        Ok(()) => log::info!("Saved debug screenshot: {}", path.display()),
        Err(e) => log::warn!("Couldn't save debug screenshot: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct FakePanel {
        total: usize,
        per_scroll: usize,
        visible: Cell<usize>,
        feed: bool,
        scrolls_down: Cell<usize>,
        wiggles: Cell<usize>,
    }

    impl FakePanel {
        fn new(total: usize, per_scroll: usize, feed: bool) -> Self {
            Self {
                total,
                per_scroll,
                visible: Cell::new(per_scroll.min(total)),
                feed,
                scrolls_down: Cell::new(0),
                wiggles: Cell::new(0),
            }
        }
    }

    impl ResultsPanel for FakePanel {
        fn has_feed(&self) -> Result<bool> {
            Ok(self.feed)
        }

        fn scroll_to_bottom(&self) -> Result<()> {
            self.scrolls_down.set(self.scrolls_down.get() + 1);
            self.visible
                .set((self.visible.get() + self.per_scroll).min(self.total));
            Ok(())
        }

        fn scroll_above_bottom(&self, offset: u32) -> Result<()> {
            assert_eq!(offset, 1500);
            self.wiggles.set(self.wiggles.get() + 1);
            Ok(())
        }

        fn place_links(&self) -> Result<Vec<String>> {
            Ok((0..self.visible.get())
                .map(|i| format!("https://www.google.com/maps/place/{i}"))
                .collect())
        }

        fn pause(&self, _duration: Duration) {}
    }

    #[test]
    fn scrolls_until_the_feed_is_stable() {
        let panel = FakePanel::new(12, 5, true);
        let harvest = harvest(&panel, &FeedConfig::default()).unwrap();

        assert!(harvest.feed_found);
        assert_eq!(harvest.links.len(), 12);
        assert_eq!(harvest.links[0], "https://www.google.com/maps/place/0");
        // 2 growing scrolls, then 5 stuck rounds
        assert_eq!(harvest.scrolls, 7);
        assert_eq!(panel.wiggles.get(), 4);
    }

    #[test]
    fn stops_at_max_scrolls() {
        let panel = FakePanel::new(1000, 1, true);
        let conf = FeedConfig {
            max_scrolls: 3,
            ..Default::default()
        };
        let harvest = harvest(&panel, &conf).unwrap();
        assert_eq!(harvest.scrolls, 3);
        assert_eq!(harvest.links.len(), 4);
        assert_eq!(panel.wiggles.get(), 0);
    }

    #[test]
    fn stops_at_max_links() {
        let panel = FakePanel::new(1000, 20, true);
        let conf = FeedConfig {
            max_links: 50,
            ..Default::default()
        };
        let harvest = harvest(&panel, &conf).unwrap();
        assert_eq!(harvest.links.len(), 50);
        assert_eq!(harvest.scrolls, 2);
    }

    #[test]
    fn without_feed_keeps_visible_links() {
        let panel = FakePanel::new(10, 3, false);
        let harvest = harvest(&panel, &FeedConfig::default()).unwrap();
        assert!(!harvest.feed_found);
        assert_eq!(harvest.links.len(), 3);
        assert_eq!(harvest.scrolls, 0);
        assert_eq!(panel.scrolls_down.get(), 0);
    }
}
