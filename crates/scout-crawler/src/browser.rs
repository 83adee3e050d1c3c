//! Headless browser rendering.
//!
//! A single Chrome instance is launched on first use and shared by every browser
//! request, each request getting its own tab.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};
use once_cell::sync::OnceCell;
use serde_json::Value;

use crate::config::BrowserConfig;

/// The subset of browser page operations the crawler and spiders rely on.
pub trait BrowserPage {
    fn url(&self) -> String;

    fn goto(&self, url: &str) -> anyhow::Result<()>;

    fn wait_for_selector(&self, selector: &str, timeout: Duration) -> anyhow::Result<()>;

    /// Evaluates a JavaScript expression, its result must be JSON serializable.
    fn evaluate(&self, script: &str) -> anyhow::Result<Value>;

    fn content(&self) -> anyhow::Result<String>;

    fn screenshot(&self, path: &Path) -> anyhow::Result<()>;

    fn pause(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Custom interaction with a loaded page, its returned value ends up in `Response::captures`.
pub trait PageRoutine: fmt::Debug + Send + Sync {
    fn run(&self, page: &dyn BrowserPage) -> anyhow::Result<Option<Value>>;
}

#[derive(Debug, Clone)]
pub enum PageMethod {
    /// Waits for an element, a timeout is logged and does not fail the request
    WaitForSelector {
        selector: String,
        timeout: Duration,
    },
    WaitForTimeout(Duration),
    Run(Arc<dyn PageRoutine>),
}

impl PageMethod {
    pub fn wait_for_selector(selector: &str, timeout: Duration) -> Self {
        Self::WaitForSelector {
            selector: selector.to_string(),
            timeout,
        }
    }
}

pub fn run_methods(page: &dyn BrowserPage, methods: &[PageMethod]) -> anyhow::Result<Vec<Value>> {
    let mut captures = vec![];
    for method in methods {
        match method {
            PageMethod::WaitForSelector { selector, timeout } => {
                if let Err(e) = page.wait_for_selector(selector, *timeout) {
                    log::warn!("Selector {selector} not found on {}: {e}", page.url());
                }
            }
            PageMethod::WaitForTimeout(duration) => page.pause(*duration),
            PageMethod::Run(routine) => {
                if let Some(value) = routine.run(page)? {
                    captures.push(value);
                }
            }
        }
    }
    Ok(captures)
}

pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }
}

impl BrowserPage for ChromePage {
    fn url(&self) -> String {
        self.tab.get_url()
    }

    fn goto(&self, url: &str) -> anyhow::Result<()> {
        self.tab.navigate_to(url)?.wait_until_navigated()?;
        Ok(())
    }

    fn wait_for_selector(&self, selector: &str, timeout: Duration) -> anyhow::Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)?;
        Ok(())
    }

    fn evaluate(&self, script: &str) -> anyhow::Result<Value> {
        let remote = self
            .tab
            .evaluate(&format!("JSON.stringify(({script}))"), false)?;
        match remote.value {
            Some(Value::String(json)) => Ok(serde_json::from_str(&json)?),
            _ => Ok(Value::Null),
        }
    }

    fn content(&self) -> anyhow::Result<String> {
        self.tab.get_content()
    }

    fn screenshot(&self, path: &Path) -> anyhow::Result<()> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)?;
        save_screenshot(path, &png)
    }
}

fn save_screenshot(path: &Path, png: &[u8]) -> anyhow::Result<()> {
    fs_err::write(path, png)?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Rendered {
    pub url: String,
    pub body: String,
    pub captures: Vec<Value>,
}

pub struct BrowserPool {
    config: BrowserConfig,
    screenshot_dir: Option<PathBuf>,
    browser: OnceCell<Browser>,
}

impl BrowserPool {
    pub fn new(config: BrowserConfig, screenshot_dir: Option<PathBuf>) -> Self {
        Self {
            config,
            screenshot_dir,
            browser: OnceCell::new(),
        }
    }

    fn browser(&self) -> anyhow::Result<&Browser> {
        self.browser.get_or_try_init(|| {
            log::info!(
                "Launching browser (headless: {})",
                self.config.headless
            );
            let options = LaunchOptions::default_builder()
                .headless(self.config.headless)
                .sandbox(self.config.sandbox)
                .window_size(Some((self.config.window_width, self.config.window_height)))
                .idle_browser_timeout(Duration::from_secs(self.config.idle_timeout))
                .build()
                .map_err(|e| anyhow!("Invalid browser options: {e}"))?;
            Browser::new(options)
        })
    }

    /// Blocking, to be called from a blocking-friendly thread.
    pub fn render(
        &self,
        url: &str,
        user_agent: Option<&str>,
        methods: &[PageMethod],
    ) -> anyhow::Result<Rendered> {
        let tab = self.browser()?.new_tab()?;
        tab.set_default_timeout(Duration::from_secs(self.config.navigation_timeout));
        if let Some(ua) = user_agent {
            tab.set_user_agent(ua, None, None)?;
        }

        let page = ChromePage::new(tab.clone());
        let rendered = render_page(&page, url, methods);

        if let (Err(e), Some(dir)) = (&rendered, &self.screenshot_dir) {
            let path = dir.join(screenshot_name(url));
            match page.screenshot(&path) {
                Ok(()) => log::warn!("Rendering {url} failed ({e}), screenshot: {}", path.display()),
                Err(se) => log::warn!("Rendering {url} failed ({e}), no screenshot: {se}"),
            }
        }

        tab.close(true).ok();
        rendered
    }
}

fn render_page(page: &dyn BrowserPage, url: &str, methods: &[PageMethod]) -> anyhow::Result<Rendered> {
    page.goto(url)?;
    let captures = run_methods(page, methods)?;
    Ok(Rendered {
        url: page.url(),
        body: page.content()?,
        captures,
    })
}

/// File name for a debug screenshot of the given URL.
pub fn screenshot_name(url: &str) -> String {
    let stem: String = url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(80)
        .collect();
    format!("debug_{stem}.png")
}
