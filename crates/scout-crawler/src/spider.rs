use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::browser::PageMethod;

pub trait Spider: Send + Sync + 'static {
    /// Routes a response to the right parsing logic, and carries data along the chain
    type Step: Clone + fmt::Debug + Send + 'static;
    type Item: Send + 'static;

    fn start_requests(&self) -> Vec<Request<Self::Step>>;

    fn parse(
        &self,
        response: Response<Self::Step>,
        out: &mut Output<Self::Step, Self::Item>,
    ) -> anyhow::Result<()>;

    /// Called when a request could not be downloaded.
    fn on_failure(
        &self,
        request: Request<Self::Step>,
        error: &anyhow::Error,
        _out: &mut Output<Self::Step, Self::Item>,
    ) {
        log::warn!("Skipping URL: {} ({:?}) got: {error}", request.url, request.step);
    }
}

#[derive(Debug, Clone)]
pub enum Fetch {
    /// Plain HTTP GET
    Http,
    /// Rendered by the shared headless browser, running the methods in order once loaded
    Browser(Vec<PageMethod>),
}

#[derive(Debug, Clone)]
pub struct Request<S> {
    pub url: String,
    pub step: S,
    pub fetch: Fetch,
    pub dont_filter: bool,
}

impl<S> Request<S> {
    pub fn http(url: impl Into<String>, step: S) -> Self {
        Self {
            url: url.into(),
            step,
            fetch: Fetch::Http,
            dont_filter: false,
        }
    }

    pub fn browser(url: impl Into<String>, step: S, methods: Vec<PageMethod>) -> Self {
        Self {
            url: url.into(),
            step,
            fetch: Fetch::Browser(methods),
            dont_filter: false,
        }
    }

    pub fn dont_filter(mut self) -> Self {
        self.dont_filter = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Response<S> {
    /// Final URL, after redirects
    pub url: String,
    pub status: Option<u16>,
    pub body: String,
    /// Values returned by `PageMethod::Run` routines, in order
    pub captures: Vec<serde_json::Value>,
    pub step: S,
}

#[derive(Debug)]
pub struct Output<S, I> {
    requests: Vec<Request<S>>,
    items: Vec<I>,
}

impl<S, I> Default for Output<S, I> {
    fn default() -> Self {
        Self {
            requests: vec![],
            items: vec![],
        }
    }
}

impl<S, I> Output<S, I> {
    pub fn follow(&mut self, request: Request<S>) {
        self.requests.push(request);
    }

    pub fn emit(&mut self, item: I) {
        self.items.push(item);
    }

    pub fn requests(&self) -> &[Request<S>] {
        &self.requests
    }

    pub fn items(&self) -> &[I] {
        &self.items
    }

    pub fn into_parts(self) -> (Vec<Request<S>>, Vec<I>) {
        (self.requests, self.items)
    }
}

/// Request sender that counts what it schedules and drops URLs it has already seen.
#[derive(Debug)]
pub struct CountedTx<S> {
    tx: mpsc::UnboundedSender<Request<S>>,
    counter: Arc<AtomicUsize>,
    filtered: Arc<AtomicUsize>,
    seen: Arc<Mutex<HashSet<String>>>,
}

impl<S> Clone for CountedTx<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            counter: self.counter.clone(),
            filtered: self.filtered.clone(),
            seen: self.seen.clone(),
        }
    }
}

impl<S: fmt::Debug> CountedTx<S> {
    pub fn new(
        tx: mpsc::UnboundedSender<Request<S>>,
        counter: Arc<AtomicUsize>,
        filtered: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            tx,
            counter,
            filtered,
            seen: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Returns whether the request was scheduled.
    pub fn send(&self, request: Request<S>) -> bool {
        if !request.dont_filter {
            let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
            if !seen.insert(request.url.clone()) {
                log::debug!("Filtered duplicate request: {}", request.url);
                self.filtered.fetch_add(1, Ordering::SeqCst);
                return false;
            }
        }

        // Counted before sending so the completion check never sees it missing
        self.counter.fetch_add(1, Ordering::SeqCst);
        match self.tx.send(request) {
            Ok(()) => true,
            Err(e) => {
                self.counter.fetch_sub(1, Ordering::SeqCst);
                log::error!("Couldn't send request {}: channel closed", e.0.url);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counted() -> (
        CountedTx<u8>,
        mpsc::UnboundedReceiver<Request<u8>>,
        Arc<AtomicUsize>,
        Arc<AtomicUsize>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let counter = Arc::new(AtomicUsize::new(0));
        let filtered = Arc::new(AtomicUsize::new(0));
        let tx = CountedTx::new(tx, counter.clone(), filtered.clone());
        (tx, rx, counter, filtered)
    }

    #[test]
    fn duplicate_urls_are_filtered() {
        let (tx, mut rx, counter, filtered) = counted();
        assert!(tx.send(Request::http("https://a.test/x", 1)));
        assert!(!tx.clone().send(Request::http("https://a.test/x", 2)));
        assert!(tx.send(Request::http("https://a.test/y", 3)));

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(filtered.load(Ordering::SeqCst), 1);
        assert_eq!(rx.try_recv().unwrap().step, 1);
        assert_eq!(rx.try_recv().unwrap().step, 3);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dont_filter_bypasses_seen_urls() {
        let (tx, _rx, counter, filtered) = counted();
        assert!(tx.send(Request::http("https://a.test/x", 1)));
        assert!(tx.send(Request::http("https://a.test/x", 2).dont_filter()));
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(filtered.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn closed_channel_is_not_counted() {
        let (tx, rx, counter, _) = counted();
        drop(rx);
        assert!(!tx.send(Request::http("https://a.test/x", 1)));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn output_collects_requests_and_items() {
        let mut out = Output::<u8, &str>::default();
        out.follow(Request::http("https://a.test", 0));
        out.emit("item");
        assert_eq!(out.requests().len(), 1);
        let (requests, items) = out.into_parts();
        assert_eq!(requests[0].url, "https://a.test");
        assert_eq!(items, vec!["item"]);
    }
}
