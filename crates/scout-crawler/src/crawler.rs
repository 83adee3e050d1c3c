use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Error, Result};
use futures::{future, stream::LocalBoxStream, try_join, StreamExt};
use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::header::USER_AGENT;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::browser::BrowserPool;
use crate::config::{CrawlerConfig, OnError, Throttle};
use crate::limiter::{RateLimitedExt, RateLimiter};
use crate::spider::{CountedTx, Fetch, Output, Request, Response, Spider};

lazy_static! {
    static ref HTTP_CLI: reqwest::Client = reqwest::ClientBuilder::new()
        .gzip(true)
        .deflate(true)
        .build()
        .unwrap();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlStats {
    /// Requests that went through the dupe filter
    pub scheduled: usize,
    /// Requests fully handled, parsed or failed
    pub processed: usize,
    pub filtered: usize,
    pub failed: usize,
    pub items: usize,
}

enum Work<S> {
    Parse(Response<S>),
    Failed(Request<S>, Error),
}

struct Fetched {
    url: String,
    status: Option<u16>,
    body: String,
    captures: Vec<serde_json::Value>,
}

async fn fetch_http(config: &CrawlerConfig, url: &str, user_agent: Option<&str>) -> Result<Fetched> {
    let mut req = HTTP_CLI.get(url).timeout(config.download_timeout());
    if let Some(ua) = user_agent {
        req = req.header(USER_AGENT, ua);
    }
    let resp = req.send().await?.error_for_status()?;
    let status = resp.status().as_u16();
    let url = resp.url().to_string();
    Ok(Fetched {
        url,
        status: Some(status),
        body: resp.text().await?,
        captures: vec![],
    })
}

async fn download<S>(
    config: &CrawlerConfig,
    browser: &Arc<BrowserPool>,
    request: Request<S>,
) -> Work<S> {
    let user_agent = config.user_agents.choose(&mut rand::thread_rng()).cloned();

    let fetched = match &request.fetch {
        Fetch::Http => fetch_http(config, &request.url, user_agent.as_deref()).await,
        Fetch::Browser(methods) => {
            let browser = browser.clone();
            let url = request.url.clone();
            let methods = methods.clone();
            tokio::task::spawn_blocking(move || {
                browser.render(&url, user_agent.as_deref(), &methods)
            })
            .await
            .map_err(Error::from)
            .and_then(|rendered| rendered)
            .map(|r| Fetched {
                url: r.url,
                status: None,
                body: r.body,
                captures: r.captures,
            })
        }
    };

    match fetched {
        Ok(Fetched {
            url,
            status,
            body,
            captures,
        }) => Work::Parse(Response {
            url,
            status,
            body,
            captures,
            step: request.step,
        }),
        Err(e) => Work::Failed(request, e),
    }
}

async fn interrupted(handle_sigint: bool) {
    if handle_sigint && tokio::signal::ctrl_c().await.is_ok() {
        return;
    }
    future::pending::<()>().await
}

/// Runs the spider until every scheduled request has been handled.
///
/// Items are sent to `tx_item` as they are emitted, the channel is dropped on return.
pub async fn crawl<S>(
    crawler_conf: &CrawlerConfig,
    spider: Arc<S>,
    tx_item: crossbeam_channel::Sender<S::Item>,
) -> Result<CrawlStats>
where
    S: Spider,
{
    let num_workers = crawler_conf.num_workers.max(1);

    let pages_in = Arc::new(AtomicUsize::new(0));
    let pages_out = Arc::new(AtomicUsize::new(0));
    let filtered = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let items = Arc::new(AtomicUsize::new(0));
    let abort = Arc::new(AtomicBool::new(false));

    let (tx_stop, rx_stop) = crossbeam_channel::unbounded::<()>();
    let (tx_req, rx_req) = mpsc::unbounded_channel::<Request<S::Step>>();
    let (tx_page, rx_page) = crossbeam_channel::bounded::<Work<S::Step>>(crawler_conf.page_buffer);

    let tx_req = CountedTx::new(tx_req, pages_in.clone(), filtered.clone());

    // Workers

    let mut workers = vec![];
    for id in 0..num_workers {
        let rx_stop = rx_stop.clone();
        let rx_page = rx_page.clone();
        let tx_req = tx_req.clone();
        let tx_item = tx_item.clone();
        let pages_out = pages_out.clone();
        let items = items.clone();
        let abort = abort.clone();
        let spider = spider.clone();
        let on_scrap_error = crawler_conf.on_scrap_error;
        let worker = thread::Builder::new()
            .name(format!("worker-{id}"))
            .spawn(move || {
                loop {
                    crossbeam_channel::select! {
                        recv(rx_page) -> work => {
                            let work = match work {
                                Ok(work) => work,
                                Err(_) => break,
                            };
                            let mut out = Output::default();
                            let res = match work {
                                Work::Parse(response) => {
                                    let url = response.url.clone();
                                    spider
                                        .parse(response, &mut out)
                                        .map_err(|e| anyhow!("Couldn't parse {url} got: {e}"))
                                }
                                Work::Failed(request, e) => {
                                    spider.on_failure(request, &e, &mut out);
                                    Ok(())
                                }
                            };
                            match res {
                                Ok(()) => {
                                    let (requests, new_items) = out.into_parts();
                                    for request in requests {
                                        tx_req.send(request);
                                    }
                                    for item in new_items {
                                        match tx_item.send(item) {
                                            Ok(()) => {
                                                items.fetch_add(1, Ordering::SeqCst);
                                            }
                                            Err(_) => log::error!("Couldn't send item: receiver dropped"),
                                        }
                                    }
                                }
                                Err(e) => match on_scrap_error {
                                    OnError::SkipAndLog => log::error!("Skipping page: {e}"),
                                    OnError::Fail => {
                                        abort.store(true, Ordering::SeqCst);
                                        pages_out.fetch_add(1, Ordering::SeqCst);
                                        return Err(e);
                                    }
                                },
                            }
                            pages_out.fetch_add(1, Ordering::SeqCst);
                        },
                        recv(rx_stop) -> _ => break
                    }
                }
                Ok::<(), Error>(())
            })?;
        workers.push(worker);
    }
    drop(tx_item);
    let workers = async move {
        tokio::task::spawn_blocking(move || {
            for w in workers {
                w.join().map_err(|_| anyhow!("Worker panicked"))??;
            }
            Ok::<(), Error>(())
        })
        .await?
    };

    // Seed

    for request in spider.start_requests() {
        tx_req.send(request);
    }
    drop(tx_req);

    // Downloader

    let browser = Arc::new(BrowserPool::new(
        crawler_conf.browser.clone(),
        crawler_conf.screenshot_dir.clone(),
    ));
    let failed_c = failed.clone();
    let on_dl_error = crawler_conf.on_dl_error;
    let downloader = async move {
        // Delays run one after the other, before dispatch
        let requests = UnboundedReceiverStream::new(rx_req).then(|request| {
            let delay = crawler_conf.delay_with(rand::thread_rng().gen_range(0.5..=1.5));
            async move {
                tokio::time::sleep(delay).await;
                request
            }
        });
        let browser = &browser;
        let mut outcomes: LocalBoxStream<'_, Work<S::Step>> = match crawler_conf.throttle {
            Throttle::Concurrent(n) => requests
                .map(|request| download(crawler_conf, browser, request))
                .buffer_unordered(n.get())
                .boxed_local(),
            Throttle::PerSecond(n) => requests
                .map(|request| download(crawler_conf, browser, request))
                .rate_limited(RateLimiter::new(n.get()))
                .boxed_local(),
        };

        while let Some(work) = outcomes.next().await {
            if let Work::Failed(request, e) = &work {
                failed_c.fetch_add(1, Ordering::SeqCst);
                if on_dl_error == OnError::Fail {
                    return Err(anyhow!("Couldn't download {} got: {e}", request.url));
                }
            }
            // Workers are gone once the crawl is stopping
            tx_page.send(work).ok();
        }

        Ok::<(), Error>(())
    };

    // Completion

    let handle_sigint = crawler_conf.handle_sigint;
    let pages_in_c = pages_in.clone();
    let pages_out_c = pages_out.clone();
    let done = async move {
        loop {
            match timeout(Duration::from_millis(200), interrupted(handle_sigint)).await {
                Ok(()) => {
                    for _ in 0..num_workers {
                        tx_stop.send(()).ok();
                    }
                    return Err::<(), _>(anyhow!("Interrupted"));
                }
                Err(_) => {
                    if abort.load(Ordering::SeqCst)
                        || pages_out_c.load(Ordering::SeqCst) == pages_in_c.load(Ordering::SeqCst)
                    {
                        for _ in 0..num_workers {
                            tx_stop.send(()).ok();
                        }
                        return Ok::<_, Error>(());
                    }
                }
            }
        }
    };

    try_join!(workers, downloader, done)?;

    let stats = CrawlStats {
        scheduled: pages_in.load(Ordering::SeqCst),
        processed: pages_out.load(Ordering::SeqCst),
        filtered: filtered.load(Ordering::SeqCst),
        failed: failed.load(Ordering::SeqCst),
        items: items.load(Ordering::SeqCst),
    };
    log::info!(
        "Crawl done: {} scheduled, {} processed, {} filtered, {} failed, {} items",
        stats.scheduled,
        stats.processed,
        stats.filtered,
        stats.failed,
        stats.items
    );
    Ok(stats)
}
