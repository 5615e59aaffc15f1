use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::config::CrawlerConfig;
use crate::fetcher::{Fetcher, Page};
use crate::limiter::Limiter;
use crate::tracker::Ticket;
use crate::visited::VisitedSet;

/// The fetcher could not resolve `id`, nothing below it gets crawled.
#[derive(Debug, thiserror::Error)]
#[error("Couldn't fetch {id:?} got: {cause}")]
pub struct FetchFailure<Id> {
    pub id: Id,
    #[source]
    pub cause: anyhow::Error,
}

/// Result of the single fetch performed for a claimed identifier.
#[derive(Debug)]
pub struct FetchOutcome<Id> {
    pub id: Id,
    /// Remaining depth at which `id` was claimed
    pub depth: usize,
    pub result: Result<Page<Id>, FetchFailure<Id>>,
}

impl<Id> FetchOutcome<Id> {
    pub fn is_found(&self) -> bool {
        self.result.is_ok()
    }

    pub fn body(&self) -> &str {
        match &self.result {
            Ok(page) => &page.body,
            Err(_) => "",
        }
    }

    pub fn links(&self) -> &[Id] {
        match &self.result {
            Ok(page) => &page.links,
            Err(_) => &[],
        }
    }

    pub fn error(&self) -> Option<&FetchFailure<Id>> {
        self.result.as_ref().err()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlSummary {
    pub found: usize,
    pub not_found: usize,
}

impl CrawlSummary {
    pub fn record<Id>(&mut self, outcome: &FetchOutcome<Id>) {
        if outcome.is_found() {
            self.found += 1;
        } else {
            self.not_found += 1;
        }
    }

    pub fn total(&self) -> usize {
        self.found + self.not_found
    }
}

struct Session<F: Fetcher> {
    fetcher: Arc<F>,
    visited: VisitedSet<F::Id>,
    limiter: Limiter,
}

type OutcomeTicket<F> = Ticket<FetchOutcome<<F as Fetcher>::Id>>;

fn spawn_worker<F>(session: Arc<Session<F>>, id: F::Id, depth: usize, ticket: OutcomeTicket<F>)
where
    F: Fetcher,
{
    tokio::spawn(work(session, id, depth, ticket));
}

async fn work<F>(session: Arc<Session<F>>, id: F::Id, depth: usize, ticket: OutcomeTicket<F>)
where
    F: Fetcher,
{
    if depth == 0 {
        return;
    }
    if !session.visited.try_mark(&id) {
        log::debug!("Skipping {id:?}, already claimed");
        return;
    }

    log::debug!(
        "Fetching {id:?} [remaining depth {depth}, {} pending]",
        ticket.pending()
    );
    let fetched = {
        let _permit = session.limiter.acquire().await;
        session.fetcher.fetch(&id).await
    };

    match fetched {
        Ok(page) => {
            let links = if depth > 1 {
                page.links.clone()
            } else {
                Vec::new()
            };
            ticket.send(FetchOutcome {
                id,
                depth,
                result: Ok(page),
            });
            for link in links {
                spawn_worker(session.clone(), link, depth - 1, ticket.child());
            }
        }
        Err(cause) => {
            log::warn!("Couldn't fetch {id:?} got: {cause}");
            ticket.send(FetchOutcome {
                id: id.clone(),
                depth,
                result: Err(FetchFailure { id, cause }),
            });
        }
    }
}

pin_project! {
    /// Outcomes in arrival order, ends once every worker of the crawl is done.
    pub struct ResultStream<Id> {
        #[pin]
        inner: UnboundedReceiverStream<FetchOutcome<Id>>,
    }
}

impl<Id> ResultStream<Id> {
    fn new(rx: mpsc::UnboundedReceiver<FetchOutcome<Id>>) -> Self {
        Self {
            inner: UnboundedReceiverStream::new(rx),
        }
    }

    pub async fn next_outcome(&mut self) -> Option<FetchOutcome<Id>> {
        self.inner.next().await
    }
}

impl<Id> Stream for ResultStream<Id> {
    type Item = FetchOutcome<Id>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

/// Starts crawling from `seed`, workers are spawned on the current tokio runtime.
///
/// Every identifier reachable within `config.max_depth` is fetched at most once.
pub fn crawl<F>(fetcher: Arc<F>, seed: F::Id, config: &CrawlerConfig) -> ResultStream<F::Id>
where
    F: Fetcher,
{
    let session = Arc::new(Session {
        fetcher,
        visited: VisitedSet::new(),
        limiter: Limiter::new(config.throttle),
    });

    let (root, rx) = Ticket::root();
    log::debug!("Crawling from {seed:?} [max depth {}]", config.max_depth);
    spawn_worker(session, seed, config.max_depth, root);

    ResultStream::new(rx)
}

/// Crawls from `seed` and hands every outcome to `on_outcome` as soon as it arrives.
pub async fn crawl_site<F, C>(
    fetcher: Arc<F>,
    seed: F::Id,
    config: &CrawlerConfig,
    mut on_outcome: C,
) -> CrawlSummary
where
    F: Fetcher,
    C: FnMut(FetchOutcome<F::Id>),
{
    let mut stream = crawl(fetcher, seed, config);
    let mut summary = CrawlSummary::default();
    while let Some(outcome) = stream.next_outcome().await {
        summary.record(&outcome);
        on_outcome(outcome);
    }
    log::debug!(
        "Crawl done, {} found {} not found",
        summary.found,
        summary.not_found
    );
    summary
}

/// Crawls from `seed` and gathers all outcomes.
pub async fn collect<F>(
    fetcher: Arc<F>,
    seed: F::Id,
    config: &CrawlerConfig,
) -> Vec<FetchOutcome<F::Id>>
where
    F: Fetcher,
{
    crawl(fetcher, seed, config).collect().await
}
