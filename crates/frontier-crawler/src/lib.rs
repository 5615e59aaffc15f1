mod config;
mod crawler;
mod fetcher;
mod limiter;
mod tracker;
mod visited;

pub use config::{CrawlerConfig, Throttle};
pub use crawler::{
    collect, crawl, crawl_site, CrawlSummary, FetchFailure, FetchOutcome, ResultStream,
};
pub use fetcher::{CannedFetcher, Fetcher, Identifier, Page};
pub use visited::VisitedSet;

pub use anyhow;
pub use futures;
