use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Duration;

use anyhow::anyhow;
use dashmap::DashMap;
use futures::future::BoxFuture;

/// Opaque identifiers handed out to workers, typically URLs.
pub trait Identifier: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T> Identifier for T where T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

/// What a successful fetch yields: the payload and the identifiers it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<Id> {
    pub body: String,
    pub links: Vec<Id>,
}

impl<Id> Page<Id> {
    pub fn new(body: impl Into<String>, links: Vec<Id>) -> Self {
        Self {
            body: body.into(),
            links,
        }
    }
}

pub trait Fetcher: Send + Sync + 'static {
    type Id: Identifier;

    fn fetch<'a>(&'a self, id: &'a Self::Id) -> BoxFuture<'a, anyhow::Result<Page<Self::Id>>>;
}

/// In-memory fetcher returning canned pages, every other identifier is not found.
///
/// Counts how many times each identifier has been requested.
#[derive(Debug, Default)]
pub struct CannedFetcher {
    pages: HashMap<String, Page<String>>,
    latency: Option<Duration>,
    fetches: DashMap<String, usize>,
}

impl CannedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time spent on each fetch.
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn page<I, S>(mut self, id: impl Into<String>, body: impl Into<String>, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let links = links.into_iter().map(Into::into).collect();
        self.pages.insert(id.into(), Page::new(body, links));
        self
    }

    pub fn fetch_count(&self, id: &str) -> usize {
        self.fetches.get(id).map(|n| *n).unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.iter().map(|entry| *entry.value()).sum()
    }
}

impl Fetcher for CannedFetcher {
    type Id = String;

    fn fetch<'a>(&'a self, id: &'a String) -> BoxFuture<'a, anyhow::Result<Page<String>>> {
        Box::pin(async move {
            *self.fetches.entry(id.clone()).or_insert(0) += 1;
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.pages
                .get(id)
                .cloned()
                .ok_or_else(|| anyhow!("not found: {id}"))
        })
    }
}
